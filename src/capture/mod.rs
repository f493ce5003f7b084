pub mod decoder;
pub mod frame;
pub mod synthetic;

pub use frame::Frame;
pub use frame::PixelFormat;
pub use synthetic::{Pattern, SyntheticSource};
