pub mod png;

pub use png::PngSink;
