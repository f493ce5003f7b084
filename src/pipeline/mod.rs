pub mod cache;
pub mod delay_map;
pub mod presets;
pub mod resample;
pub mod ringbuf;
pub mod slitscan;
pub mod window;

pub use delay_map::DelayMap;
pub use presets::DelayMapPreset;
pub use ringbuf::{FrameRingBuffer, ResizePolicy};
pub use slitscan::{EngineStats, SlitScan};
pub use window::TimeWindow;
