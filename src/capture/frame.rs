use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::SlitScanError;

/// Frame data with zero-copy semantics
#[derive(Clone)]
pub struct Frame {
    /// Immutable frame data - can be shared across threads without copying
    pub data: Bytes,

    /// Frame metadata
    pub meta: Arc<FrameMetadata>,

    /// Capture timestamp for latency tracking
    pub timestamp: Instant,
}

impl Frame {
    pub fn new(data: Bytes, sequence: u64, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            data,
            meta: Arc::new(FrameMetadata {
                sequence,
                width,
                height,
                format,
            }),
            timestamp: Instant::now(),
        }
    }

    /// Expected byte length for the frame's dimensions and format.
    pub fn expected_len(&self) -> usize {
        self.meta.format.frame_len(self.meta.width, self.meta.height)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.data.len())
            .field("meta", &self.meta)
            .finish()
    }
}

/// Frame metadata
#[derive(Debug, Clone)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Pixel formats we support. Configuration accepts any spelling [`FromStr`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PixelFormat {
    Gray,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    pub fn from_channels(channels: usize) -> Result<Self, SlitScanError> {
        match channels {
            1 => Ok(PixelFormat::Gray),
            3 => Ok(PixelFormat::Rgb),
            4 => Ok(PixelFormat::Rgba),
            other => Err(SlitScanError::InvalidFormat(format!(
                "{other} bytes per pixel"
            ))),
        }
    }

    pub fn frame_len(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bytes_per_pixel()
    }

    /// Normalized luma of one pixel, `px` holding exactly `bytes_per_pixel` bytes.
    ///
    /// Color formats use Rec. 601 weights; alpha is ignored.
    #[inline]
    pub fn luma(self, px: &[u8]) -> f32 {
        match self {
            PixelFormat::Gray => px[0] as f32 / 255.0,
            PixelFormat::Rgb | PixelFormat::Rgba => {
                (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32) / 255.0
            }
        }
    }
}

impl FromStr for PixelFormat {
    type Err = SlitScanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gray" | "grey" | "grayscale" => Ok(PixelFormat::Gray),
            "rgb" => Ok(PixelFormat::Rgb),
            "rgba" => Ok(PixelFormat::Rgba),
            _ => Err(SlitScanError::InvalidFormat(s.to_string())),
        }
    }
}

impl TryFrom<String> for PixelFormat {
    type Error = SlitScanError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
