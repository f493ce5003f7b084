use thiserror::Error;

use crate::capture::frame::PixelFormat;

/// Errors reported by the slit-scan engine.
///
/// Every variant is recoverable: the rejected call leaves the engine exactly as it was, except
/// for [`SlitScanError::InvalidWindow`], which is returned after the window has been reset.
#[derive(Debug, Error)]
pub enum SlitScanError {
    #[error("slit-scan buffer is not configured")]
    NotConfigured,

    #[error("invalid pixel format: {0}")]
    InvalidFormat(String),

    #[error("pixel format mismatch: expected {expected:?}, got {actual:?}")]
    FormatMismatch {
        expected: PixelFormat,
        actual: PixelFormat,
    },

    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("dimensions do not match: given {actual_width}x{actual_height}, need {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error(
        "invalid time delay and width: {delay} + {width} exceeds capacity {capacity}, window reset"
    )]
    InvalidWindow {
        delay: usize,
        width: usize,
        capacity: usize,
    },

    #[error("frame dimensions must be non-zero, got {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    #[error("history offset {offset} out of range for capacity {capacity}")]
    OffsetOutOfRange { offset: usize, capacity: usize },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = SlitScanError> = std::result::Result<T, E>;
