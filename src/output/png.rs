//! PNG sink for composited frames, delay map previews and history filmstrips

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{ColorType, ImageFormat};
use tracing::{debug, info, instrument};

use crate::capture::PixelFormat;
use crate::error::{Result, SlitScanError};

/// Writes frames as PNG files into one directory
pub struct PngSink {
    directory: PathBuf,
}

impl PngSink {
    /// Create the sink, making the directory if needed
    pub fn new(directory: impl Into<PathBuf>) -> Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        info!("Writing frames to {}", directory.display());
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Write one frame as `name`, returning the full path.
    #[instrument(skip(self, data))]
    pub fn write_frame(
        &self,
        name: &str,
        data: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<PathBuf> {
        let expected = format.frame_len(width, height);
        if data.len() != expected {
            return Err(SlitScanError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }

        let write_start = Instant::now();
        let path = self.directory.join(name);
        image::save_buffer_with_format(
            &path,
            data,
            width,
            height,
            color_type(format),
            ImageFormat::Png,
        )?;

        let write_time = write_start.elapsed();
        metrics::histogram!("png_write_time_us").record(write_time.as_micros() as f64);
        debug!("wrote {}", path.display());
        Ok(path)
    }

    /// Lay `frames` out left to right in one image.
    pub fn write_filmstrip(
        &self,
        name: &str,
        frames: &[&[u8]],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<PathBuf> {
        let strip = tile_horizontally(frames, width, height, format)?;
        let count = frames.len().max(1) as u32;
        self.write_frame(name, &strip, width * count, height, format)
    }
}

fn color_type(format: PixelFormat) -> ColorType {
    match format {
        PixelFormat::Gray => ColorType::L8,
        PixelFormat::Rgb => ColorType::Rgb8,
        PixelFormat::Rgba => ColorType::Rgba8,
    }
}

/// Concatenate equally sized frames side by side
fn tile_horizontally(
    frames: &[&[u8]],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let frame_len = format.frame_len(width, height);
    if let Some(bad) = frames.iter().find(|f| f.len() != frame_len) {
        return Err(SlitScanError::SizeMismatch {
            expected: frame_len,
            actual: bad.len(),
        });
    }
    if frames.is_empty() {
        return Ok(vec![0; frame_len]);
    }

    let row = width as usize * format.bytes_per_pixel();
    let mut strip = Vec::with_capacity(frame_len * frames.len());
    for y in 0..height as usize {
        for frame in frames {
            strip.extend_from_slice(&frame[y * row..(y + 1) * row]);
        }
    }
    Ok(strip)
}
