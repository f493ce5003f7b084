use std::path::Path;

use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use super::frame::PixelFormat;
use crate::error::Result;

/// Open an image file, resizing it to `width` x `height` when it differs.
pub fn open_image(path: &Path, width: u32, height: u32) -> Result<DynamicImage> {
    let image = image::open(path)?;
    if image.width() != width || image.height() != height {
        debug!(
            "resizing {} from {}x{} to {}x{}",
            path.display(),
            image.width(),
            image.height(),
            width,
            height
        );
        return Ok(image.resize_exact(width, height, FilterType::Triangle));
    }
    Ok(image)
}

/// Format matching the image's own channel layout, falling back to gray or RGB for layouts we
/// do not store (gray with alpha, 16-bit and float images).
pub fn map_format(image: &DynamicImage) -> PixelFormat {
    let color = image.color();
    if color.bytes_per_pixel() == color.channel_count() {
        if let Ok(format) = PixelFormat::from_channels(usize::from(color.channel_count())) {
            return format;
        }
    }
    if color.has_color() {
        PixelFormat::Rgb
    } else {
        PixelFormat::Gray
    }
}

/// Convert any decoded image into tightly packed pixels of `format`.
pub fn to_pixels(image: DynamicImage, format: PixelFormat) -> Vec<u8> {
    match format {
        PixelFormat::Gray => image.into_luma8().into_raw(),
        PixelFormat::Rgb => image.into_rgb8().into_raw(),
        PixelFormat::Rgba => image.into_rgba8().into_raw(),
    }
}
