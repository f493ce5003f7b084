//! Per-pixel history selector

use tracing::warn;

use crate::capture::PixelFormat;
use crate::error::{Result, SlitScanError};

/// One normalized float per pixel choosing where in the time window that pixel samples from.
/// 0.0 selects the oldest frame of the window, 1.0 the newest.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl DelayMap {
    /// All-zero map of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width as usize * height as usize],
        }
    }

    /// Replace the map with the luma of an image of matching size.
    pub fn set_from_pixels(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        if width != self.width || height != self.height {
            warn!(
                "map dimensions do not match image dimensions. given {}x{}, need {}x{}",
                width, height, self.width, self.height
            );
            return Err(SlitScanError::DimensionMismatch {
                width: self.width,
                height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }

        let expected = format.frame_len(width, height);
        if pixels.len() != expected {
            warn!(expected, actual = pixels.len(), "delay map pixel buffer has the wrong size");
            return Err(SlitScanError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }

        for (value, px) in self
            .values
            .iter_mut()
            .zip(pixels.chunks_exact(format.bytes_per_pixel()))
        {
            *value = format.luma(px);
        }
        Ok(())
    }

    /// Replace the map with already-normalized values. Values are stored as given.
    pub fn set_from_floats(&mut self, values: &[f32]) -> Result<()> {
        if values.len() != self.values.len() {
            warn!(
                expected = self.values.len(),
                actual = values.len(),
                "delay map float buffer has the wrong size"
            );
            return Err(SlitScanError::SizeMismatch {
                expected: self.values.len(),
                actual: values.len(),
            });
        }
        self.values.copy_from_slice(values);
        Ok(())
    }

    /// Render the map as an 8-bit grayscale image into `out`, rounding to the nearest level.
    pub fn visualize_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.extend(
            self.values
                .iter()
                .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8),
        );
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grayscale_pixels_normalize_to_unit_range() {
        let mut map = DelayMap::new(3, 1);
        map.set_from_pixels(&[0, 51, 255], 3, 1, PixelFormat::Gray)
            .unwrap();
        assert_eq!(map.values(), &[0.0, 0.2, 1.0]);
    }

    #[test]
    fn rgba_pixels_ignore_alpha() {
        let mut map = DelayMap::new(1, 1);
        map.set_from_pixels(&[255, 255, 255, 0], 1, 1, PixelFormat::Rgba)
            .unwrap();
        assert!((map.values()[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mismatched_dimensions_leave_map_untouched() {
        let mut map = DelayMap::new(2, 2);
        map.set_from_floats(&[0.1, 0.2, 0.3, 0.4]).unwrap();
        let before = map.clone();

        let err = map
            .set_from_pixels(&[0; 6], 3, 2, PixelFormat::Gray)
            .unwrap_err();
        assert!(matches!(err, SlitScanError::DimensionMismatch { .. }));
        assert_eq!(map, before);
    }

    #[test]
    fn short_pixel_buffer_is_rejected() {
        let mut map = DelayMap::new(2, 1);
        let err = map
            .set_from_pixels(&[0, 0, 0], 2, 1, PixelFormat::Rgb)
            .unwrap_err();
        assert!(matches!(
            err,
            SlitScanError::SizeMismatch {
                expected: 6,
                actual: 3
            }
        ));
    }

    #[test]
    fn floats_are_stored_unclamped() {
        let mut map = DelayMap::new(2, 1);
        map.set_from_floats(&[-0.5, 1.5]).unwrap();
        assert_eq!(map.values(), &[-0.5, 1.5]);
        assert!(map.set_from_floats(&[0.0]).is_err());
    }

    #[test]
    fn visualization_scales_to_bytes() {
        let mut map = DelayMap::new(4, 1);
        map.set_from_floats(&[0.0, 0.5, 1.0, 2.0]).unwrap();
        let mut out = Vec::new();
        map.visualize_into(&mut out);
        assert_eq!(out, vec![0, 128, 255, 255]);
    }
}
