//! Synthetic frame source producing moving test patterns at a fixed rate

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{info, instrument};

use crate::capture::frame::{Frame, PixelFormat};
use crate::SourceConfig;

/// Test pattern drawn by [`SyntheticSource`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// A bright vertical bar sweeping left to right over a dark background
    #[default]
    SweepBar,
    /// A checkerboard scrolling diagonally
    Checker,
    /// A color gradient whose hue drifts over time
    HueDrift,
}

/// Frame producer standing in for a camera
pub struct SyntheticSource {
    width: u32,
    height: u32,
    format: PixelFormat,
    pattern: Pattern,
    ticker: Interval,
    sequence: u64,
}

impl SyntheticSource {
    pub fn new(config: &SourceConfig, width: u32, height: u32, format: PixelFormat) -> Self {
        info!(
            "Initializing synthetic source: {:?} {}x{} @ {} fps",
            config.pattern, width, height, config.fps
        );

        let period = Duration::from_secs_f64(1.0 / f64::from(config.fps.max(1)));
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            width,
            height,
            format,
            pattern: config.pattern,
            ticker,
            sequence: 0,
        }
    }

    /// Wait for the next tick and render a frame
    #[instrument(level = "trace", skip(self))]
    pub async fn capture_frame(&mut self) -> Frame {
        self.ticker.tick().await;
        self.sequence += 1;
        let data = render(self.pattern, self.width, self.height, self.format, self.sequence);
        Frame::new(
            Bytes::from(data),
            self.sequence,
            self.width,
            self.height,
            self.format,
        )
    }
}

/// Pixels of frame number `t` of `pattern`.
pub fn render(pattern: Pattern, width: u32, height: u32, format: PixelFormat, t: u64) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let bpp = format.bytes_per_pixel();
    let mut data = vec![0u8; w * h * bpp];

    for (i, px) in data.chunks_exact_mut(bpp).enumerate() {
        let (x, y) = (i % w, i / w);
        let rgb = match pattern {
            Pattern::SweepBar => {
                let bar = (t as usize * 4) % w.max(1);
                let distance = x.abs_diff(bar);
                if distance < 6 {
                    [255, 230, 120]
                } else {
                    let shade = (y * 64 / h.max(1)) as u8;
                    [shade, shade / 2, 32]
                }
            }
            Pattern::Checker => {
                let phase = t as usize * 2;
                let on = ((x + phase) / 16 + (y + phase) / 16) % 2 == 0;
                if on {
                    [220, 220, 220]
                } else {
                    [30, 30, 30]
                }
            }
            Pattern::HueDrift => {
                let hue = (x * 360 / w.max(1) + t as usize * 3) % 360;
                hue_to_rgb(hue as f32)
            }
        };
        write_pixel(px, format, rgb);
    }
    data
}

fn write_pixel(px: &mut [u8], format: PixelFormat, [r, g, b]: [u8; 3]) {
    match format {
        PixelFormat::Gray => px[0] = gray_level(r, g, b),
        PixelFormat::Rgb => px.copy_from_slice(&[r, g, b]),
        PixelFormat::Rgba => px.copy_from_slice(&[r, g, b, 255]),
    }
}

fn gray_level(r: u8, g: u8, b: u8) -> u8 {
    (PixelFormat::Rgb.luma(&[r, g, b]) * 255.0).round() as u8
}

/// Fully saturated color for a hue in degrees
fn hue_to_rgb(hue: f32) -> [u8; 3] {
    let h = hue / 60.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    [
        (r * 255.0_f32).round() as u8,
        (g * 255.0_f32).round() as u8,
        (b * 255.0_f32).round() as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_have_the_configured_size() {
        for format in [PixelFormat::Gray, PixelFormat::Rgb, PixelFormat::Rgba] {
            for pattern in [Pattern::SweepBar, Pattern::Checker, Pattern::HueDrift] {
                let data = render(pattern, 40, 30, format, 3);
                assert_eq!(data.len(), format.frame_len(40, 30));
            }
        }
    }

    #[test]
    fn sweep_bar_moves_between_frames() {
        let a = render(Pattern::SweepBar, 64, 4, PixelFormat::Gray, 1);
        let b = render(Pattern::SweepBar, 64, 4, PixelFormat::Gray, 5);
        assert_ne!(a, b);
    }

    #[test]
    fn primary_hues() {
        assert_eq!(hue_to_rgb(0.0), [255, 0, 0]);
        assert_eq!(hue_to_rgb(120.0), [0, 255, 0]);
        assert_eq!(hue_to_rgb(240.0), [0, 0, 255]);
    }

    #[tokio::test]
    async fn capture_numbers_frames_sequentially() {
        let config = SourceConfig {
            fps: 30,
            ..SourceConfig::default()
        };
        let mut source = SyntheticSource::new(&config, 8, 8, PixelFormat::Rgb);
        let first = source.capture_frame().await;
        let second = source.capture_frame().await;
        assert_eq!(first.meta.sequence, 1);
        assert_eq!(second.meta.sequence, 2);
        assert_eq!(second.data.len(), second.expected_len());
    }
}
