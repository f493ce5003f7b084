//! Slit-scan engine: frame history, delay map and time window behind one surface

use tracing::{debug, error, info, instrument, warn};

use super::cache::CachedFrame;
use super::delay_map::DelayMap;
use super::presets::DelayMapPreset;
use super::resample::resample_into;
use super::ringbuf::{FrameRingBuffer, ResizePolicy};
use super::window::{fraction_to_window, TimeWindow};
use crate::capture::{decoder, Frame, PixelFormat};
use crate::error::{Result, SlitScanError};
use crate::EffectConfig;

/// Counters describing what the engine has done so far
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineStats {
    pub frames_pushed: u64,
    pub frames_rejected: u64,
    pub output_recomputes: u64,
    pub map_recomputes: u64,
}

struct Engine {
    ring: FrameRingBuffer,
    map: DelayMap,
    window: TimeWindow,
    output: CachedFrame,
    map_view: CachedFrame,
}

impl Engine {
    fn invalidate_output(&mut self) {
        self.output.invalidate();
    }
}

/// Slit-scan effect.
///
/// Push frames as they arrive and read [`SlitScan::output`] whenever a composited frame is
/// needed; the output is only recomputed after something it depends on has changed. Every
/// operation apart from the blending flag needs a prior [`SlitScan::configure`] and reports
/// [`SlitScanError::NotConfigured`] otherwise.
#[derive(Default)]
pub struct SlitScan {
    engine: Option<Engine>,
    blend: bool,
    resize_policy: ResizePolicy,
    /// Counters carried over from earlier configurations
    retired: EngineStats,
}

impl SlitScan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }

    /// (Re)allocate the frame history. The delay map is cleared to zero, the window spans the
    /// whole history and blending is switched off. On error the previous configuration stays.
    pub fn configure(
        &mut self,
        width: u32,
        height: u32,
        capacity: usize,
        format: PixelFormat,
    ) -> Result<()> {
        let ring = FrameRingBuffer::new(width, height, capacity, format).map_err(|e| {
            error!("configure rejected: {e}");
            e
        })?;
        let capacity = ring.capacity();
        let frame_len = ring.frame_len();
        let pixel_count = ring.pixel_count();

        if let Some(old) = self.engine.take() {
            self.retired = Self::collect(&old, self.retired);
        }

        self.engine = Some(Engine {
            ring,
            map: DelayMap::new(width, height),
            window: TimeWindow::full(capacity),
            output: CachedFrame::new(frame_len),
            map_view: CachedFrame::new(pixel_count),
        });
        self.blend = false;

        info!(width, height, capacity, ?format, "slit-scan configured");
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> Result<&Engine> {
        self.engine.as_ref().ok_or_else(|| {
            warn!("slit-scan used before configure");
            SlitScanError::NotConfigured
        })
    }

    fn engine_mut(&mut self) -> Result<&mut Engine> {
        self.engine.as_mut().ok_or_else(|| {
            warn!("slit-scan used before configure");
            SlitScanError::NotConfigured
        })
    }

    /// Producer: store raw frame bytes as the newest frame
    pub fn push(&mut self, frame: &[u8]) -> Result<()> {
        let engine = self.engine_mut()?;
        match engine.ring.push(frame) {
            Ok(()) => {
                engine.invalidate_output();
                metrics::counter!("slitscan_frames_pushed").increment(1);
                Ok(())
            }
            Err(e) => {
                metrics::counter!("slitscan_frames_rejected").increment(1);
                Err(e)
            }
        }
    }

    /// Producer: store a captured frame after checking its format and dimensions
    pub fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        let engine = self.engine_mut()?;
        let ring = &engine.ring;
        let meta = &frame.meta;

        if meta.format != ring.format() {
            warn!(expected = ?ring.format(), actual = ?meta.format, "adding image of the wrong type");
            return Err(SlitScanError::FormatMismatch {
                expected: ring.format(),
                actual: meta.format,
            });
        }
        if meta.width != ring.width() || meta.height != ring.height() {
            warn!(
                "frame dimensions do not match. given {}x{}, need {}x{}",
                meta.width,
                meta.height,
                ring.width(),
                ring.height()
            );
            return Err(SlitScanError::DimensionMismatch {
                width: ring.width(),
                height: ring.height(),
                actual_width: meta.width,
                actual_height: meta.height,
            });
        }

        self.push(&frame.data)
    }

    /// Set the delay map from an image; color pixels are reduced to luma.
    pub fn set_delay_map_from_pixels(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<()> {
        let engine = self.engine_mut()?;
        engine.map.set_from_pixels(pixels, width, height, format)?;
        engine.invalidate_output();
        engine.map_view.invalidate();
        Ok(())
    }

    /// Set the delay map from normalized values, one per pixel.
    pub fn set_delay_map_from_floats(&mut self, values: &[f32]) -> Result<()> {
        let engine = self.engine_mut()?;
        engine.map.set_from_floats(values)?;
        engine.invalidate_output();
        engine.map_view.invalidate();
        Ok(())
    }

    pub fn set_delay_map_preset(&mut self, preset: DelayMapPreset, seed: u32) -> Result<()> {
        let (width, height) = {
            let ring = &self.engine_mut()?.ring;
            (ring.width(), ring.height())
        };
        debug!(?preset, seed, "applying delay map preset");
        self.set_delay_map_from_floats(&preset.generate(width, height, seed))
    }

    pub fn set_blending(&mut self, enabled: bool) {
        self.blend = enabled;
        if let Some(engine) = self.engine.as_mut() {
            engine.invalidate_output();
        }
    }

    pub fn toggle_blending(&mut self) {
        self.set_blending(!self.blend);
    }

    pub fn is_blending(&self) -> bool {
        self.blend
    }

    /// Set both window fields at once.
    ///
    /// Out-of-range values are clamped. If the clamped pair still exceeds the capacity the window
    /// is reset to the full history and [`SlitScanError::InvalidWindow`] is returned; the reset
    /// is already in effect at that point.
    pub fn set_delay_and_width(&mut self, delay: usize, width: usize) -> Result<()> {
        let engine = self.engine_mut()?;
        let capacity = engine.ring.capacity();
        let result = engine.window.set_delay_and_width(delay, width, capacity);
        if let Err(e) = &result {
            error!("{e}");
        }
        engine.invalidate_output();
        result
    }

    pub fn set_delay(&mut self, delay: usize) -> Result<()> {
        let engine = self.engine_mut()?;
        let capacity = engine.ring.capacity();
        engine.window.set_delay(delay, capacity);
        engine.invalidate_output();
        Ok(())
    }

    pub fn set_width(&mut self, width: usize) -> Result<()> {
        let engine = self.engine_mut()?;
        let capacity = engine.ring.capacity();
        engine.window.set_width(width, capacity);
        engine.invalidate_output();
        Ok(())
    }

    /// Select the part of history between `left` and `right`, both fractions of the capacity
    /// measured from the newest frame.
    pub fn set_window_fraction(&mut self, left: f32, right: f32) -> Result<()> {
        let capacity = self.engine_mut()?.ring.capacity();
        let (delay, width) = fraction_to_window(left, right, capacity);
        self.set_delay_and_width(delay, width)
    }

    /// Change the history length. The window is re-validated against the new capacity.
    /// Returns the capacity actually applied.
    pub fn resize(&mut self, new_capacity: usize) -> Result<usize> {
        let policy = self.resize_policy;
        let engine = self.engine_mut()?;
        let capacity = engine.ring.resize(new_capacity, policy);

        if !engine.window.is_valid(capacity) {
            let (delay, width) = (engine.window.delay(), engine.window.width());
            if let Err(e) = engine.window.set_delay_and_width(delay, width, capacity) {
                warn!("window no longer fits after resize: {e}");
            }
        }
        engine.invalidate_output();
        Ok(capacity)
    }

    pub fn delay(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.window.delay())
    }

    pub fn width(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.window.width())
    }

    pub fn capacity(&self) -> usize {
        self.engine.as_ref().map_or(0, |e| e.ring.capacity())
    }

    pub fn frame_width(&self) -> u32 {
        self.engine.as_ref().map_or(0, |e| e.ring.width())
    }

    pub fn frame_height(&self) -> u32 {
        self.engine.as_ref().map_or(0, |e| e.ring.height())
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.engine.as_ref().map(|e| e.ring.format())
    }

    /// Consumer: the composited frame, recomputed only if something changed since the last read
    #[instrument(level = "trace", skip(self))]
    pub fn output(&mut self) -> Result<&[u8]> {
        let blend = self.blend;
        let engine = self.engine_mut()?;
        let Engine {
            ring,
            map,
            window,
            output,
            ..
        } = engine;
        Ok(output.get_or_compute(|buf| resample_into(ring, map, window, blend, buf)))
    }

    /// The delay map as an 8-bit grayscale image
    pub fn delay_map_visualization(&mut self) -> Result<&[u8]> {
        let engine = self.engine_mut()?;
        let Engine { map, map_view, .. } = engine;
        Ok(map_view.get_or_compute(|buf| map.visualize_into(buf)))
    }

    /// Frame `age` pushes back from the newest (0 = last pushed, `capacity - 1` = oldest).
    pub fn frame_at(&self, age: usize) -> Result<&[u8]> {
        let ring = &self.engine()?.ring;
        ring.frame_at(age).ok_or(SlitScanError::OffsetOutOfRange {
            offset: age,
            capacity: ring.capacity(),
        })
    }

    /// Up to `count` frames spread evenly over the history, newest first.
    pub fn filmstrip(&self, count: usize) -> Result<Vec<&[u8]>> {
        let ring = &self.engine()?.ring;
        let capacity = ring.capacity();
        let count = count.min(capacity);
        if count == 0 {
            return Ok(Vec::new());
        }
        let step = capacity / count;
        Ok((0..count)
            .filter_map(|i| ring.frame_at(step * i))
            .collect())
    }

    pub fn stats(&self) -> EngineStats {
        match &self.engine {
            Some(engine) => Self::collect(engine, self.retired),
            None => self.retired,
        }
    }

    fn collect(engine: &Engine, base: EngineStats) -> EngineStats {
        let (written, rejected) = engine.ring.stats();
        EngineStats {
            frames_pushed: base.frames_pushed + written,
            frames_rejected: base.frames_rejected + rejected,
            output_recomputes: base.output_recomputes + engine.output.recomputes(),
            map_recomputes: base.map_recomputes + engine.map_view.recomputes(),
        }
    }

    /// Bring the engine in line with `config`.
    ///
    /// Size or format changes reconfigure from scratch, a capacity change alone resizes and
    /// keeps history. Blending, window and delay map are always re-applied. The delay map is
    /// loaded before anything else, so a failed call leaves the engine as it was.
    pub fn apply_settings(&mut self, config: &EffectConfig) -> Result<()> {
        let map = Self::load_delay_map(config)?;

        let same_frame = self.engine.as_ref().is_some_and(|e| {
            e.ring.width() == config.width
                && e.ring.height() == config.height
                && e.ring.format() == config.format
        });
        if !same_frame {
            self.configure(config.width, config.height, config.capacity, config.format)?;
        }
        self.resize_policy = config.resize_policy;
        if self.capacity() != config.capacity.max(1) {
            self.resize(config.capacity)?;
        }
        self.install_delay_map(map)?;

        self.set_blending(config.blending);
        let capacity = self.capacity();
        // A rejected window has already been reset to the full history; keep going.
        let _ = self.set_delay_and_width(config.delay, config.window.unwrap_or(capacity));
        Ok(())
    }

    fn load_delay_map(config: &EffectConfig) -> Result<DelayMap> {
        let (width, height) = (config.width, config.height);
        if width == 0 || height == 0 {
            return Err(SlitScanError::EmptyFrame { width, height });
        }

        let mut map = DelayMap::new(width, height);
        match &config.delay_map_path {
            Some(path) => {
                let image = decoder::open_image(path, width, height).map_err(|e| {
                    warn!(path = %path.display(), "delay map not loaded: {e}");
                    e
                })?;
                let format = decoder::map_format(&image);
                map.set_from_pixels(&decoder::to_pixels(image, format), width, height, format)?;
                info!(path = %path.display(), "delay map loaded");
            }
            None => {
                let preset = config.delay_map_preset;
                debug!(?preset, seed = config.seed, "applying delay map preset");
                map.set_from_floats(&preset.generate(width, height, config.seed))?;
            }
        }
        Ok(map)
    }

    fn install_delay_map(&mut self, map: DelayMap) -> Result<()> {
        let engine = self.engine_mut()?;
        let ring = &engine.ring;
        if map.width() != ring.width() || map.height() != ring.height() {
            return Err(SlitScanError::DimensionMismatch {
                width: ring.width(),
                height: ring.height(),
                actual_width: map.width(),
                actual_height: map.height(),
            });
        }
        engine.map = map;
        engine.invalidate_output();
        engine.map_view.invalidate();
        Ok(())
    }
}
