//! Active slice of history addressed by the delay map

use crate::error::SlitScanError;

/// `delay` frames are skipped at the recent end of history and `width` frames are spread across
/// the delay map's 0..1 range.
///
/// For a capacity `c` every window satisfies `delay <= c - 1`, `1 <= width <= c` and
/// `delay + width <= c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    delay: usize,
    width: usize,
}

/// Window offsets (counted from the oldest slot) spanned by a [`TimeWindow`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowBounds {
    pub min: usize,
    pub max: usize,
}

impl WindowBounds {
    pub fn range(&self) -> usize {
        self.max - self.min
    }

    /// Real-valued window offset for a delay map value, kept inside the window.
    #[inline]
    pub fn locate(&self, value: f32) -> f32 {
        (value * self.range() as f32 + self.min as f32).clamp(self.min as f32, self.max as f32)
    }
}

impl TimeWindow {
    /// The whole history: no delay, full width.
    pub fn full(capacity: usize) -> Self {
        Self {
            delay: 0,
            width: capacity.max(1),
        }
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Clamp both fields; a combination that still overruns the capacity falls back to
    /// [`TimeWindow::full`] and is reported.
    pub fn set_delay_and_width(
        &mut self,
        delay: usize,
        width: usize,
        capacity: usize,
    ) -> Result<(), SlitScanError> {
        let capacity = capacity.max(1);
        let delay = delay.min(capacity - 1);
        let width = width.clamp(1, capacity);

        if delay + width > capacity {
            *self = Self::full(capacity);
            return Err(SlitScanError::InvalidWindow {
                delay,
                width,
                capacity,
            });
        }

        self.delay = delay;
        self.width = width;
        Ok(())
    }

    /// Clamp `delay` against the current width, never resetting.
    pub fn set_delay(&mut self, delay: usize, capacity: usize) {
        let upper = capacity.saturating_sub(self.width + 1);
        self.delay = delay.min(upper);
    }

    /// Clamp `width` against the current delay, never resetting.
    pub fn set_width(&mut self, width: usize, capacity: usize) {
        let upper = capacity.saturating_sub(self.delay).max(1);
        self.width = width.clamp(1, upper);
    }

    pub fn is_valid(&self, capacity: usize) -> bool {
        self.width >= 1 && self.delay < capacity && self.delay + self.width <= capacity
    }

    /// Window offsets of the oldest and newest frames this window reaches.
    pub fn bounds(&self, capacity: usize) -> WindowBounds {
        WindowBounds {
            min: capacity - self.delay - self.width,
            max: capacity - 1 - self.delay,
        }
    }
}

/// Delay and width for a selection spanning `left..right` of the history, both in `0..=1`.
pub fn fraction_to_window(left: f32, right: f32, capacity: usize) -> (usize, usize) {
    let left = left.clamp(0.0, 1.0);
    let right = right.clamp(left, 1.0);
    let capacity = capacity as f32;
    (
        (left * capacity).round() as usize,
        ((right - left) * capacity).round() as usize,
    )
}
