//! Fixed-capacity ring of historical frames

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capture::PixelFormat;
use crate::error::{Result, SlitScanError};

/// What happens to stored frames when the capacity changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Every retained frame keeps its age. Growth adds blank frames as the oldest history,
    /// shrinking drops the oldest frames.
    #[default]
    PreserveHistory,
    /// Slots keep their physical index. Growth appends blank slots after the existing ones,
    /// shrinking truncates slots past the new capacity and wraps the write pointer.
    SlotOrder,
}

/// Ring buffer holding the last `capacity` frames of one size and format
pub struct FrameRingBuffer {
    /// One boxed frame per slot; lengths never change after allocation
    slots: Vec<Box<[u8]>>,

    /// Slot overwritten by the next push, i.e. the oldest frame
    write_pointer: usize,

    width: u32,
    height: u32,
    format: PixelFormat,
    frame_len: usize,

    /// Statistics
    stats: Stats,
}

#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    frames_written: u64,
    frames_rejected: u64,
}

impl FrameRingBuffer {
    /// Allocates `capacity` zero-filled frames. A capacity of zero is raised to one.
    pub fn new(width: u32, height: u32, capacity: usize, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SlitScanError::EmptyFrame { width, height });
        }

        let frame_len = format.frame_len(width, height);
        let capacity = capacity.max(1);
        debug!(width, height, capacity, ?format, "allocating frame history");

        Ok(Self {
            slots: (0..capacity).map(|_| blank(frame_len)).collect(),
            write_pointer: 0,
            width,
            height,
            format,
            frame_len,
            stats: Stats::default(),
        })
    }

    /// Producer: copy a frame into the oldest slot and advance the write pointer
    pub fn push(&mut self, frame: &[u8]) -> Result<()> {
        if frame.len() != self.frame_len {
            self.stats.frames_rejected += 1;
            warn!(
                expected = self.frame_len,
                actual = frame.len(),
                "rejecting frame of the wrong size"
            );
            return Err(SlitScanError::SizeMismatch {
                expected: self.frame_len,
                actual: frame.len(),
            });
        }

        self.slots[self.write_pointer].copy_from_slice(frame);
        self.write_pointer = (self.write_pointer + 1) % self.slots.len();
        self.stats.frames_written += 1;
        Ok(())
    }

    /// Change the number of stored frames. Returns the capacity actually applied.
    pub fn resize(&mut self, new_capacity: usize, policy: ResizePolicy) -> usize {
        let new_capacity = new_capacity.max(1);
        let capacity = self.slots.len();
        if new_capacity == capacity {
            return capacity;
        }

        match policy {
            ResizePolicy::PreserveHistory => {
                if new_capacity > capacity {
                    // New blank frames become the oldest history; the write pointer now
                    // addresses the first of them.
                    let older = self.slots.split_off(self.write_pointer);
                    self.slots
                        .extend((0..new_capacity - capacity).map(|_| blank(self.frame_len)));
                    self.slots.extend(older);
                } else {
                    // Rotate oldest-first, then drop from the old end.
                    self.slots.rotate_left(self.write_pointer);
                    self.slots.drain(..capacity - new_capacity);
                    self.write_pointer = 0;
                }
            }
            ResizePolicy::SlotOrder => {
                if new_capacity > capacity {
                    self.slots
                        .extend((0..new_capacity - capacity).map(|_| blank(self.frame_len)));
                } else {
                    self.slots.truncate(new_capacity);
                    self.write_pointer %= new_capacity;
                }
            }
        }

        debug!(from = capacity, to = new_capacity, ?policy, "resized frame history");
        new_capacity
    }

    /// Frame `age` pushes back from the most recent one (0 = newest).
    pub fn frame_at(&self, age: usize) -> Option<&[u8]> {
        let capacity = self.slots.len();
        if age >= capacity {
            return None;
        }
        Some(self.window_slot(capacity - 1 - age))
    }

    /// Frame at a window offset counted from the oldest slot (0 = oldest, capacity-1 = newest).
    ///
    /// Offsets past the end wrap around the ring.
    #[inline]
    pub fn window_slot(&self, offset: usize) -> &[u8] {
        let capacity = self.slots.len();
        let mut physical = self.write_pointer + offset;
        if physical >= capacity {
            physical %= capacity;
        }
        &self.slots[physical]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn write_pointer(&self) -> usize {
        self.write_pointer
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// (frames written, frames rejected)
    pub fn stats(&self) -> (u64, u64) {
        (self.stats.frames_written, self.stats.frames_rejected)
    }
}

fn blank(len: usize) -> Box<[u8]> {
    vec![0u8; len].into_boxed_slice()
}
