//! Temporal resampling: every output pixel is read from its own point in history

use std::time::Instant;

use tracing::instrument;

use super::delay_map::DelayMap;
use super::ringbuf::FrameRingBuffer;
use super::window::TimeWindow;

/// Fill `out` with one output frame.
///
/// Each pixel's delay map value is scaled onto the window; without blending the pixel is copied
/// from the frame at the floor of that offset, with blending it is interpolated between that
/// frame and the next newer one.
///
/// Blended channels are rounded to the nearest value rather than truncated, so a pixel halfway
/// between 10 and 21 comes out as 16 and values a hair below a frame do not drop a level.
#[instrument(level = "trace", skip(ring, map, window, out))]
pub fn resample_into(
    ring: &FrameRingBuffer,
    map: &DelayMap,
    window: &TimeWindow,
    blend: bool,
    out: &mut Vec<u8>,
) {
    let started = Instant::now();
    let bounds = window.bounds(ring.capacity());
    let bpp = ring.format().bytes_per_pixel();

    out.resize(ring.frame_len(), 0);
    let pixels = out.chunks_exact_mut(bpp).zip(map.values());

    if blend {
        for (i, (dst, &value)) in pixels.enumerate() {
            let precise = bounds.locate(value);
            let offset = precise.floor();
            let alpha = precise - offset;
            let invalpha = 1.0 - alpha;

            let lower = offset as usize;
            let upper = (lower + 1).min(bounds.max);
            let at = i * bpp;
            let a = &ring.window_slot(lower)[at..at + bpp];
            let b = &ring.window_slot(upper)[at..at + bpp];

            for ((d, &lo), &hi) in dst.iter_mut().zip(a).zip(b) {
                *d = (lo as f32 * invalpha + hi as f32 * alpha).round() as u8;
            }
        }
    } else {
        for (i, (dst, &value)) in pixels.enumerate() {
            let index = bounds.locate(value) as usize;
            let at = i * bpp;
            dst.copy_from_slice(&ring.window_slot(index)[at..at + bpp]);
        }
    }

    metrics::histogram!("slitscan_resample_time_us").record(started.elapsed().as_micros() as f64);
}
