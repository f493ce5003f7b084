//! Built-in delay maps

use serde::{Deserialize, Serialize};

/// Procedural delay maps covering the common slit-scan looks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayMapPreset {
    /// Oldest frames on the left edge, newest on the right
    #[default]
    LeftToRight,
    RightToLeft,
    /// Oldest frames on the top row, newest on the bottom
    UpToDown,
    DownToUp,
    /// Independent random value per pixel
    HardNoise,
    /// Smoothly interpolated random field
    SoftNoise,
    /// Blocks of constant random value
    RandomGrid,
    /// Whole frame from the oldest moment of the window: a plain video delay
    VideoDelay,
}

/// Grid resolution for the noise and grid presets
const CELLS_X: usize = 8;
const CELLS_Y: usize = 6;

impl DelayMapPreset {
    pub const ALL: [DelayMapPreset; 8] = [
        DelayMapPreset::LeftToRight,
        DelayMapPreset::RightToLeft,
        DelayMapPreset::UpToDown,
        DelayMapPreset::DownToUp,
        DelayMapPreset::HardNoise,
        DelayMapPreset::SoftNoise,
        DelayMapPreset::RandomGrid,
        DelayMapPreset::VideoDelay,
    ];

    /// Row-major `width * height` values in `0..=1`.
    pub fn generate(self, width: u32, height: u32, seed: u32) -> Vec<f32> {
        let (w, h) = (width as usize, height as usize);
        let mut rng = Rng32::from_seed(seed);

        match self {
            DelayMapPreset::LeftToRight => ramp(w, h, |x, _| ratio(x, w)),
            DelayMapPreset::RightToLeft => ramp(w, h, |x, _| 1.0 - ratio(x, w)),
            DelayMapPreset::UpToDown => ramp(w, h, |_, y| ratio(y, h)),
            DelayMapPreset::DownToUp => ramp(w, h, |_, y| 1.0 - ratio(y, h)),
            DelayMapPreset::HardNoise => (0..w * h).map(|_| rng.next_f32()).collect(),
            DelayMapPreset::SoftNoise => {
                // Lattice has one extra row/column so the far edges interpolate too.
                let lattice: Vec<f32> = (0..(CELLS_X + 1) * (CELLS_Y + 1))
                    .map(|_| rng.next_f32())
                    .collect();
                let at = |cx: usize, cy: usize| lattice[cy * (CELLS_X + 1) + cx];
                ramp(w, h, |x, y| {
                    let fx = ratio(x, w) * CELLS_X as f32;
                    let fy = ratio(y, h) * CELLS_Y as f32;
                    let (cx, cy) = ((fx as usize).min(CELLS_X - 1), (fy as usize).min(CELLS_Y - 1));
                    let (tx, ty) = (smooth(fx - cx as f32), smooth(fy - cy as f32));
                    let top = lerp(at(cx, cy), at(cx + 1, cy), tx);
                    let bottom = lerp(at(cx, cy + 1), at(cx + 1, cy + 1), tx);
                    lerp(top, bottom, ty)
                })
            }
            DelayMapPreset::RandomGrid => {
                let cells: Vec<f32> = (0..CELLS_X * CELLS_Y).map(|_| rng.next_f32()).collect();
                ramp(w, h, |x, y| {
                    let cx = (x * CELLS_X / w.max(1)).min(CELLS_X - 1);
                    let cy = (y * CELLS_Y / h.max(1)).min(CELLS_Y - 1);
                    cells[cy * CELLS_X + cx]
                })
            }
            DelayMapPreset::VideoDelay => vec![0.0; w * h],
        }
    }
}

fn ramp(w: usize, h: usize, f: impl Fn(usize, usize) -> f32) -> Vec<f32> {
    let mut values = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            values.push(f(x, y));
        }
    }
    values
}

/// Position along an axis of `len` pixels, 0 at the first and 1 at the last.
#[inline]
fn ratio(i: usize, len: usize) -> f32 {
    if len <= 1 {
        0.0
    } else {
        i as f32 / (len - 1) as f32
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// Deterministic xorshift32 RNG; presets only need repeatable visual noise.
#[derive(Clone)]
struct Rng32 {
    state: u32,
}

impl Rng32 {
    fn from_seed(seed: u32) -> Self {
        Self { state: seed | 1 }
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in `0..1`
    #[inline]
    fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}
