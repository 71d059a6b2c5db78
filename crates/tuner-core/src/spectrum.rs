//! Cosmetic spectrum: a seeded base profile plus a per-frame jitter overlay.
//!
//! The base profile is fully deterministic for a given seed and bar count.
//! The overlay is deliberately not; it only has to stay in range.

use rand::Rng;

const PM_MODULUS: u64 = 2_147_483_647;
const PM_MULTIPLIER: u64 = 16_807;

pub const BASE_MIN: f64 = 10.0;
pub const BASE_MAX: f64 = 90.0;
pub const FRAME_MIN: f64 = 8.0;
pub const FRAME_MAX: f64 = 92.0;

const JITTER_SPAN: f64 = 14.0;
const SPIKE_CHANCE: f64 = 0.015;
const SPIKE_HEIGHT: f64 = 40.0;

/// Park–Miller "minimal standard" generator.
#[derive(Debug, Clone)]
pub struct ParkMiller {
    state: u64,
}

impl ParkMiller {
    pub fn new(seed: u64) -> Self {
        Self {
            state: (seed % PM_MODULUS) * PM_MULTIPLIER % PM_MODULUS,
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state * PM_MULTIPLIER % PM_MODULUS;
        (self.state & 0x7fff_ffff) as f64 / PM_MODULUS as f64
    }
}

/// Smoothed random-walk bar heights in `[BASE_MIN, BASE_MAX]`.
pub fn base_profile(seed: u64, bars: usize) -> Vec<f64> {
    let mut rng = ParkMiller::new(seed);
    let mut h = 40.0 + rng.next_f64() * 20.0;

    let mut walk = Vec::with_capacity(bars);
    for _ in 0..bars {
        h += (rng.next_f64() - 0.5) * 18.0;
        h = h.clamp(BASE_MIN, BASE_MAX);
        walk.push(h);
    }

    // One 1-2-1 blur pass; edges reuse the boundary sample.
    (0..bars)
        .map(|i| {
            let prev = walk[i.saturating_sub(1)];
            let next = walk[(i + 1).min(bars - 1)];
            (prev + walk[i] * 2.0 + next) / 4.0
        })
        .collect()
}

/// One rendered bar of a live frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBar {
    pub height: f64,
    pub opacity: f64,
}

/// Apply one frame of jitter and spikes to `base`.
pub fn jitter_frame<R: Rng + ?Sized>(base: &[f64], rng: &mut R) -> Vec<FrameBar> {
    base.iter()
        .map(|&b| {
            let jitter = (rng.gen::<f64>() - 0.5) * JITTER_SPAN;
            let spike = if rng.gen::<f64>() < SPIKE_CHANCE {
                SPIKE_HEIGHT
            } else {
                0.0
            };
            FrameBar {
                height: (b + jitter + spike).clamp(FRAME_MIN, FRAME_MAX),
                opacity: 0.45 + rng.gen::<f64>() * 0.55,
            }
        })
        .collect()
}

/// The profile currently on display, remembering which seed built it.
#[derive(Debug, Clone, Default)]
pub struct SpectrumState {
    seed: u64,
    bars: usize,
    base: Vec<f64>,
}

impl SpectrumState {
    pub fn new(bars: usize) -> Self {
        Self {
            seed: 0,
            bars,
            base: Vec::new(),
        }
    }

    /// Rebuild the base profile for a station index (seed = index + 1).
    pub fn rebuild_for_station(&mut self, index: usize) {
        self.seed = index as u64 + 1;
        self.base = base_profile(self.seed, self.bars);
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn base(&self) -> &[f64] {
        &self.base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn park_miller_matches_reference_sequence() {
        // seed 1: state starts at 16807, first draw advances to 16807^2 mod m
        let mut rng = ParkMiller::new(1);
        let first = rng.next_f64();
        assert!((first - 282_475_249.0 / 2_147_483_647.0).abs() < 1e-15);
        let second = rng.next_f64();
        assert!((second - 1_622_650_073.0 / 2_147_483_647.0).abs() < 1e-15);
    }

    #[test]
    fn profile_is_reproducible() {
        let a = base_profile(3, 150);
        let b = base_profile(3, 150);
        assert_eq!(a.len(), 150);
        let a_bits: Vec<u64> = a.iter().map(|v| v.to_bits()).collect();
        let b_bits: Vec<u64> = b.iter().map(|v| v.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
        assert_ne!(base_profile(4, 150), a);
    }

    #[test]
    fn profile_stays_in_range() {
        for seed in 1..=64 {
            for v in base_profile(seed, 150) {
                assert!((BASE_MIN..=BASE_MAX).contains(&v), "seed {seed}: {v}");
            }
        }
    }

    #[test]
    fn profile_handles_tiny_counts() {
        assert!(base_profile(1, 0).is_empty());
        let single = base_profile(1, 1);
        assert_eq!(single.len(), 1);
        assert!((BASE_MIN..=BASE_MAX).contains(&single[0]));
    }

    #[test]
    fn frames_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let extremes = vec![BASE_MIN, BASE_MAX, 50.0];
        for _ in 0..2_000 {
            for bar in jitter_frame(&extremes, &mut rng) {
                assert!((FRAME_MIN..=FRAME_MAX).contains(&bar.height));
                assert!((0.45..=1.0).contains(&bar.opacity));
            }
        }
    }

    #[test]
    fn station_seed_is_index_plus_one() {
        let mut state = SpectrumState::new(20);
        state.rebuild_for_station(2);
        assert_eq!(state.seed(), 3);
        assert_eq!(state.base(), base_profile(3, 20).as_slice());
    }
}
