//! Deterministic random source seeded from a string.
//!
//! The stream is a 64-bit linear congruential generator whose initial state is
//! the XXH64 digest of the seed string. Output depends on nothing but the seed,
//! so a ride generated today replays bit-for-bit on any platform later.
//!
//! Independent decisions never share a stream: each one builds its generator
//! with [`SeededRandom::for_stream`], which salts the seed as `"label:seed"`.
//! Changing how many values one decision consumes therefore cannot shift the
//! values another decision sees.

use num_traits::cast::cast;
use std::f64::consts::PI;
use std::hash::Hasher;
use twox_hash::XxHash64;

const LCG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const LCG_INCREMENT: u64 = 1_442_695_040_888_963_407;
const UNIT_SCALE: f64 = 9_007_199_254_740_992.0; // 2^53
const MAX_GAMMA_REJECTIONS: usize = 256;

/// Seeded pseudo-random stream with derived samplers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRandom {
    state: u64,
    draws: u64,
}

impl SeededRandom {
    /// Build a stream from an arbitrary seed string.
    #[must_use]
    pub fn new(seed: &str) -> Self {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(seed.as_bytes());
        Self {
            state: hasher.finish(),
            draws: 0,
        }
    }

    /// Build the stream for one named decision (`"label:seed"`).
    #[must_use]
    pub fn for_stream(label: &str, seed: &str) -> Self {
        Self::new(&format!("{label}:{seed}"))
    }

    /// Number of uniform values drawn from this stream so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    /// Next uniform value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.draws = self.draws.saturating_add(1);
        let bits = self.state >> 11;
        cast::<u64, f64>(bits).unwrap_or(0.0) / UNIT_SCALE
    }

    /// Uniform value in `[min, max)`.
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Bernoulli trial succeeding with `probability` (clamped to `[0, 1]`).
    pub fn chance(&mut self, probability: f64) -> bool {
        let p = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self.next_f64() < p
    }

    /// Uniform value in `(0, 1)`, safe to pass to `ln`.
    fn next_open(&mut self) -> f64 {
        let value = self.next_f64();
        if value > 0.0 { value } else { f64::EPSILON }
    }

    /// Gaussian sample via the Box-Muller transform.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_open();
        let u2 = self.next_f64();
        let radius = (-2.0 * u1.ln()).sqrt();
        mean + std_dev * radius * (2.0 * PI * u2).cos()
    }

    /// Gamma(shape, 1) sample using Marsaglia-Tsang.
    ///
    /// Shapes below one are boosted through `Gamma(k) = Gamma(k + 1) * U^(1/k)`.
    /// Non-positive or non-finite shapes are treated as 1.
    pub fn gamma(&mut self, shape: f64) -> f64 {
        let shape = if shape.is_finite() && shape > 0.0 {
            shape
        } else {
            1.0
        };
        if shape < 1.0 {
            let boosted = self.gamma(shape + 1.0);
            let u = self.next_open();
            return boosted * u.powf(1.0 / shape);
        }

        let d = shape - 1.0 / 3.0;
        let c = 1.0 / (9.0 * d).sqrt();
        for _ in 0..MAX_GAMMA_REJECTIONS {
            let x = self.normal(0.0, 1.0);
            let v = 1.0 + c * x;
            if v <= 0.0 {
                continue;
            }
            let v = v * v * v;
            let u = self.next_open();
            if u < 1.0 - 0.0331 * x.powi(4) {
                return d * v;
            }
            if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
                return d * v;
            }
        }
        d
    }

    /// Beta(alpha, beta) sample as a ratio of gamma draws.
    pub fn beta(&mut self, alpha: f64, beta: f64) -> f64 {
        let x = self.gamma(alpha);
        let y = self.gamma(beta);
        let total = x + y;
        if total > 0.0 && total.is_finite() {
            x / total
        } else {
            0.5
        }
    }
}
