//! Reward seeds and the ride parameters derived from them.
//!
//! A seed is the lowercase hex SHA-256 of `reward:user:profile-version`. It is
//! created once when a reward is granted and is the only source of
//! randomness for that reward's ride.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::constants::{
    CHECKPOINT_COUNT_MIN, CHECKPOINT_SAMPLE_MAX, CHECKPOINT_SAMPLE_MIN, CRASH_BETA_ALPHA,
    CRASH_BETA_BETA, CRASH_FRACTION_MAX, CRASH_FRACTION_MIN, DURATION_DECIMALS,
    FRACTION_DECIMALS, STREAM_CRASH, STREAM_DURATION, STREAM_PARAMS, VOLATILITY_MAX,
    VOLATILITY_MIN,
};
use crate::numbers::{round_f64_to_usize, round_to};
use crate::random::SeededRandom;

/// Parameters fixed for a ride at opt-in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RideParams {
    /// Number of checkpoints, at least 6.
    pub checkpoint_count: usize,
    /// Shape volatility in `[0.25, 0.85]`.
    pub volatility: f64,
    /// Fraction of the ride at which the boost crashes to zero.
    pub crash_fraction: f64,
}

/// Derive the hex seed for one reward instance.
#[must_use]
pub fn generate_seed(reward_id: &str, user_id: &str, profile_version_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{reward_id}:{user_id}:{profile_version_id}").as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Returns true for a 64 character lowercase hex string.
#[must_use]
pub fn is_seed(candidate: &str) -> bool {
    candidate.len() == 64
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn ordered_bounds(min: f64, max: f64) -> (f64, f64) {
    let min = min.max(0.0);
    let max = max.max(0.0);
    if min <= max { (min, max) } else { (max, min) }
}

/// Sample the ride duration in seconds, rounded to three decimals.
#[must_use]
pub fn derive_ride_duration_seconds(seed: &str, min_seconds: f64, max_seconds: f64) -> f64 {
    let (min, max) = ordered_bounds(min_seconds, max_seconds);
    let mut rng = SeededRandom::for_stream(STREAM_DURATION, seed);
    round_to(rng.next_range(min, max), DURATION_DECIMALS)
}

/// Sample the crash point as a fraction of the ride.
///
/// Crash timing follows Beta(10, 5), which concentrates crashes in the back
/// half of the ride without ever guaranteeing survival.
#[must_use]
pub fn derive_crash_fraction(seed: &str, duration_seconds: f64, min_crash_seconds: f64) -> f64 {
    let mut rng = SeededRandom::for_stream(STREAM_CRASH, seed);
    let sample = rng.beta(CRASH_BETA_ALPHA, CRASH_BETA_BETA);
    let duration = duration_seconds.max(0.0);
    let fraction = if duration > 0.0 {
        let min_crash = min_crash_seconds.clamp(0.0, duration);
        let crash_seconds = min_crash + (duration - min_crash) * sample;
        crash_seconds / duration
    } else {
        sample
    };
    round_to(
        fraction.clamp(CRASH_FRACTION_MIN, CRASH_FRACTION_MAX),
        FRACTION_DECIMALS,
    )
}

/// Derive checkpoint count, volatility and crash fraction for a ride.
#[must_use]
pub fn derive_ride_params(seed: &str, duration_seconds: f64, min_crash_seconds: f64) -> RideParams {
    let mut rng = SeededRandom::for_stream(STREAM_PARAMS, seed);
    let sampled_count = rng.next_range(CHECKPOINT_SAMPLE_MIN, CHECKPOINT_SAMPLE_MAX);
    let checkpoint_count = round_f64_to_usize(sampled_count).max(CHECKPOINT_COUNT_MIN);
    let volatility = round_to(
        rng.next_range(VOLATILITY_MIN, VOLATILITY_MAX),
        FRACTION_DECIMALS,
    );
    RideParams {
        checkpoint_count,
        volatility,
        crash_fraction: derive_crash_fraction(seed, duration_seconds, min_crash_seconds),
    }
}
