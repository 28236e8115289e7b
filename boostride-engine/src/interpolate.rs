//! Linear interpolation over stored checkpoints.
use crate::numbers::round6;
use crate::ride::Checkpoint;

/// Ride value at `elapsed_fraction`, rounded to 6 decimals.
///
/// The fraction is clamped to `[0, 1]`. Outside the checkpoint time range the
/// nearest boundary value is returned; an empty ride reads as 0.
#[must_use]
pub fn interpolate_ride_value(checkpoints: &[Checkpoint], elapsed_fraction: f64) -> f64 {
    let (Some(first), Some(last)) = (checkpoints.first(), checkpoints.last()) else {
        return 0.0;
    };
    let t = if elapsed_fraction.is_nan() {
        0.0
    } else {
        elapsed_fraction.clamp(0.0, 1.0)
    };
    if t <= first.time_fraction {
        return round6(first.boost_value);
    }
    if t >= last.time_fraction {
        return round6(last.boost_value);
    }
    // Index of the first checkpoint strictly after `t`.
    let upper = checkpoints.partition_point(|checkpoint| checkpoint.time_fraction <= t);
    let (from, to) = (checkpoints[upper - 1], checkpoints[upper]);
    let width = to.time_fraction - from.time_fraction;
    if width <= 0.0 {
        return round6(to.boost_value);
    }
    let local = (t - from.time_fraction) / width;
    round6(from.boost_value + (to.boost_value - from.boost_value) * local)
}
