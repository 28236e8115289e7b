//! Elapsed-time helpers for quoting against wall-clock timestamps.
use chrono::{DateTime, Utc};
use num_traits::cast::cast;

/// Fraction of `[start, end]` elapsed at `now`, clamped to `[0, 1]`.
///
/// A degenerate interval (`end <= start`) reads as 1 so the ride is treated
/// as already ended.
#[must_use]
pub fn calculate_elapsed_fraction(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> f64 {
    if end <= start {
        return 1.0;
    }
    let total = (end - start).num_milliseconds();
    let elapsed = (now - start).num_milliseconds();
    millis_fraction(elapsed, total)
}

fn millis_fraction(elapsed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 1.0;
    }
    let fraction =
        cast::<i64, f64>(elapsed).unwrap_or(0.0) / cast::<i64, f64>(total).unwrap_or(1.0);
    fraction.clamp(0.0, 1.0)
}

#[must_use]
pub fn has_ride_ended(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    calculate_elapsed_fraction(start, end, now) >= 1.0
}

/// Same as [`calculate_elapsed_fraction`] for callers holding plain seconds.
#[must_use]
pub fn elapsed_fraction_from_seconds(elapsed_seconds: f64, duration_seconds: f64) -> f64 {
    if !duration_seconds.is_finite() || duration_seconds <= 0.0 || elapsed_seconds.is_nan() {
        return 1.0;
    }
    (elapsed_seconds / duration_seconds).clamp(0.0, 1.0)
}

/// The boost is gone once the elapsed fraction reaches the crash point.
#[must_use]
pub fn is_crashed(elapsed_fraction: f64, crash_fraction: f64) -> bool {
    elapsed_fraction >= crash_fraction
}
