//! Numeric helpers centralizing rounding and safe numeric casts.
//!
//! Every persisted or disclosed value passes through [`round_to`] so that
//! repeated derivations produce byte-identical output.

use num_traits::cast::cast;

/// Round `value` to `decimals` places, returning 0.0 for non-finite values.
///
/// Halfway cases round away from zero.
#[must_use]
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let exponent = i32::try_from(decimals).unwrap_or(i32::MAX);
    let factor = 10_f64.powi(exponent);
    if !factor.is_finite() {
        return value;
    }
    (value * factor).round() / factor
}

/// Round to the six decimals used for curve and boost values.
#[must_use]
pub fn round6(value: f64) -> f64 {
    round_to(value, 6)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a u32 count to f64.
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Round a f64 and clamp it into the usize range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_usize(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    let max = cast::<usize, f64>(usize::MAX).unwrap_or(f64::MAX);
    let clamped = value.min(max).round();
    cast::<f64, usize>(clamped).unwrap_or(0)
}

/// Floor a non-negative f64 into usize, returning 0 for NaN or negative values.
#[must_use]
pub fn floor_f64_to_usize(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    round_f64_to_usize(value.floor())
}

/// Round a f64 to the nearest i64, saturating at the range ends and mapping NaN to 0.
#[must_use]
pub fn round_f64_to_i64(value: f64) -> i64 {
    if value.is_nan() {
        return 0;
    }
    let rounded = value.round();
    cast::<f64, i64>(rounded).unwrap_or(if rounded > 0.0 { i64::MAX } else { i64::MIN })
}

/// Clamp into `[min, max]`, tolerating an inverted or NaN window.
#[must_use]
pub fn clamp_between(value: f64, min: f64, max: f64) -> f64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}
