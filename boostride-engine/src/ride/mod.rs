//! Deterministic ride curve generation.
//!
//! A ride is an ordered run of checkpoints from `time_fraction` 0 to 1. The
//! generator synthesizes turning points, eases between them and then runs a
//! fixed pipeline of enforcement passes (see [`passes`]) so every ride honours
//! the same shape rules regardless of seed:
//!
//! - exactly one pre-crash checkpoint holds the pre-crash maximum
//! - that maximum never lands before the minimum peak delay
//! - pre-crash values stay within the configured boost window
//! - the final checkpoint is always 0
mod passes;
mod shape;

use serde::{Deserialize, Serialize};

pub use passes::{EnforcementPass, PassChange, PassLog};

use crate::constants::{
    CHECKPOINT_COUNT_MIN, LOG_RIDE_GENERATED, START_FLOOR_BASE, START_FLOOR_STRENGTH_SPAN,
    VALUE_STEP,
};
use crate::numbers::{round6, usize_to_f64};
use crate::seed::RideParams;

/// One stored anchor point of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub index: usize,
    pub time_fraction: f64,
    pub boost_value: f64,
}

/// Generator input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideConfig {
    pub checkpoint_count: usize,
    pub volatility: f64,
    pub min_boost_pct: f64,
    pub max_boost_pct: f64,
    pub ticket_strength: f64,
    pub duration_seconds: f64,
    pub crash_fraction: f64,
    pub min_peak_delay_seconds: f64,
}

impl RideConfig {
    /// Assemble a generator config from derived parameters and a boost window.
    #[must_use]
    pub const fn from_params(
        params: &RideParams,
        min_boost_pct: f64,
        max_boost_pct: f64,
        ticket_strength: f64,
        duration_seconds: f64,
        min_peak_delay_seconds: f64,
    ) -> Self {
        Self {
            checkpoint_count: params.checkpoint_count,
            volatility: params.volatility,
            min_boost_pct,
            max_boost_pct,
            ticket_strength,
            duration_seconds,
            crash_fraction: params.crash_fraction,
            min_peak_delay_seconds,
        }
    }
}

/// A generated ride.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ride {
    pub checkpoints: Vec<Checkpoint>,
}

impl Ride {
    /// Last checkpoint index strictly before `crash_fraction`, capped below the final point.
    #[must_use]
    pub fn boundary_index(&self, crash_fraction: f64) -> usize {
        boundary_index(&self.checkpoints, crash_fraction)
    }

    /// Checkpoints up to and including the pre-crash boundary.
    #[must_use]
    pub fn pre_crash(&self, crash_fraction: f64) -> &[Checkpoint] {
        if self.checkpoints.is_empty() {
            return &[];
        }
        let end = self.boundary_index(crash_fraction) + 1;
        &self.checkpoints[..end.min(self.checkpoints.len())]
    }

    /// First checkpoint holding the pre-crash maximum.
    #[must_use]
    pub fn peak(&self, crash_fraction: f64) -> Option<Checkpoint> {
        passes::pre_crash_peak(&self.checkpoints, self.boundary_index(crash_fraction))
            .and_then(|(idx, _)| self.checkpoints.get(idx).copied())
    }
}

fn boundary_index(checkpoints: &[Checkpoint], crash_fraction: f64) -> usize {
    let cap = checkpoints.len().saturating_sub(2);
    checkpoints
        .iter()
        .rposition(|checkpoint| checkpoint.time_fraction < crash_fraction)
        .unwrap_or(0)
        .min(cap)
}

/// Normalised view of a [`RideConfig`] shared by the shape and pass stages.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RideFrame<'a> {
    pub(crate) seed: &'a str,
    pub(crate) min: f64,
    pub(crate) max: f64,
    pub(crate) range: f64,
    pub(crate) floor: f64,
    pub(crate) strength: f64,
    pub(crate) volatility: f64,
    pub(crate) duration_seconds: f64,
    pub(crate) delay_fraction: f64,
    pub(crate) boundary: usize,
    boundary_time: f64,
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Round a bound onto the 6-decimal grid without crossing it.
fn snap_bound(value: f64, upper: bool) -> f64 {
    let rounded = round6(value);
    if upper && rounded > value {
        round6(rounded - VALUE_STEP)
    } else if !upper && rounded < value {
        round6(rounded + VALUE_STEP)
    } else {
        rounded
    }
}

/// Ordered `[min, max]` boost window on the 6-decimal grid.
///
/// Stored values are rounded after clamping, so the bounds sit on the same
/// grid or a rounded value could land just outside the configured window. A
/// window narrower than one grid step collapses onto its snapped cap.
fn window(config: &RideConfig) -> (f64, f64) {
    let lo = finite_or_zero(config.min_boost_pct);
    let hi = finite_or_zero(config.max_boost_pct);
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let max = snap_bound(hi, true);
    let min = snap_bound(lo, false);
    if min <= max { (min, max) } else { (max, max) }
}

impl<'a> RideFrame<'a> {
    pub(crate) fn new(seed: &'a str, config: &RideConfig, checkpoints: &[Checkpoint]) -> Self {
        let (min, max) = window(config);
        let range = (max - min).max(0.0);
        let strength = unit(config.ticket_strength);
        let duration_seconds = finite_or_zero(config.duration_seconds).max(0.0);
        let delay_fraction = if duration_seconds > 0.0 {
            unit(finite_or_zero(config.min_peak_delay_seconds) / duration_seconds)
        } else {
            0.0
        };
        let boundary = boundary_index(checkpoints, finite_or_zero(config.crash_fraction));
        let boundary_time = checkpoints
            .get(boundary)
            .map_or(0.0, |checkpoint| checkpoint.time_fraction);
        Self {
            seed,
            min,
            max,
            range,
            floor: round6(min + range * (START_FLOOR_BASE + START_FLOOR_STRENGTH_SPAN * strength)),
            strength,
            volatility: unit(config.volatility),
            duration_seconds,
            delay_fraction,
            boundary,
            boundary_time,
        }
    }

    /// Time fraction of the pre-crash boundary checkpoint.
    pub(crate) const fn boundary_time(&self) -> f64 {
        self.boundary_time
    }
}

/// Evenly spaced checkpoints at the starting floor, final value 0.
pub(crate) fn initial_checkpoints(config: &RideConfig) -> Vec<Checkpoint> {
    let count = config.checkpoint_count.max(CHECKPOINT_COUNT_MIN);
    let (min, max) = window(config);
    let floor = round6(
        min + (max - min) * (START_FLOOR_BASE + START_FLOOR_STRENGTH_SPAN * unit(config.ticket_strength)),
    );
    let last = count - 1;
    (0..count)
        .map(|index| Checkpoint {
            index,
            time_fraction: round6(usize_to_f64(index) / usize_to_f64(last)),
            boost_value: if index == last { 0.0 } else { floor },
        })
        .collect()
}

/// Generate the ride for `seed`.
#[must_use]
pub fn generate_ride(seed: &str, config: &RideConfig) -> Ride {
    generate_ride_with_log(seed, config).0
}

/// Generate the ride for `seed` together with the enforcement audit trail.
#[must_use]
pub fn generate_ride_with_log(seed: &str, config: &RideConfig) -> (Ride, PassLog) {
    let checkpoints = initial_checkpoints(config);
    let frame = RideFrame::new(seed, config, &checkpoints);
    let shaped = shape::shape_curve(checkpoints, &frame);
    let (checkpoints, log) = passes::enforce(shaped, &frame);
    log::debug!(
        "{LOG_RIDE_GENERATED} checkpoints={} boundary={} passes_changed={}",
        checkpoints.len(),
        frame.boundary,
        log.entries.iter().filter(|entry| !entry.changed.is_empty()).count()
    );
    (Ride { checkpoints }, log)
}
