//! Shape-invariant enforcement passes.
//!
//! Each pass is a pure `Vec<Checkpoint> -> Vec<Checkpoint>` transform over the
//! pre-crash segment. [`enforce`] runs them in a fixed order and records which
//! checkpoints every pass touched.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Checkpoint, RideFrame, shape};
use crate::constants::{
    FLAT_NUDGE_FACTOR, FLAT_NUDGE_MIN, FLAT_THRESHOLD, INITIAL_CLIMB_SECONDS,
    INITIAL_CLIMB_STEP, LOG_RIDE_PASS, PROMOTION_DELTA_MAX, PROMOTION_DELTA_MIN,
    START_BIAS_PROBABILITY, STREAM_PEAK_DELAY, STREAM_START_BIAS, UNIQUE_MAX_EPSILON,
    UNIQUE_MAX_TOLERANCE,
};
use crate::numbers::{round6, usize_to_f64};
use crate::random::SeededRandom;

/// Named enforcement stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementPass {
    StartBias,
    InitialClimb,
    PeakDelay,
    Floor,
    UniqueMax,
    NoFlat,
    CrashTail,
}

impl EnforcementPass {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StartBias => "start-bias",
            Self::InitialClimb => "initial-climb",
            Self::PeakDelay => "peak-delay",
            Self::Floor => "floor",
            Self::UniqueMax => "unique-max",
            Self::NoFlat => "no-flat",
            Self::CrashTail => "crash-tail",
        }
    }
}

/// Checkpoints one pass changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassChange {
    pub pass: EnforcementPass,
    pub changed: SmallVec<[usize; 8]>,
}

/// Audit trail of the enforcement pipeline for one ride.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PassLog {
    pub entries: Vec<PassChange>,
}

impl PassLog {
    fn record(&mut self, pass: EnforcementPass, before: &[Checkpoint], after: &[Checkpoint]) {
        let changed: SmallVec<[usize; 8]> = before
            .iter()
            .zip(after)
            .filter(|(a, b)| a.boost_value.to_bits() != b.boost_value.to_bits())
            .map(|(_, b)| b.index)
            .collect();
        if !changed.is_empty() {
            log::debug!(
                "{LOG_RIDE_PASS} {} changed checkpoints {:?}",
                pass.label(),
                changed.as_slice()
            );
        }
        self.entries.push(PassChange { pass, changed });
    }

    /// Checkpoints changed by `pass` across all of its runs.
    #[must_use]
    pub fn changes_for(&self, pass: EnforcementPass) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .entries
            .iter()
            .filter(|entry| entry.pass == pass)
            .flat_map(|entry| entry.changed.iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

type PassFn = fn(Vec<Checkpoint>, &RideFrame<'_>) -> Vec<Checkpoint>;

const PIPELINE: [(EnforcementPass, PassFn); 10] = [
    (EnforcementPass::StartBias, start_bias),
    (EnforcementPass::InitialClimb, initial_climb),
    (EnforcementPass::PeakDelay, peak_delay),
    (EnforcementPass::Floor, floor),
    (EnforcementPass::UniqueMax, unique_max),
    (EnforcementPass::NoFlat, no_flat),
    // Re-check after flat removal.
    (EnforcementPass::PeakDelay, peak_delay),
    (EnforcementPass::Floor, floor),
    (EnforcementPass::UniqueMax, unique_max),
    (EnforcementPass::CrashTail, shape::decay_tail),
];

/// Run every pass in order.
pub(crate) fn enforce(checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> (Vec<Checkpoint>, PassLog) {
    let mut log = PassLog::default();
    let mut current = checkpoints;
    for (pass, apply) in PIPELINE {
        let before = current.clone();
        current = apply(current, frame);
        log.record(pass, &before, &current);
    }
    (current, log)
}

/// First index holding the largest pre-crash value.
pub(crate) fn pre_crash_peak(checkpoints: &[Checkpoint], boundary: usize) -> Option<(usize, f64)> {
    checkpoints
        .iter()
        .take(boundary + 1)
        .fold(None, |best: Option<(usize, f64)>, checkpoint| match best {
            Some((_, value)) if checkpoint.boost_value <= value => best,
            _ => Some((checkpoint.index, checkpoint.boost_value)),
        })
}

/// (a) Stronger tickets tend to open upward.
pub(crate) fn start_bias(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    if frame.strength <= 0.0 || frame.boundary < 1 || checkpoints.len() < 2 {
        return checkpoints;
    }
    let opening = checkpoints[0].boost_value;
    let next = checkpoints[1].boost_value;
    if next >= opening {
        return checkpoints;
    }
    let mut rng = SeededRandom::for_stream(STREAM_START_BIAS, frame.seed);
    if rng.chance(START_BIAS_PROBABILITY * frame.strength) {
        checkpoints[1].boost_value = round6((opening + (opening - next)).min(frame.max));
    }
    checkpoints
}

/// (b) The first seconds of a ride always climb.
pub(crate) fn initial_climb(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    if frame.duration_seconds <= 0.0 || frame.range <= 0.0 {
        return checkpoints;
    }
    let climb_until = INITIAL_CLIMB_SECONDS / frame.duration_seconds;
    let step = INITIAL_CLIMB_STEP * frame.range;
    for idx in 1..=frame.boundary.min(checkpoints.len().saturating_sub(1)) {
        if checkpoints[idx].time_fraction > climb_until {
            break;
        }
        let previous = checkpoints[idx - 1].boost_value;
        if checkpoints[idx].boost_value <= previous {
            checkpoints[idx].boost_value = round6((previous + step).min(frame.max));
        }
    }
    checkpoints
}

/// (c) The pre-crash maximum never lands before the minimum peak delay.
pub(crate) fn peak_delay(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    let delay = frame.delay_fraction;
    if delay <= 0.0 {
        return checkpoints;
    }
    let Some((peak_idx, peak_value)) = pre_crash_peak(&checkpoints, frame.boundary) else {
        return checkpoints;
    };
    if checkpoints[peak_idx].time_fraction >= delay {
        return checkpoints;
    }
    let candidate = checkpoints
        .iter()
        .take(frame.boundary + 1)
        .filter(|checkpoint| checkpoint.time_fraction >= delay)
        .fold(None, |best: Option<Checkpoint>, checkpoint| match best {
            Some(current) if checkpoint.boost_value <= current.boost_value => best,
            _ => Some(*checkpoint),
        });
    let Some(target) = candidate else {
        return checkpoints;
    };

    let mut rng = SeededRandom::for_stream(STREAM_PEAK_DELAY, frame.seed);
    let delta = frame.range * rng.next_range(PROMOTION_DELTA_MIN, PROMOTION_DELTA_MAX);
    let promoted = round6((peak_value + delta).min(frame.max));
    checkpoints[target.index].boost_value = promoted;

    let lowered = round6((promoted - delta.max(UNIQUE_MAX_EPSILON)).max(frame.min));
    for checkpoint in checkpoints.iter_mut().take(frame.boundary + 1) {
        if checkpoint.time_fraction < delay && checkpoint.boost_value >= promoted - UNIQUE_MAX_TOLERANCE
        {
            checkpoint.boost_value = lowered;
        }
    }
    checkpoints
}

/// (d) Pre-crash values stay within `[floor, max]`.
pub(crate) fn floor(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    for checkpoint in checkpoints.iter_mut().take(frame.boundary + 1) {
        let clamped = checkpoint.boost_value.clamp(frame.floor, frame.max);
        if clamped.to_bits() != checkpoint.boost_value.to_bits() {
            checkpoint.boost_value = round6(clamped);
        }
    }
    checkpoints
}

/// (e) Exactly one checkpoint holds the pre-crash maximum.
pub(crate) fn unique_max(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    let Some((peak_idx, peak_value)) = pre_crash_peak(&checkpoints, frame.boundary) else {
        return checkpoints;
    };
    let mut duplicates = 0_usize;
    for checkpoint in checkpoints.iter_mut().take(frame.boundary + 1) {
        if checkpoint.index == peak_idx {
            continue;
        }
        if (checkpoint.boost_value - peak_value).abs() <= UNIQUE_MAX_TOLERANCE {
            duplicates += 1;
            let lowered = peak_value - UNIQUE_MAX_EPSILON * usize_to_f64(duplicates);
            checkpoint.boost_value = round6(lowered.max(frame.min));
        }
    }
    checkpoints
}

fn trend_at(checkpoints: &[Checkpoint], idx: usize, boundary: usize) -> f64 {
    let direction = if idx >= 2 {
        checkpoints[idx - 1].boost_value - checkpoints[idx - 2].boost_value
    } else if idx < boundary {
        checkpoints[idx + 1].boost_value - checkpoints[idx].boost_value
    } else {
        1.0
    };
    if direction < 0.0 { -1.0 } else { 1.0 }
}

/// (f) Adjacent pre-crash checkpoints never form a flat run.
pub(crate) fn no_flat(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    if frame.range <= 0.0 {
        return checkpoints;
    }
    let nudge = (FLAT_NUDGE_FACTOR * frame.range).max(FLAT_NUDGE_MIN);
    let last = frame.boundary.min(checkpoints.len().saturating_sub(1));
    for idx in 1..=last {
        let previous = checkpoints[idx - 1].boost_value;
        if (checkpoints[idx].boost_value - previous).abs() >= FLAT_THRESHOLD {
            continue;
        }
        let Some((peak_idx, peak_value)) = pre_crash_peak(&checkpoints, frame.boundary) else {
            break;
        };
        let within = |value: f64| value >= frame.floor && value <= frame.max;

        if idx == peak_idx {
            // Move the shoulder, not the peak.
            let shoulder = previous.min(checkpoints[idx].boost_value) - nudge;
            if within(shoulder) {
                checkpoints[idx - 1].boost_value = round6(shoulder);
            }
            continue;
        }

        let trend = trend_at(&checkpoints, idx, frame.boundary);
        let candidates = [previous + trend * nudge, previous - trend * nudge];
        if let Some(value) = candidates
            .into_iter()
            .find(|&value| within(value) && value < peak_value - UNIQUE_MAX_EPSILON)
        {
            checkpoints[idx].boost_value = round6(value);
        }
    }
    checkpoints
}
