//! Turning-point synthesis and eased fill for the pre-crash segment.
use smallvec::SmallVec;
use std::f64::consts::PI;

use super::{Checkpoint, RideFrame};
use crate::constants::{
    FINAL_VALLEY_BIAS, HIGHEST_PEAK_MAX, HIGHEST_PEAK_MIN, MAX_PEAKS, NODE_JITTER,
    NODE_MIN_SPACING, NOISE_STD_FACTOR, OTHER_PEAK_MAX, OTHER_PEAK_MIN,
    PEAK_COUNT_VOLATILITY_SPAN, STREAM_NOISE, STREAM_SHAPE, TURNING_MIN_DELTA, VALLEY_MAX,
    VALLEY_MIN, VALLEY_VOLATILITY_BASE, VALLEY_VOLATILITY_SPAN,
};
use crate::numbers::{floor_f64_to_usize, round6, usize_to_f64};
use crate::random::SeededRandom;

/// Generation-only node: odd positions are peaks, even positions valleys.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TurningPoint {
    pub(crate) time: f64,
    pub(crate) value: f64,
}

/// Up to four peaks plus their valleys and the two anchors.
pub(crate) type TurningPoints = SmallVec<[TurningPoint; 9]>;

/// Cosine easing on `[0, 1]`.
#[must_use]
pub(crate) fn ease(t: f64) -> f64 {
    0.5 - 0.5 * (PI * t.clamp(0.0, 1.0)).cos()
}

fn peak_count(frame: &RideFrame<'_>, rng: &mut SeededRandom) -> usize {
    let max_peaks = (frame.boundary / 2).clamp(1, MAX_PEAKS);
    let spread = 1.0 + PEAK_COUNT_VOLATILITY_SPAN * frame.volatility;
    (1 + floor_f64_to_usize(rng.next_f64() * spread)).min(max_peaks)
}

fn node_times(frame: &RideFrame<'_>, peaks: usize, rng: &mut SeededRandom) -> SmallVec<[f64; 9]> {
    let end = frame.boundary_time();
    let segments = 2 * peaks;
    let segment = end / usize_to_f64(segments);
    let jitter = NODE_JITTER * frame.volatility * segment;
    let min_gap = NODE_MIN_SPACING * segment;

    let mut times: SmallVec<[f64; 9]> = (0..=segments)
        .map(|node| {
            if node == 0 {
                0.0
            } else if node == segments {
                end
            } else {
                usize_to_f64(node) * segment + rng.next_range(-1.0, 1.0) * jitter
            }
        })
        .collect();

    for node in 1..segments {
        times[node] = times[node].max(times[node - 1] + min_gap);
    }
    for node in (1..segments).rev() {
        times[node] = times[node].min(times[node + 1] - min_gap);
    }

    // Keep the opening peak away from the start when the delay allows it.
    let delay = frame.delay_fraction;
    if times[1] < delay && delay + min_gap <= times[2] {
        times[1] = delay;
    }
    times
}

fn highest_peak_node(times: &[f64], delay: f64, rng: &mut SeededRandom) -> usize {
    let peaks: SmallVec<[usize; 4]> = (1..times.len()).step_by(2).collect();
    let late: SmallVec<[usize; 4]> = peaks
        .iter()
        .copied()
        .filter(|&node| times[node] >= delay)
        .collect();
    let pool = if late.is_empty() { peaks } else { late };
    let pick = floor_f64_to_usize(rng.next_f64() * usize_to_f64(pool.len()));
    pool[pick.min(pool.len() - 1)]
}

/// Build the turning points spanning `[0, boundary_time]`.
pub(crate) fn build_turning_points(frame: &RideFrame<'_>) -> TurningPoints {
    let mut rng = SeededRandom::for_stream(STREAM_SHAPE, frame.seed);
    let peaks = peak_count(frame, &mut rng);
    let times = node_times(frame, peaks, &mut rng);
    let last = times.len() - 1;
    let highest_node = highest_peak_node(&times, frame.delay_fraction, &mut rng);

    let range = frame.range;
    let min_delta = TURNING_MIN_DELTA * range;
    let highest = frame.min + range * rng.next_range(HIGHEST_PEAK_MIN, HIGHEST_PEAK_MAX);

    let mut values: SmallVec<[f64; 9]> = SmallVec::with_capacity(times.len());
    let mut shifted = 0_usize;
    for node in 0..=last {
        let value = if node == 0 {
            frame.floor
        } else if node == highest_node {
            highest
        } else if node % 2 == 1 {
            let drawn = frame.min + range * rng.next_range(OTHER_PEAK_MIN, OTHER_PEAK_MAX);
            if drawn > highest - min_delta {
                shifted += 1;
                highest - min_delta * usize_to_f64(shifted)
            } else {
                drawn
            }
        } else {
            let drawn = rng.next_range(VALLEY_MIN, VALLEY_MAX);
            let depth = VALLEY_VOLATILITY_BASE + VALLEY_VOLATILITY_SPAN * frame.volatility;
            let mut fraction = VALLEY_MAX - (VALLEY_MAX - drawn) * depth;
            if node == last {
                fraction *= FINAL_VALLEY_BIAS;
            }
            frame.min + range * fraction
        };
        values.push(value);
    }

    // Alternation: peaks clear the floor, valleys sit under both neighbours.
    for node in (1..=last).step_by(2) {
        values[node] = (values[node].max(frame.floor + min_delta)).min(frame.max);
    }
    for node in (2..=last).step_by(2) {
        let mut value = values[node].min(values[node - 1] - min_delta);
        if node < last {
            value = value.min(values[node + 1] - min_delta);
        }
        values[node] = value.max(frame.min);
    }

    times
        .iter()
        .zip(values.iter())
        .map(|(&time, &value)| TurningPoint { time, value })
        .collect()
}

fn eased_value(nodes: &[TurningPoint], time: f64) -> f64 {
    let Some(first) = nodes.first() else {
        return 0.0;
    };
    if time <= first.time {
        return first.value;
    }
    for pair in nodes.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if time <= to.time {
            let width = to.time - from.time;
            let local = if width > 0.0 {
                (time - from.time) / width
            } else {
                1.0
            };
            return from.value + (to.value - from.value) * ease(local);
        }
    }
    nodes.last().map_or(0.0, |node| node.value)
}

/// Fill pre-crash checkpoints from the turning points, then decay the tail.
pub(crate) fn shape_curve(
    mut checkpoints: Vec<Checkpoint>,
    frame: &RideFrame<'_>,
) -> Vec<Checkpoint> {
    if frame.boundary >= 1 {
        let nodes = build_turning_points(frame);
        let mut noise = SeededRandom::for_stream(STREAM_NOISE, frame.seed);
        let noise_std = NOISE_STD_FACTOR * frame.range * frame.volatility;
        for checkpoint in checkpoints.iter_mut().take(frame.boundary + 1) {
            let mut value = eased_value(&nodes, checkpoint.time_fraction);
            if checkpoint.index > 0 && checkpoint.index < frame.boundary {
                value += noise.normal(0.0, noise_std);
            }
            checkpoint.boost_value = round6(value.clamp(frame.min, frame.max));
        }
    }
    decay_tail(checkpoints, frame)
}

/// Quadratic decay from the boundary value to zero; the final checkpoint is 0.
pub(crate) fn decay_tail(mut checkpoints: Vec<Checkpoint>, frame: &RideFrame<'_>) -> Vec<Checkpoint> {
    let Some(boundary) = checkpoints.get(frame.boundary).copied() else {
        return checkpoints;
    };
    let span = 1.0 - boundary.time_fraction;
    for checkpoint in checkpoints.iter_mut().skip(frame.boundary + 1) {
        let progress = if span > 0.0 {
            ((checkpoint.time_fraction - boundary.time_fraction) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let remaining = 1.0 - progress;
        checkpoint.boost_value = round6(boundary.boost_value * remaining * remaining);
    }
    if let Some(last) = checkpoints.last_mut() {
        last.boost_value = 0.0;
    }
    checkpoints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ride::{RideConfig, RideFrame, initial_checkpoints};

    fn frame_for<'a>(seed: &'a str, config: &RideConfig) -> (RideFrame<'a>, Vec<Checkpoint>) {
        let checkpoints = initial_checkpoints(config);
        (RideFrame::new(seed, config, &checkpoints), checkpoints)
    }

    fn config() -> RideConfig {
        RideConfig {
            checkpoint_count: 14,
            volatility: 0.6,
            min_boost_pct: 0.05,
            max_boost_pct: 0.5,
            ticket_strength: 0.4,
            duration_seconds: 30.0,
            crash_fraction: 0.8,
            min_peak_delay_seconds: 4.0,
        }
    }

    #[test]
    fn easing_hits_endpoints_and_midpoint() {
        assert!(ease(0.0).abs() < 1e-12);
        assert!((ease(1.0) - 1.0).abs() < 1e-12);
        assert!((ease(0.5) - 0.5).abs() < 1e-12);
        assert!(ease(0.25) < 0.25);
    }

    #[test]
    fn turning_points_alternate_and_span_pre_crash_window() {
        let cfg = config();
        let (frame, _) = frame_for("turning", &cfg);
        let nodes = build_turning_points(&frame);
        assert_eq!(nodes.len() % 2, 1);
        assert!(nodes.len() >= 3 && nodes.len() <= 9);
        assert!(nodes[0].time.abs() < f64::EPSILON);
        assert!((nodes[nodes.len() - 1].time - frame.boundary_time()).abs() < 1e-12);
        for pair in nodes.windows(2) {
            assert!(pair[1].time > pair[0].time, "times not increasing: {nodes:?}");
        }
        for (idx, node) in nodes.iter().enumerate().skip(1) {
            let prev = nodes[idx - 1].value;
            if idx % 2 == 1 {
                assert!(node.value > prev, "peak {idx} not above valley: {nodes:?}");
            } else {
                assert!(node.value < prev, "valley {idx} not below peak: {nodes:?}");
            }
        }
    }

    #[test]
    fn highest_peak_is_unique_among_peaks() {
        for idx in 0..50 {
            let seed = format!("unique-peak-{idx}");
            let cfg = config();
            let (frame, _) = frame_for(&seed, &cfg);
            let nodes = build_turning_points(&frame);
            let peaks: Vec<f64> = nodes.iter().skip(1).step_by(2).map(|n| n.value).collect();
            let top = peaks.iter().copied().fold(f64::MIN, f64::max);
            assert_eq!(peaks.iter().filter(|&&v| (v - top).abs() < 1e-9).count(), 1);
        }
    }

    #[test]
    fn tail_decays_to_zero() {
        let cfg = config();
        let (frame, checkpoints) = frame_for("tail", &cfg);
        let shaped = shape_curve(checkpoints, &frame);
        let tail: Vec<f64> = shaped
            .iter()
            .skip(frame.boundary)
            .map(|c| c.boost_value)
            .collect();
        for pair in tail.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(shaped.last().expect("final").boost_value.abs() < f64::EPSILON);
    }
}
