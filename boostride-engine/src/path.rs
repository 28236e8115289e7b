//! Display path disclosed at lock time.
//!
//! The stored curve is resampled through the interpolator and the boost
//! model. Samples inside the boost window show exactly what a lock would pay.
//! Samples the model would clamp are folded into a headroom band under the cap
//! (and above the floor) so capped stretches keep moving instead of drawing a
//! flat plateau.
use serde::{Deserialize, Serialize};

use crate::boost::{BoostConfig, BoostModel, compute_boost_model_details, raw_boost};
use crate::constants::{PATH_HEADROOM_BAND, PATH_SAMPLE_MIN};
use crate::interpolate::interpolate_ride_value;
use crate::numbers::{round6, usize_to_f64};
use crate::ride::Checkpoint;

/// One sample of the disclosed path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub time_fraction: f64,
    pub boost_value: f64,
}

/// Inputs to [`build_effective_ride_path`].
#[derive(Debug, Clone, Copy)]
pub struct PathRequest<'a> {
    pub checkpoints: &'a [Checkpoint],
    pub sample_count: usize,
    pub crash_fraction: f64,
    pub ticket_strength: f64,
    pub config: &'a BoostConfig,
    pub qualifying_selections: u32,
    pub combined_odds: f64,
}

struct Headroom {
    low: f64,
    high: f64,
    band: f64,
    overshoot: f64,
    undershoot: f64,
}

impl Headroom {
    fn new(model: &BoostModel) -> Self {
        let low = model.effective_min_boost;
        let high = model.effective_max_boost.max(low);
        Self {
            low,
            high,
            band: PATH_HEADROOM_BAND * (high - low),
            overshoot: 0.0,
            undershoot: 0.0,
        }
    }

    fn observe(&mut self, raw: f64) {
        self.overshoot = self.overshoot.max(raw - self.high);
        self.undershoot = self.undershoot.max(self.low - raw);
    }

    /// Samples inside the window pass through; clamped samples land in the
    /// band next to the bound they crossed, ordered by how far they crossed it.
    fn reshape(&self, raw: f64) -> f64 {
        let value = if raw > self.high && self.overshoot > 0.0 {
            (self.high - self.band) + self.band * (raw - self.high) / self.overshoot
        } else if raw < self.low && self.undershoot > 0.0 {
            (self.low + self.band) - self.band * (self.low - raw) / self.undershoot
        } else {
            raw
        };
        round6(value.clamp(self.low, self.high))
    }
}

/// Resample the ride into `sample_count` display points.
#[must_use]
pub fn build_effective_ride_path(request: &PathRequest<'_>) -> Vec<PathPoint> {
    let model = compute_boost_model_details(
        request.qualifying_selections,
        request.combined_odds,
        request.config,
    );
    let count = request.sample_count.max(PATH_SAMPLE_MIN);
    let last = usize_to_f64(count - 1);

    let samples: Vec<(f64, Option<f64>)> = (0..count)
        .map(|idx| {
            let time_fraction = round6(usize_to_f64(idx) / last);
            let raw = (time_fraction < request.crash_fraction).then(|| {
                let ride_value = interpolate_ride_value(request.checkpoints, time_fraction);
                raw_boost(ride_value, request.ticket_strength, &model)
            });
            (time_fraction, raw)
        })
        .collect();

    let mut headroom = Headroom::new(&model);
    for raw in samples.iter().filter_map(|(_, raw)| *raw) {
        headroom.observe(raw);
    }

    samples
        .into_iter()
        .map(|(time_fraction, raw)| PathPoint {
            time_fraction,
            boost_value: raw.map_or(0.0, |raw| headroom.reshape(raw)),
        })
        .collect()
}
