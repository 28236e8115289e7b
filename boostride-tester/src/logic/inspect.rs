use boostride_engine::{
    Checkpoint, PassLog, PathPoint, PathRequest, RideParams, build_effective_ride_path,
    ride_digest,
};
use serde::Serialize;

use super::fixture::Fixture;
use super::seeds::SeedInfo;

/// Full breakdown of one ride: parameters, curve, pass log and disclosed path.
#[derive(Debug, Clone, Serialize)]
pub struct RideInspection {
    pub seed_label: String,
    pub seed: String,
    pub duration_seconds: f64,
    pub params: RideParams,
    pub ticket_strength: f64,
    pub qualifying_selections: u32,
    pub combined_odds: f64,
    pub peak: Option<Checkpoint>,
    pub checkpoints: Vec<Checkpoint>,
    pub passes: PassLog,
    pub path: Vec<PathPoint>,
    pub digest: String,
}

impl RideInspection {
    /// Checkpoint indices touched by any enforcement pass.
    #[must_use]
    pub fn touched(&self) -> Vec<usize> {
        let mut touched: Vec<usize> = self
            .passes
            .entries
            .iter()
            .flat_map(|entry| entry.changed.iter().copied())
            .collect();
        touched.sort_unstable();
        touched.dedup();
        touched
    }
}

pub fn inspect_ride(fixture: &Fixture, seed: &SeedInfo) -> RideInspection {
    let sample = fixture.ride_for(&seed.seed);
    let crash = sample.params.crash_fraction;
    let path = build_effective_ride_path(&PathRequest {
        checkpoints: &sample.ride.checkpoints,
        sample_count: fixture.profile.path_sample_count,
        crash_fraction: crash,
        ticket_strength: fixture.assessment.strength,
        config: &fixture.profile.boost,
        qualifying_selections: fixture.assessment.qualifying_count,
        combined_odds: fixture.assessment.combined_odds,
    });
    RideInspection {
        seed_label: seed.label.clone(),
        seed: seed.seed.clone(),
        duration_seconds: sample.duration_seconds,
        params: sample.params,
        ticket_strength: fixture.assessment.strength,
        qualifying_selections: fixture.assessment.qualifying_count,
        combined_odds: fixture.assessment.combined_odds,
        peak: sample.ride.peak(crash),
        digest: ride_digest(&sample.seed, &sample.params, &sample.ride.checkpoints),
        checkpoints: sample.ride.checkpoints,
        passes: sample.log,
        path,
    }
}
