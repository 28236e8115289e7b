use anyhow::{Context, Result, ensure};
use boostride_engine::{
    PassLog, RewardProfile, Ride, RideConfig, RideParams, Selection, TicketAssessment,
    derive_ride_duration_seconds, derive_ride_params, generate_ride_with_log,
};
use std::path::Path;

/// Profile and ticket every check runs against.
#[derive(Debug, Clone)]
pub struct Fixture {
    pub profile: RewardProfile,
    pub ticket: Vec<Selection>,
    pub assessment: TicketAssessment,
}

/// Everything derived from one seed under a fixture.
#[derive(Debug, Clone)]
pub struct RideSample {
    pub seed: String,
    pub duration_seconds: f64,
    pub params: RideParams,
    pub config: RideConfig,
    pub ride: Ride,
    pub log: PassLog,
}

impl Fixture {
    /// Build a fixture from an optional profile file and ticket shape.
    pub fn load(profile_path: Option<&Path>, selections: u32, combined_odds: f64) -> Result<Self> {
        let profile = match profile_path {
            Some(path) => load_profile(path)?,
            None => RewardProfile::default(),
        };
        let ticket = synthetic_ticket(selections, combined_odds)?;
        Ok(Self::new(profile, ticket))
    }

    #[must_use]
    pub fn new(profile: RewardProfile, ticket: Vec<Selection>) -> Self {
        let assessment = profile.assess_ticket(&ticket);
        Self {
            profile,
            ticket,
            assessment,
        }
    }

    /// Derive and generate the ride `seed` would get at opt-in.
    #[must_use]
    pub fn ride_for(&self, seed: &str) -> RideSample {
        let duration_seconds = derive_ride_duration_seconds(
            seed,
            self.profile.ride_duration_min_seconds,
            self.profile.ride_duration_max_seconds,
        );
        let params = derive_ride_params(seed, duration_seconds, self.profile.min_crash_seconds);
        let config = RideConfig::from_params(
            &params,
            self.profile.boost.min_boost_pct,
            self.profile.boost.max_boost_pct,
            self.assessment.strength,
            duration_seconds,
            self.profile.min_peak_delay_seconds,
        );
        let (ride, log) = generate_ride_with_log(seed, &config);
        RideSample {
            seed: seed.to_string(),
            duration_seconds,
            params,
            config,
            ride,
            log,
        }
    }
}

fn load_profile(path: &Path) -> Result<RewardProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile {}", path.display()))?;
    RewardProfile::from_json(&raw)
        .map_err(|err| anyhow::anyhow!(err))
        .with_context(|| format!("invalid profile {}", path.display()))
}

/// `count` selections whose odds multiply to `combined_odds`.
pub fn synthetic_ticket(count: u32, combined_odds: f64) -> Result<Vec<Selection>> {
    ensure!(count > 0, "ticket needs at least one selection");
    ensure!(
        combined_odds.is_finite() && combined_odds >= 1.0,
        "combined odds must be a finite number of at least 1 (got {combined_odds})"
    );
    let per_leg = combined_odds.powf(1.0 / f64::from(count));
    Ok((1..=count)
        .map(|leg| Selection::new(format!("leg-{leg}"), per_leg))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_ticket_multiplies_to_target() {
        let ticket = synthetic_ticket(4, 12.0).unwrap();
        assert_eq!(ticket.len(), 4);
        let product: f64 = ticket.iter().map(|s| s.odds).product();
        assert!((product - 12.0).abs() < 1e-9);
    }

    #[test]
    fn synthetic_ticket_rejects_bad_shapes() {
        assert!(synthetic_ticket(0, 12.0).is_err());
        assert!(synthetic_ticket(3, 0.5).is_err());
        assert!(synthetic_ticket(3, f64::NAN).is_err());
    }

    #[test]
    fn default_fixture_is_eligible() {
        let fixture = Fixture::load(None, 4, 12.0).unwrap();
        assert_eq!(fixture.assessment.qualifying_count, 4);
        assert!(fixture.assessment.is_eligible());
        assert!(fixture.assessment.strength > 0.0);
    }

    #[test]
    fn ride_for_matches_profile_bounds() {
        let fixture = Fixture::load(None, 4, 12.0).unwrap();
        let sample = fixture.ride_for(&boostride_engine::generate_seed("1", "tester", "v1"));
        assert!((20.0..=60.0).contains(&sample.duration_seconds));
        assert_eq!(sample.ride.checkpoints.len(), sample.params.checkpoint_count);
        assert!((sample.config.crash_fraction - sample.params.crash_fraction).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_profile_reports_path() {
        let err = Fixture::load(Some(Path::new("/nonexistent/profile.json")), 4, 12.0)
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/profile.json"));
    }

    #[test]
    fn invalid_profile_is_rejected() {
        let path = std::env::temp_dir().join("boostride-invalid-profile.json");
        std::fs::write(&path, r#"{"path_sample_count":0}"#).unwrap();
        let err = Fixture::load(Some(&path), 4, 12.0).unwrap_err();
        assert!(format!("{err:#}").contains("invalid profile"));
    }
}
