use boostride_engine::{
    LockRecord, MemoryRideStore, RewardProfile, RewardRecord, RewardStatus, RideService,
    RideServiceError, RideStore, Selection, interpolate_ride_value, verify_ride_digest,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn ticket() -> Vec<Selection> {
    vec![
        Selection::new("home", 1.9),
        Selection::new("away", 2.4),
        Selection::new("draw", 3.1),
        Selection::ineligible("boosted", 5.0),
        Selection::new("short", 1.05),
    ]
}

fn at_fraction(record: &RewardRecord, fraction: f64) -> DateTime<Utc> {
    let started = record.started_at.expect("started");
    let millis = (record.duration_seconds * fraction * 1000.0).floor() as i64;
    started + TimeDelta::milliseconds(millis)
}

#[test]
fn full_reward_lifecycle() {
    let service = RideService::new(MemoryRideStore::default());
    let profile = RewardProfile::default();

    let granted = service
        .grant("reward-42", "user-7", &profile, t0())
        .expect("grant");
    assert_eq!(granted.status, RewardStatus::Granted);
    assert!(granted.checkpoints.is_empty());

    let active = service
        .opt_in("reward-42", &ticket(), &profile, t0())
        .expect("opt in");
    let params = active.params.expect("params");
    assert_eq!(active.checkpoints.len(), params.checkpoint_count);
    assert!(verify_ride_digest(
        &active.seed,
        &params,
        &active.checkpoints,
        active.digest.as_deref().expect("digest")
    ));

    let when = at_fraction(&active, params.crash_fraction * 0.6);
    let quote = service
        .quote("reward-42", &ticket(), &profile, when)
        .expect("quote");
    assert_eq!(quote.qualifying_selections, 3);
    assert!(!quote.crashed);
    assert!(
        (quote.ride_value - interpolate_ride_value(&active.checkpoints, quote.elapsed_fraction))
            .abs()
            < 1e-12
    );

    let lock = service
        .lock("reward-42", "bet-1", &ticket(), &profile, when)
        .expect("lock");
    assert_eq!(lock.boost, quote.boost);
    assert!(lock.path.iter().all(|p| p.time_fraction < params.crash_fraction
        || p.boost_value.abs() < f64::EPSILON));

    let bonus = service
        .settle("reward-42", "bet-1", 80.0)
        .expect("settle");
    assert!(bonus > 0.0);
    let record = service
        .store()
        .load_reward("reward-42")
        .expect("load")
        .expect("record");
    assert_eq!(record.status, RewardStatus::Settled);
    assert!(service.verify("reward-42", &profile).expect("verify"));
}

#[test]
fn locking_after_crash_is_rejected() {
    let service = RideService::new(MemoryRideStore::default());
    let profile = RewardProfile::default();
    service
        .grant("reward-9", "user-1", &profile, t0())
        .expect("grant");
    let active = service
        .opt_in("reward-9", &ticket(), &profile, t0())
        .expect("opt in");
    let crash = active.params.expect("params").crash_fraction;
    let after = at_fraction(&active, (crash + 1.0) / 2.0);
    let err = service
        .lock("reward-9", "bet-1", &ticket(), &profile, after)
        .expect_err("crashed");
    assert_eq!(err.code(), "ride_crashed");
    let quote = service
        .quote("reward-9", &ticket(), &profile, after)
        .expect("quote");
    assert!(quote.crashed && !quote.ended);
    assert!(quote.boost.final_boost_pct.abs() < f64::EPSILON);
}

#[test]
fn combined_odds_threshold_blocks_lock() {
    let service = RideService::new(MemoryRideStore::default());
    let profile = RewardProfile {
        min_combined_odds: Some(50.0),
        ..RewardProfile::default()
    };
    service
        .grant("reward-5", "user-1", &profile, t0())
        .expect("grant");
    let active = service
        .opt_in("reward-5", &ticket(), &profile, t0())
        .expect("opt in");
    let when = at_fraction(&active, 0.01);
    let err = service
        .lock("reward-5", "bet-1", &ticket(), &profile, when)
        .expect_err("odds too low");
    assert!(matches!(err, RideServiceError::CombinedOddsTooLow { .. }));
}

#[derive(Debug, thiserror::Error)]
#[error("store offline")]
struct Offline;

struct OfflineStore;

impl RideStore for OfflineStore {
    type Error = Offline;

    fn load_reward(&self, _reward_id: &str) -> Result<Option<RewardRecord>, Self::Error> {
        Err(Offline)
    }

    fn save_reward(&self, _record: &RewardRecord) -> Result<(), Self::Error> {
        Err(Offline)
    }

    fn load_lock(&self, _reward_id: &str, _bet_id: &str) -> Result<Option<LockRecord>, Self::Error> {
        Err(Offline)
    }

    fn save_lock(&self, _record: &LockRecord) -> Result<(), Self::Error> {
        Err(Offline)
    }
}

#[test]
fn storage_failures_surface_as_store_errors() {
    let service = RideService::new(OfflineStore);
    let err = service
        .grant("reward-1", "user-1", &RewardProfile::default(), t0())
        .expect_err("offline");
    assert!(matches!(err, RideServiceError::Store(Offline)));
    assert_eq!(err.to_string(), "storage error: store offline");
}
