use anyhow::{Context, Result, bail, ensure};
use boostride_engine::numbers::{round_f64_to_i64, u32_to_f64, usize_to_f64};
use boostride_engine::{
    BoostInputs, MemoryRideStore, PathRequest, RideService, StrengthConfig,
    build_effective_ride_path, calculate_final_boost_details, compute_ticket_strength,
    interpolate_ride_value, is_crashed, ride_digest, verify_ride_digest,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use super::fixture::{Fixture, RideSample};
use super::seeds::SWEEP_USER_ID;

const TIE_TOLERANCE: f64 = 1e-6;
const BOUND_TOLERANCE: f64 = 1e-9;
const PROBE_COUNT: usize = 25;

pub type CheckFn = fn(&Fixture, &RideSample) -> Result<()>;

/// One named invariant run per seed and iteration.
pub struct Check {
    pub key: &'static str,
    pub description: &'static str,
    pub run: CheckFn,
}

pub const CHECKS: &[Check] = &[
    Check {
        key: "determinism",
        description: "Replaying a seed reproduces the ride and its digest",
        run: check_determinism,
    },
    Check {
        key: "boundary-shape",
        description: "Rides span 0..1 with increasing times and end at 0",
        run: check_boundary_shape,
    },
    Check {
        key: "bounds",
        description: "Pre-crash values stay inside the boost window",
        run: check_bounds,
    },
    Check {
        key: "unique-max",
        description: "Exactly one pre-crash checkpoint holds the maximum",
        run: check_unique_max,
    },
    Check {
        key: "peak-delay",
        description: "The pre-crash maximum never lands before the peak delay",
        run: check_peak_delay,
    },
    Check {
        key: "crash-containment",
        description: "Nothing is shown after the crash and the path shows the lockable boost before it",
        run: check_crash_containment,
    },
    Check {
        key: "boost-clamp",
        description: "Final boosts stay between the effective bounds",
        run: check_boost_clamp,
    },
    Check {
        key: "strength-monotone",
        description: "Ticket strength never drops as selections or odds grow",
        run: check_strength_monotone,
    },
    Check {
        key: "lock-idempotence",
        description: "Repeated locks and settlements return the stored result",
        run: check_lock_idempotence,
    },
];

pub const SMOKE_CHECKS: &[&str] = &["determinism", "boundary-shape", "bounds"];

pub fn list_checks() -> impl Iterator<Item = (&'static str, &'static str)> {
    CHECKS.iter().map(|check| (check.key, check.description))
}

pub fn get_check(key: &str) -> Option<&'static Check> {
    CHECKS.iter().find(|check| check.key == key)
}

fn window(fixture: &Fixture) -> (f64, f64) {
    let boost = &fixture.profile.boost;
    (boost.min_boost_pct, boost.max_boost_pct)
}

fn check_determinism(fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let replay = fixture.ride_for(&sample.seed);
    ensure!(
        replay.params == sample.params,
        "params differ on replay: {:?} vs {:?}",
        replay.params,
        sample.params
    );
    ensure!(
        replay.ride == sample.ride,
        "checkpoints differ on replay"
    );
    let digest = ride_digest(&sample.seed, &sample.params, &sample.ride.checkpoints);
    ensure!(
        verify_ride_digest(&replay.seed, &replay.params, &replay.ride.checkpoints, &digest),
        "digest mismatch on replay"
    );
    Ok(())
}

fn check_boundary_shape(_fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let checkpoints = &sample.ride.checkpoints;
    let (Some(first), Some(last)) = (checkpoints.first(), checkpoints.last()) else {
        bail!("ride has no checkpoints");
    };
    ensure!(checkpoints.len() >= 6, "only {} checkpoints", checkpoints.len());
    ensure!(first.time_fraction == 0.0, "first time is {}", first.time_fraction);
    ensure!(last.time_fraction == 1.0, "last time is {}", last.time_fraction);
    ensure!(last.boost_value == 0.0, "final value is {}", last.boost_value);
    for (position, pair) in checkpoints.windows(2).enumerate() {
        ensure!(
            pair[1].time_fraction > pair[0].time_fraction,
            "time does not increase at checkpoint {}",
            position + 1
        );
        ensure!(
            pair[0].index == position && pair[1].index == position + 1,
            "index gap at checkpoint {}",
            position + 1
        );
    }
    Ok(())
}

fn check_bounds(fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let (min, max) = window(fixture);
    let crash = sample.params.crash_fraction;
    for checkpoint in sample.ride.pre_crash(crash) {
        ensure!(
            checkpoint.boost_value >= min - BOUND_TOLERANCE
                && checkpoint.boost_value <= max + BOUND_TOLERANCE,
            "checkpoint {} value {:.6} outside [{min:.4}, {max:.4}]",
            checkpoint.index,
            checkpoint.boost_value
        );
    }
    for checkpoint in &sample.ride.checkpoints {
        ensure!(
            (0.0..=max + BOUND_TOLERANCE).contains(&checkpoint.boost_value),
            "checkpoint {} value {:.6} outside [0, {max:.4}]",
            checkpoint.index,
            checkpoint.boost_value
        );
    }
    Ok(())
}

fn check_unique_max(fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let (min, max) = window(fixture);
    if max - min <= 0.0 {
        return Ok(());
    }
    let early = sample.ride.pre_crash(sample.params.crash_fraction);
    let top = early
        .iter()
        .map(|checkpoint| checkpoint.boost_value)
        .fold(f64::MIN, f64::max);
    let holders: Vec<usize> = early
        .iter()
        .filter(|checkpoint| (checkpoint.boost_value - top).abs() <= TIE_TOLERANCE)
        .map(|checkpoint| checkpoint.index)
        .collect();
    ensure!(
        holders.len() == 1,
        "maximum {top:.6} shared by checkpoints {holders:?}"
    );
    Ok(())
}

fn check_peak_delay(fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let (min, max) = window(fixture);
    if max - min <= 0.0 || sample.duration_seconds <= 0.0 {
        return Ok(());
    }
    let delay = (fixture.profile.min_peak_delay_seconds / sample.duration_seconds).clamp(0.0, 1.0);
    let crash = sample.params.crash_fraction;
    let reachable = sample
        .ride
        .pre_crash(crash)
        .iter()
        .any(|checkpoint| checkpoint.time_fraction >= delay);
    if delay <= 0.0 || !reachable {
        return Ok(());
    }
    let peak = sample.ride.peak(crash).context("ride has no pre-crash peak")?;
    ensure!(
        peak.time_fraction >= delay,
        "peak at {:.6} before delay {delay:.6}",
        peak.time_fraction
    );
    Ok(())
}

fn check_crash_containment(fixture: &Fixture, sample: &RideSample) -> Result<()> {
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
    for point in &path {
        if point.time_fraction >= crash {
            ensure!(
                point.boost_value == 0.0,
                "path shows {:.6} at {:.6} after crash {crash:.4}",
                point.boost_value,
                point.time_fraction
            );
            continue;
        }
        let locked = calculate_final_boost_details(
            &BoostInputs {
                ride_value: interpolate_ride_value(&sample.ride.checkpoints, point.time_fraction),
                ticket_strength: fixture.assessment.strength,
                qualifying_selections: fixture.assessment.qualifying_count,
                combined_odds: fixture.assessment.combined_odds,
                has_ride_ended: false,
            },
            &fixture.profile.boost,
        );
        if !locked.is_clamped_to_max && !locked.is_clamped_to_min {
            ensure!(
                (point.boost_value - locked.final_boost_pct).abs() <= BOUND_TOLERANCE,
                "path shows {:.6} at {:.6} but a lock pays {:.6}",
                point.boost_value,
                point.time_fraction,
                locked.final_boost_pct
            );
        }
    }
    ensure!(is_crashed(crash, crash), "crash fraction itself is not crashed");
    let before = (crash - 1e-4).max(0.0);
    if before < crash {
        ensure!(!is_crashed(before, crash), "{before:.6} reported as crashed");
    }
    Ok(())
}

fn check_boost_clamp(fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let crash = sample.params.crash_fraction;
    for probe in 0..PROBE_COUNT {
        let elapsed = crash * usize_to_f64(probe) / usize_to_f64(PROBE_COUNT);
        let ride_value = interpolate_ride_value(&sample.ride.checkpoints, elapsed);
        let inputs = BoostInputs {
            ride_value,
            ticket_strength: fixture.assessment.strength,
            qualifying_selections: fixture.assessment.qualifying_count,
            combined_odds: fixture.assessment.combined_odds,
            has_ride_ended: false,
        };
        let boost = calculate_final_boost_details(&inputs, &fixture.profile.boost);
        ensure!(
            boost.final_boost_pct >= boost.min_boost - BOUND_TOLERANCE
                && boost.final_boost_pct <= boost.effective_max_boost + BOUND_TOLERANCE,
            "boost {:.6} at {elapsed:.4} outside [{:.6}, {:.6}]",
            boost.final_boost_pct,
            boost.min_boost,
            boost.effective_max_boost
        );
        ensure!(
            !(boost.is_clamped_to_max && boost.is_clamped_to_min),
            "boost at {elapsed:.4} clamped both ways"
        );

        let ended = calculate_final_boost_details(
            &BoostInputs {
                has_ride_ended: true,
                ..inputs
            },
            &fixture.profile.boost,
        );
        ensure!(
            ended.final_boost_pct == 0.0,
            "ended ride still quotes {:.6}",
            ended.final_boost_pct
        );
    }
    Ok(())
}

fn check_strength_monotone(fixture: &Fixture, _sample: &RideSample) -> Result<()> {
    let config: &StrengthConfig = &fixture.profile.strength;
    let base_odds = fixture.assessment.combined_odds.max(1.5);
    let mut previous = 0.0;
    for count in 0..=config.min_selections + config.max_selection_bonus + 2 {
        let strength = compute_ticket_strength(count, base_odds, config);
        ensure!(
            strength + TIE_TOLERANCE >= previous,
            "strength fell from {previous:.6} to {strength:.6} at {count} selections"
        );
        previous = strength;
    }

    let count = config.min_selections.max(fixture.assessment.qualifying_count);
    let mut previous = 0.0;
    for step in 0..40_u32 {
        let odds = 1.0 + u32_to_f64(step) * 0.75;
        let strength = compute_ticket_strength(count, odds, config);
        ensure!(
            strength + TIE_TOLERANCE >= previous,
            "strength fell from {previous:.6} to {strength:.6} at odds {odds:.2}"
        );
        previous = strength;
    }
    Ok(())
}

fn check_lock_idempotence(fixture: &Fixture, sample: &RideSample) -> Result<()> {
    let service = RideService::new(MemoryRideStore::default());
    let reward_id = format!("sweep-{}", sample.seed.get(..16).unwrap_or(&sample.seed));
    let start = epoch()?;

    service.grant(&reward_id, SWEEP_USER_ID, &fixture.profile, start)?;
    let record = service.opt_in(&reward_id, &fixture.ticket, &fixture.profile, start)?;
    let params = record.params.context("opted-in reward has no params")?;
    let at = |fraction: f64| {
        start + TimeDelta::milliseconds(millis(record.duration_seconds * fraction))
    };
    let when = at(params.crash_fraction * 0.5);

    let first = service.lock(&reward_id, "bet-1", &fixture.ticket, &fixture.profile, when);
    let again = service.lock(
        &reward_id,
        "bet-1",
        &fixture.ticket,
        &fixture.profile,
        at(params.crash_fraction * 0.9),
    );

    match (first, again) {
        (Ok(first), Ok(again)) => {
            ensure!(first == again, "second lock differs from the first");
            let bonus = service.settle(&reward_id, "bet-1", 100.0)?;
            let repeat = service.settle(&reward_id, "bet-1", 250.0)?;
            ensure!(
                bonus == repeat,
                "settlement changed from {bonus:.4} to {repeat:.4}"
            );
            ensure!(
                service.verify(&reward_id, &fixture.profile)?,
                "stored ride failed verification"
            );
        }
        (Err(first), Err(again)) => {
            ensure!(
                !fixture.assessment.is_eligible(),
                "eligible ticket rejected: {first}"
            );
            ensure!(
                first.code() == again.code(),
                "rejection changed from {} to {}",
                first.code(),
                again.code()
            );
        }
        (first, again) => bail!(
            "lock outcome changed between calls: {:?} then {:?}",
            first.map(|lock| lock.boost.final_boost_pct),
            again.map(|lock| lock.boost.final_boost_pct)
        ),
    }
    ensure!(
        service.store().lock_count() <= 1,
        "{} locks stored for one bet",
        service.store().lock_count()
    );
    Ok(())
}

fn epoch() -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(1_767_225_600, 0)
        .single()
        .context("sweep start timestamp out of range")
}

fn millis(seconds: f64) -> i64 {
    round_f64_to_i64(seconds * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use boostride_engine::{BoostConfig, RewardProfile, Selection, generate_seed};

    fn fixture() -> Fixture {
        Fixture::load(None, 4, 12.0).unwrap()
    }

    fn seeds() -> Vec<String> {
        (0..40)
            .map(|idx| generate_seed(&idx.to_string(), SWEEP_USER_ID, "v1"))
            .collect()
    }

    #[test]
    fn check_keys_are_unique_and_resolvable() {
        let keys: Vec<&str> = list_checks().map(|(key, _)| key).collect();
        assert_eq!(keys.len(), 9);
        for key in &keys {
            assert_eq!(get_check(key).map(|check| check.key), Some(*key));
        }
        for key in SMOKE_CHECKS {
            assert!(keys.contains(key));
        }
        assert!(get_check("nope").is_none());
    }

    #[test]
    fn every_check_passes_on_default_fixture() {
        let fixture = fixture();
        for seed in seeds() {
            let sample = fixture.ride_for(&seed);
            for check in CHECKS {
                (check.run)(&fixture, &sample)
                    .unwrap_or_else(|err| panic!("{} failed for {seed}: {err:#}", check.key));
            }
        }
    }

    #[test]
    fn off_grid_profile_bounds_pass_window_checks() {
        let base = fixture();
        let fixture = Fixture::new(
            RewardProfile {
                boost: BoostConfig::window(0.033_333_37, 0.194_170_75),
                ..RewardProfile::default()
            },
            base.ticket,
        );
        for seed in seeds() {
            let sample = fixture.ride_for(&seed);
            check_bounds(&fixture, &sample).unwrap_or_else(|err| panic!("{seed}: {err:#}"));
            check_unique_max(&fixture, &sample).unwrap_or_else(|err| panic!("{seed}: {err:#}"));
            check_crash_containment(&fixture, &sample)
                .unwrap_or_else(|err| panic!("{seed}: {err:#}"));
        }
    }

    #[test]
    fn ineligible_ticket_is_rejected_consistently() {
        let fixture = Fixture::new(
            RewardProfile::default(),
            vec![Selection::new("a", 2.0), Selection::new("b", 2.0)],
        );
        assert!(!fixture.assessment.is_eligible());
        let sample = fixture.ride_for(&seeds()[0]);
        check_lock_idempotence(&fixture, &sample).unwrap();
    }

    #[test]
    fn tampered_ride_fails_shape_checks() {
        let fixture = fixture();
        let mut sample = fixture.ride_for(&seeds()[1]);
        if let Some(last) = sample.ride.checkpoints.last_mut() {
            last.boost_value = 0.2;
        }
        assert!(check_boundary_shape(&fixture, &sample).is_err());
        assert!(check_determinism(&fixture, &sample).is_err());

        let mut sample = fixture.ride_for(&seeds()[2]);
        sample.ride.checkpoints[0].boost_value = 0.9;
        assert!(check_bounds(&fixture, &sample).is_err());
    }
}
