use boostride_engine::{
    BoostConfig, Checkpoint, PathRequest, RideConfig, build_effective_ride_path,
    derive_ride_duration_seconds, derive_ride_params, generate_ride, generate_seed,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::hash::Hasher;
use twox_hash::XxHash64;

const SWEEP: usize = 300;
const TIE_TOLERANCE: f64 = 1e-6;

fn snapshot(checkpoints: &[Checkpoint]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    for checkpoint in checkpoints {
        hasher.write(&checkpoint.index.to_le_bytes());
        hasher.write(&checkpoint.time_fraction.to_bits().to_le_bytes());
        hasher.write(&checkpoint.boost_value.to_bits().to_le_bytes());
    }
    hasher.finish()
}

struct Case {
    seed: String,
    config: RideConfig,
}

fn random_case(rng: &mut SmallRng, idx: usize) -> Case {
    let seed = generate_seed(&format!("reward-{idx}"), &format!("user-{}", rng.r#gen::<u32>()), "v1");
    let duration = derive_ride_duration_seconds(&seed, 20.0, 60.0);
    let params = derive_ride_params(&seed, duration, 3.0);
    let min = rng.gen_range(0.0..0.2);
    let max = min + rng.gen_range(0.05..0.6);
    Case {
        config: RideConfig::from_params(
            &params,
            min,
            max,
            rng.gen_range(0.0..=1.0),
            duration,
            2.0,
        ),
        seed,
    }
}

fn pre_crash(checkpoints: &[Checkpoint], crash_fraction: f64) -> Vec<Checkpoint> {
    let boundary = checkpoints
        .iter()
        .rposition(|c| c.time_fraction < crash_fraction)
        .unwrap_or(0)
        .min(checkpoints.len() - 2);
    checkpoints[..=boundary].to_vec()
}

#[test]
fn rides_replay_bit_for_bit() {
    let mut rng = SmallRng::seed_from_u64(0xB005);
    for idx in 0..SWEEP {
        let case = random_case(&mut rng, idx);
        let first = generate_ride(&case.seed, &case.config);
        let second = generate_ride(&case.seed, &case.config);
        assert_eq!(snapshot(&first.checkpoints), snapshot(&second.checkpoints));
    }
}

#[test]
fn different_seeds_give_different_rides() {
    let config = RideConfig {
        checkpoint_count: 14,
        volatility: 0.5,
        min_boost_pct: 0.05,
        max_boost_pct: 0.5,
        ticket_strength: 0.5,
        duration_seconds: 30.0,
        crash_fraction: 0.8,
        min_peak_delay_seconds: 2.0,
    };
    let mut seen = std::collections::HashSet::new();
    for idx in 0..100 {
        let seed = generate_seed(&format!("reward-{idx}"), "user", "v1");
        seen.insert(snapshot(&generate_ride(&seed, &config).checkpoints));
    }
    assert_eq!(seen.len(), 100);
}

#[test]
fn rides_start_at_zero_and_end_crashed() {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    for idx in 0..SWEEP {
        let case = random_case(&mut rng, idx);
        let ride = generate_ride(&case.seed, &case.config);
        let first = ride.checkpoints.first().expect("first checkpoint");
        let last = ride.checkpoints.last().expect("last checkpoint");
        assert!(first.time_fraction.abs() < f64::EPSILON);
        assert!((last.time_fraction - 1.0).abs() < f64::EPSILON);
        assert!(last.boost_value.abs() < f64::EPSILON);
        for pair in ride.checkpoints.windows(2) {
            assert!(pair[1].time_fraction > pair[0].time_fraction);
        }
    }
}

#[test]
fn pre_crash_values_stay_in_window_with_one_peak() {
    let mut rng = SmallRng::seed_from_u64(0xC0FFEE);
    for idx in 0..SWEEP {
        let case = random_case(&mut rng, idx);
        let cfg = &case.config;
        let ride = generate_ride(&case.seed, cfg);
        let early = pre_crash(&ride.checkpoints, cfg.crash_fraction);
        for checkpoint in &early {
            assert!(
                checkpoint.boost_value >= cfg.min_boost_pct - 1e-9
                    && checkpoint.boost_value <= cfg.max_boost_pct + 1e-9,
                "{}: {checkpoint:?} outside [{}, {}]",
                case.seed,
                cfg.min_boost_pct,
                cfg.max_boost_pct
            );
        }
        let top = early.iter().map(|c| c.boost_value).fold(f64::MIN, f64::max);
        let ties = early
            .iter()
            .filter(|c| (c.boost_value - top).abs() <= TIE_TOLERANCE)
            .count();
        assert_eq!(ties, 1, "{}: {:?}", case.seed, ride.checkpoints);
    }
}

#[test]
fn peak_never_lands_before_the_delay() {
    for idx in 0..500 {
        let seed = generate_seed(&format!("delay-{idx}"), "user", "v1");
        let params = derive_ride_params(&seed, 10.0, 3.0);
        let config = RideConfig {
            crash_fraction: 0.8,
            ..RideConfig::from_params(&params, 0.05, 0.5, 0.6, 10.0, 2.0)
        };
        let ride = generate_ride(&seed, &config);
        let peak = ride.peak(config.crash_fraction).expect("peak");
        assert!(
            peak.time_fraction >= 0.2,
            "{seed}: earliest max at {} in {:?}",
            peak.time_fraction,
            ride.checkpoints
        );
    }
}

#[test]
fn effective_path_is_zero_after_crash() {
    let mut rng = SmallRng::seed_from_u64(0xD15C);
    let boost = BoostConfig::default();
    for idx in 0..100 {
        let case = random_case(&mut rng, idx);
        let ride = generate_ride(&case.seed, &case.config);
        let path = build_effective_ride_path(&PathRequest {
            checkpoints: &ride.checkpoints,
            sample_count: 60,
            crash_fraction: case.config.crash_fraction,
            ticket_strength: case.config.ticket_strength,
            config: &boost,
            qualifying_selections: 4,
            combined_odds: 12.0,
        });
        for point in path {
            if point.time_fraction >= case.config.crash_fraction {
                assert!(point.boost_value.abs() < f64::EPSILON, "{point:?}");
            } else {
                assert!((0.05..=0.5).contains(&point.boost_value), "{point:?}");
            }
        }
    }
}
