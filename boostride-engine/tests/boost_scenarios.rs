use boostride_engine::{
    BoostConfig, BoostInputs, Selection, StrengthConfig, calculate_bonus_amount,
    calculate_combined_odds, calculate_final_boost_details, compute_boost_model_details,
    compute_ticket_strength, interpolate_ride_value, Checkpoint,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const SAMPLE_SIZE: usize = 5000;

fn random_config(rng: &mut SmallRng) -> BoostConfig {
    let min = rng.gen_range(0.0..0.3);
    BoostConfig {
        min_boost_pct: min,
        max_boost_pct: min + rng.gen_range(0.0..0.7),
        max_boost_min_selections: rng.gen_bool(0.5).then(|| rng.gen_range(1..12)),
        max_boost_min_combined_odds: rng.gen_bool(0.5).then(|| rng.gen_range(1.5..500.0)),
    }
}

#[test]
fn reference_boost_scenario() {
    let result = calculate_final_boost_details(
        &BoostInputs {
            ride_value: 0.4,
            ticket_strength: 1.0,
            qualifying_selections: 3,
            combined_odds: 10.0,
            has_ride_ended: false,
        },
        &BoostConfig::window(0.05, 0.5),
    );
    assert!((result.final_boost_pct - 0.4375).abs() < 1e-9);
}

#[test]
fn reference_combined_odds_scenario() {
    let ticket = [
        Selection::new("a", 2.0),
        Selection::new("b", 3.0),
        Selection::new("c", 1.5),
    ];
    assert!((calculate_combined_odds(&ticket) - 9.0).abs() < 1e-12);
}

#[test]
fn final_boost_respects_clamp_laws() {
    let mut rng = SmallRng::seed_from_u64(0xB0057);
    for _ in 0..SAMPLE_SIZE {
        let config = random_config(&mut rng);
        let inputs = BoostInputs {
            ride_value: rng.gen_range(-0.5..1.5),
            ticket_strength: rng.gen_range(0.0..=1.0),
            qualifying_selections: rng.gen_range(0..15),
            combined_odds: rng.gen_range(0.0..1000.0),
            has_ride_ended: rng.gen_bool(0.2),
        };
        let result = calculate_final_boost_details(&inputs, &config);
        if inputs.has_ride_ended {
            assert!(result.final_boost_pct.abs() < f64::EPSILON);
            assert!(!result.is_clamped_to_max && !result.is_clamped_to_min);
            continue;
        }
        let model = result.boost_model;
        assert!(model.effective_min_boost >= config.min_boost_pct - 1e-6);
        assert!(model.effective_min_boost <= model.effective_max_boost + 1e-12);
        assert!(model.effective_max_boost <= config.max_boost_pct + 1e-6);
        assert!((0.0..=1.0).contains(&model.eligibility_factor));
        assert!(
            result.final_boost_pct >= model.effective_min_boost - 1e-12
                && result.final_boost_pct <= model.effective_max_boost + 1e-12,
            "{inputs:?} -> {result:?}"
        );
    }
}

#[test]
fn eligibility_never_decreases_with_better_tickets() {
    let config = BoostConfig {
        max_boost_min_selections: Some(8),
        max_boost_min_combined_odds: Some(200.0),
        ..BoostConfig::default()
    };
    let mut previous = 0.0;
    for selections in 1..12 {
        let factor = compute_boost_model_details(selections, 60.0, &config).eligibility_factor;
        assert!(factor >= previous);
        previous = factor;
    }
    let mut previous = 0.0;
    for odds in [2.0, 10.0, 50.0, 150.0, 300.0] {
        let factor = compute_boost_model_details(5, odds, &config).eligibility_factor;
        assert!(factor >= previous);
        previous = factor;
    }
}

#[test]
fn strength_is_monotone_in_both_dimensions() {
    let cfg = StrengthConfig::default();
    for odds in [2.0, 8.0, 30.0, 120.0] {
        for count in 3..12 {
            assert!(
                compute_ticket_strength(count, odds, &cfg)
                    < compute_ticket_strength(count + 1, odds, &cfg),
                "count {count} odds {odds}"
            );
        }
    }
    for count in 3..12 {
        let mut previous = 0.0;
        for odds in [2.0, 4.0, 16.0, 64.0, 200.0] {
            let strength = compute_ticket_strength(count, odds, &cfg);
            assert!(strength > previous, "count {count} odds {odds}");
            previous = strength;
        }
    }
}

#[test]
fn pure_helpers_are_repeatable() {
    let checkpoints: Vec<Checkpoint> = [(0.0, 0.12), (0.4, 0.33), (0.7, 0.21), (1.0, 0.0)]
        .iter()
        .enumerate()
        .map(|(index, &(time_fraction, boost_value))| Checkpoint {
            index,
            time_fraction,
            boost_value,
        })
        .collect();
    let mut rng = SmallRng::seed_from_u64(7);
    for _ in 0..200 {
        let t = rng.gen_range(0.0..1.0);
        assert_eq!(
            interpolate_ride_value(&checkpoints, t).to_bits(),
            interpolate_ride_value(&checkpoints, t).to_bits()
        );
        let winnings = rng.gen_range(0.0..1000.0);
        let pct = rng.gen_range(0.0..0.5);
        assert_eq!(
            calculate_bonus_amount(winnings, pct).to_bits(),
            calculate_bonus_amount(winnings, pct).to_bits()
        );
    }
}
