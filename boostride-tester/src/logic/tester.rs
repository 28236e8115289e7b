use boostride_engine::generate_seed;
use colored::Colorize;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::checks::Check;
use super::fixture::Fixture;
use super::seeds::{SWEEP_USER_ID, SeedInfo};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub check_name: String,
    pub seed_label: String,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct CheckRunner<'a> {
    fixture: &'a Fixture,
    verbose: bool,
}

impl<'a> CheckRunner<'a> {
    pub const fn new(fixture: &'a Fixture, verbose: bool) -> Self {
        Self { fixture, verbose }
    }

    pub fn run_check(&self, check: &Check, seeds: &[SeedInfo], iterations: usize) -> Vec<CheckResult> {
        let mut results = Vec::new();

        for seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Checking: {} (seed: {})",
                    check.key.bright_white(),
                    seed.label
                );
            }

            results.push(self.run_single_check(check, seed, iterations));
        }

        results
    }

    fn run_single_check(&self, check: &Check, seed: &SeedInfo, iterations: usize) -> CheckResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();

        for (i, iteration_seed) in sweep_seeds(&seed.seed, iterations).into_iter().enumerate() {
            let start_time = Instant::now();
            let sample = self.fixture.ride_for(&iteration_seed);

            match (check.run)(self.fixture, &sample) {
                Ok(()) => {
                    successes += 1;
                    let duration = start_time.elapsed();
                    performance_data.push(duration);
                    if self.verbose {
                        println!(
                            "  ✅ Iteration {}/{} passed ({duration:?}) checkpoints:{} crash:{:.4}",
                            i + 1,
                            iterations,
                            sample.ride.checkpoints.len(),
                            sample.params.crash_fraction
                        );
                    }
                }
                Err(err) => {
                    let message = format!(
                        "Iteration {} (seed {}, checkpoints {}, crash {:.4}, volatility {:.4}): {err:#}",
                        i + 1,
                        iteration_seed,
                        sample.ride.checkpoints.len(),
                        sample.params.crash_fraction,
                        sample.params.volatility
                    );
                    if self.verbose {
                        println!(
                            "  ❌ Iteration {}/{} failed: {}",
                            i + 1,
                            iterations,
                            message.clone().red()
                        );
                    }
                    failures.push(message);
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        CheckResult {
            check_name: check.key.to_string(),
            seed_label: seed.label.clone(),
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_duration,
            performance_data,
        }
    }
}

/// The base seed followed by `iterations - 1` derived seeds.
///
/// Derived seeds come from a `ChaCha8` stream keyed by the base seed, so a
/// sweep over the same seed and count always visits the same rides.
pub fn sweep_seeds(base: &str, iterations: usize) -> Vec<String> {
    let key = base
        .get(..16)
        .and_then(|head| u64::from_str_radix(head, 16).ok())
        .unwrap_or_default();
    let mut rng = ChaCha8Rng::seed_from_u64(key);
    let mut seeds = Vec::with_capacity(iterations);
    if iterations > 0 {
        seeds.push(base.to_string());
    }
    while seeds.len() < iterations {
        let reward_id = format!("sweep-{:016x}", rng.r#gen::<u64>());
        seeds.push(generate_seed(&reward_id, SWEEP_USER_ID, "sweep"));
    }
    seeds
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_micros().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u128::deserialize(deserializer)?;
        Ok(Duration::from_micros(u64::try_from(micros).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let micros: Vec<u128> = durations.iter().map(Duration::as_micros).collect();
        micros.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = Vec::<u128>::deserialize(deserializer)?;
        Ok(micros
            .into_iter()
            .map(|m| Duration::from_micros(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::checks::get_check;

    #[test]
    fn sweep_seeds_are_stable_and_distinct() {
        let base = generate_seed("1337", SWEEP_USER_ID, "v1");
        let a = sweep_seeds(&base, 5);
        let b = sweep_seeds(&base, 5);
        assert_eq!(a, b);
        assert_eq!(a[0], base);
        let mut unique = a.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 5);
        assert!(sweep_seeds(&base, 0).is_empty());
    }

    #[test]
    fn runner_reports_per_seed() {
        let fixture = Fixture::load(None, 4, 12.0).unwrap();
        let runner = CheckRunner::new(&fixture, false);
        let seeds = vec![
            SeedInfo::from_reward_id("1", "v1"),
            SeedInfo::from_reward_id("2", "v1"),
        ];
        let check = get_check("determinism").unwrap();
        let results = runner.run_check(check, &seeds, 3);
        assert_eq!(results.len(), 2);
        for result in &results {
            assert!(result.passed, "{:?}", result.failures);
            assert_eq!(result.iterations_run, 3);
            assert_eq!(result.successful_iterations, 3);
            assert_eq!(result.performance_data.len(), 3);
        }
    }

    #[test]
    fn check_result_serializes_durations_as_micros() {
        let result = CheckResult {
            check_name: "bounds".to_string(),
            seed_label: "reward 1".to_string(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_micros(42),
            performance_data: vec![Duration::from_micros(42)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 42);
        let back: CheckResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.average_duration, Duration::from_micros(42));
    }
}
