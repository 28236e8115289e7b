mod common;
mod logic;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use common::split_csv;
use logic::checks::CHECKS;
use logic::{
    CheckResult, CheckRunner, Fixture, RideInspection, SMOKE_CHECKS, SeedInfo, get_check,
    inspect_ride, list_checks, resolve_seed_inputs,
};

const ACCEPTANCE_ITERATIONS: usize = 200;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TestMode {
    /// Print the full breakdown of each seed's ride
    Inspect,
    /// Run invariant checks across seeds and iterations
    Sweep,
    /// Inspect and sweep
    Both,
}

#[derive(Debug, Parser)]
#[command(name = "boostride-tester", version)]
#[command(about = "Seed sweeps, invariant checks and ride inspection for the boostride engine")]
struct Args {
    /// Test mode: sweep (checks), inspect (single rides), or both
    #[arg(long, value_enum, default_value_t = TestMode::Sweep)]
    mode: TestMode,

    /// Checks to run (comma-separated, `smoke` or `all`)
    #[arg(long, default_value = "smoke")]
    checks: String,

    /// List all available checks and exit
    #[arg(long)]
    list_checks: bool,

    /// Seeds to run (comma-separated hex seeds, reward:user:version triples, or reward ids)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of iterations per check and seed
    #[arg(long, default_value_t = 25)]
    iterations: usize,

    /// Run extended acceptance sweeps (forces ≥200 iterations)
    #[arg(long)]
    acceptance: bool,

    /// Reward profile JSON; defaults apply when omitted
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Number of selections on the synthetic ticket
    #[arg(long, default_value_t = 4)]
    selections: u32,

    /// Combined odds of the synthetic ticket
    #[arg(long, default_value_t = 12.0)]
    combined_odds: f64,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console", "csv"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if maybe_list_checks(&args)? {
        return Ok(());
    }

    announce_banner();

    let iterations = compute_iterations(&args);
    let start_time = Instant::now();
    let fixture = Fixture::load(args.profile.as_deref(), args.selections, args.combined_odds)?;
    let checks = expand_checks(&args.checks);
    let seed_tokens = split_csv(&args.seeds);
    let seed_infos = resolve_seed_inputs(&seed_tokens, &fixture.profile.version_id)?;
    log::info!(
        "profile={} seeds={} checks={} iterations={iterations} strength={:.6}",
        fixture.profile.version_id,
        seed_infos.len(),
        checks.len(),
        fixture.assessment.strength
    );

    let results = run_sweep(&args, &fixture, &checks, &seed_infos, iterations);
    let inspections = run_inspections(&args, &fixture, &seed_infos);

    write_reports(&args, &results, &inspections, start_time)?;

    if results.iter().any(|r| !r.passed) {
        std::process::exit(1);
    }

    Ok(())
}

fn maybe_list_checks(args: &Args) -> Result<bool> {
    if !args.list_checks {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    writeln!(output_target.writer(), "Available checks:")?;
    for (key, description) in list_checks() {
        writeln!(output_target.writer(), "  {key:20} - {description}")?;
    }
    writeln!(
        output_target.writer(),
        "  {:20} - {}",
        "smoke",
        SMOKE_CHECKS.join(", ")
    )?;
    output_target.flush_inner()?;
    Ok(true)
}

fn announce_banner() {
    println!("{}", "🎢 Boostride Ride Tester".bright_cyan().bold());
    println!("{}", "========================".cyan());
}

fn compute_iterations(args: &Args) -> usize {
    if args.acceptance {
        if args.iterations < ACCEPTANCE_ITERATIONS {
            println!(
                "🔁 Acceptance mode enabled: increasing iterations from {} to {ACCEPTANCE_ITERATIONS}",
                args.iterations
            );
        } else {
            println!(
                "🔁 Acceptance mode enabled: using {} iterations",
                args.iterations
            );
        }
        args.iterations.max(ACCEPTANCE_ITERATIONS)
    } else {
        args.iterations
    }
}

fn expand_checks(checks_arg: &str) -> Vec<String> {
    let mut expanded: Vec<String> = Vec::new();
    for token in split_csv(checks_arg) {
        let keys: Vec<String> = match token.as_str() {
            "all" => CHECKS.iter().map(|check| check.key.to_string()).collect(),
            "smoke" => SMOKE_CHECKS.iter().map(ToString::to_string).collect(),
            _ => vec![token],
        };
        for key in keys {
            if !expanded.contains(&key) {
                expanded.push(key);
            }
        }
    }
    expanded
}

fn run_sweep(
    args: &Args,
    fixture: &Fixture,
    checks: &[String],
    seeds: &[SeedInfo],
    iterations: usize,
) -> Vec<CheckResult> {
    let mut results: Vec<CheckResult> = Vec::new();
    if !matches!(args.mode, TestMode::Sweep | TestMode::Both) {
        return results;
    }

    println!("{}", "🧠 Running Checks".bright_yellow().bold());
    println!("{}", "-".repeat(30).yellow());

    let runner = CheckRunner::new(fixture, args.verbose);

    for check_name in checks {
        if let Some(check) = get_check(check_name) {
            results.extend(runner.run_check(check, seeds, iterations));
        } else {
            eprintln!("⚠️  Unknown check: {}", check_name.yellow());
        }
    }

    results
}

fn run_inspections(args: &Args, fixture: &Fixture, seeds: &[SeedInfo]) -> Vec<RideInspection> {
    if !matches!(args.mode, TestMode::Inspect | TestMode::Both) {
        return Vec::new();
    }
    seeds.iter().map(|seed| inspect_ride(fixture, seed)).collect()
}

fn write_reports(
    args: &Args,
    results: &[CheckResult],
    inspections: &[RideInspection],
    start_time: Instant,
) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => {
            logic::reports::generate_json_report(&mut output_target, results, inspections)?;
        }
        "markdown" => {
            if results.is_empty() && inspections.is_empty() {
                writeln!(
                    &mut output_target,
                    "# Boostride Check Results\n\n_No checks executed._"
                )?;
            } else {
                logic::reports::generate_markdown_report(
                    &mut output_target,
                    results,
                    inspections,
                )?;
            }
        }
        "csv" => {
            logic::reports::generate_csv_report(&mut output_target, results)?;
        }
        _ => {
            for inspection in inspections {
                logic::reports::generate_inspection_console(&mut output_target, inspection)?;
            }
            if !results.is_empty() {
                logic::reports::generate_console_report(
                    &mut output_target,
                    results,
                    start_time.elapsed(),
                )?;
            } else if inspections.is_empty() {
                writeln!(&mut output_target, "No checks executed.")?;
            }
        }
    }

    let duration = start_time.elapsed();
    writeln!(&mut output_target)?;
    writeln!(&mut output_target, "🏁 Total time: {duration:?}")?;
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args {
            mode: TestMode::Sweep,
            checks: "smoke".to_string(),
            list_checks: false,
            seeds: "1337".to_string(),
            iterations: 1,
            acceptance: false,
            profile: None,
            selections: 4,
            combined_odds: 12.0,
            report: "json".to_string(),
            verbose: false,
            output: None,
        }
    }

    fn temp_path(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "boostride-main-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    fn fixture() -> Fixture {
        Fixture::load(None, 4, 12.0).unwrap()
    }

    #[test]
    fn computes_iterations_for_acceptance() {
        let mut args = base_args();
        args.acceptance = true;
        args.iterations = 10;
        assert_eq!(compute_iterations(&args), 200);
        args.iterations = 500;
        assert_eq!(compute_iterations(&args), 500);
    }

    #[test]
    fn compute_iterations_returns_default_when_disabled() {
        assert_eq!(compute_iterations(&base_args()), 1);
    }

    #[test]
    fn expands_all_and_smoke_keywords() {
        let all = expand_checks("all");
        assert_eq!(all.len(), CHECKS.len());
        assert!(all.contains(&"lock-idempotence".to_string()));

        let smoke = expand_checks("smoke");
        assert_eq!(smoke, vec!["determinism", "boundary-shape", "bounds"]);
    }

    #[test]
    fn expand_checks_preserves_order_and_dedups() {
        let expanded = expand_checks("unique-max,smoke,bounds,custom");
        assert_eq!(
            expanded,
            vec!["unique-max", "determinism", "boundary-shape", "bounds", "custom"]
        );
    }

    #[test]
    fn run_sweep_skips_when_not_enabled() {
        let args = Args {
            mode: TestMode::Inspect,
            ..base_args()
        };
        let seeds = vec![SeedInfo::from_reward_id("42", "v1")];
        let results = run_sweep(&args, &fixture(), &["bounds".to_string()], &seeds, 1);
        assert!(results.is_empty());
    }

    #[test]
    fn run_sweep_ignores_unknown_checks() {
        let args = base_args();
        let seeds = vec![SeedInfo::from_reward_id("42", "v1")];
        let results = run_sweep(
            &args,
            &fixture(),
            &["bounds".to_string(), "nope".to_string()],
            &seeds,
            2,
        );
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn run_inspections_only_in_inspect_modes() {
        let seeds = vec![SeedInfo::from_reward_id("42", "v1")];
        assert!(run_inspections(&base_args(), &fixture(), &seeds).is_empty());
        let args = Args {
            mode: TestMode::Both,
            ..base_args()
        };
        assert_eq!(run_inspections(&args, &fixture(), &seeds).len(), 1);
    }

    #[test]
    fn write_reports_emits_json_output() {
        let temp = temp_path("report.json");
        let args = Args {
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("\"results\": []"));
        assert!(content.contains("Total time"));
    }

    #[test]
    fn write_reports_console_without_results() {
        let temp = temp_path("report.txt");
        let args = Args {
            report: "console".to_string(),
            output: Some(temp.clone()),
            ..base_args()
        };
        write_reports(&args, &[], &[], Instant::now()).unwrap();
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("No checks executed."));
    }

    #[test]
    fn maybe_list_checks_writes_output() {
        let temp = temp_path("checks.txt");
        let args = Args {
            list_checks: true,
            output: Some(temp.clone()),
            ..base_args()
        };
        assert!(maybe_list_checks(&args).unwrap());
        let content = std::fs::read_to_string(temp).unwrap();
        assert!(content.contains("Available checks"));
        assert!(content.contains("peak-delay"));
    }

    #[test]
    fn maybe_list_checks_returns_false_when_disabled() {
        assert!(!maybe_list_checks(&base_args()).unwrap());
    }

    #[test]
    fn output_target_writes_to_file() {
        let temp = temp_path("target.txt");
        let mut target = OutputTarget::new(Some(temp.clone())).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush().unwrap();
        assert_eq!(std::fs::read_to_string(temp).unwrap(), "hello\n");
    }
}
