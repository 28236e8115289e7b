use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

use super::{CheckResult, RideInspection};
use crate::common::round_for_display;

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [CheckResult],
    inspections: &'a [RideInspection],
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[CheckResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Check Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "========================".cyan())?;

    let total_checks = results.len();
    let passed_checks = results.iter().filter(|r| r.passed).count();
    let failed_checks = total_checks - passed_checks;

    writeln!(out, "Total checks: {total_checks}")?;
    writeln!(out, "Passed: {}", passed_checks.to_string().green())?;
    writeln!(out, "Failed: {}", failed_checks.to_string().red())?;
    #[allow(clippy::cast_precision_loss)]
    let success_rate = if total_checks == 0 {
        0.0
    } else {
        (passed_checks as f64 / total_checks as f64) * 100.0
    };
    writeln!(out, "Success rate: {success_rate:.1}%")?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} [{}]",
            status,
            result.check_name.bold(),
            result.seed_label
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.check_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.check_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_inspection_console(out: &mut dyn Write, inspection: &RideInspection) -> Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "{} {}",
        "🔎 Ride".bright_magenta().bold(),
        inspection.seed_label.bold()
    )?;
    writeln!(out, "   Seed: {}", inspection.seed)?;
    writeln!(
        out,
        "   Duration: {:.3}s  Checkpoints: {}  Volatility: {:.4}  Crash: {:.4}",
        inspection.duration_seconds,
        inspection.params.checkpoint_count,
        inspection.params.volatility,
        inspection.params.crash_fraction
    )?;
    writeln!(
        out,
        "   Ticket: {} qualifying @ {:.2}  Strength: {:.6}",
        inspection.qualifying_selections, inspection.combined_odds, inspection.ticket_strength
    )?;
    writeln!(out, "   Digest: {}", inspection.digest)?;

    let peak_index = inspection.peak.map(|peak| peak.index);
    let touched = inspection.touched();
    writeln!(out, "   {:>3}  {:>8}  {:>8}", "#", "time", "value")?;
    for checkpoint in &inspection.checkpoints {
        let mut marks = String::new();
        if Some(checkpoint.index) == peak_index {
            marks.push_str(" ▲ peak");
        }
        if checkpoint.time_fraction >= inspection.params.crash_fraction {
            marks.push_str(" ✖ crashed");
        }
        if touched.contains(&checkpoint.index) {
            marks.push_str(" *");
        }
        writeln!(
            out,
            "   {:>3}  {:>8.6}  {:>8.6}{}",
            checkpoint.index,
            checkpoint.time_fraction,
            checkpoint.boost_value,
            marks.dimmed()
        )?;
    }

    writeln!(out, "   Passes:")?;
    for entry in &inspection.passes.entries {
        if entry.changed.is_empty() {
            continue;
        }
        writeln!(
            out,
            "     {:<14} {:?}",
            entry.pass.label(),
            entry.changed.as_slice()
        )?;
    }

    let live: Vec<f64> = inspection
        .path
        .iter()
        .filter(|point| point.boost_value > 0.0)
        .map(|point| point.boost_value)
        .collect();
    let low = live.iter().copied().fold(f64::INFINITY, f64::min);
    let high = live.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    writeln!(
        out,
        "   Path: {} samples, live range {} .. {}",
        inspection.path.len(),
        round_for_display(low),
        round_for_display(high)
    )?;
    Ok(())
}

pub fn generate_json_report(
    out: &mut dyn Write,
    results: &[CheckResult],
    inspections: &[RideInspection],
) -> Result<()> {
    let json_output = serde_json::to_string_pretty(&JsonReport {
        results,
        inspections,
    })?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(
    out: &mut dyn Write,
    results: &[CheckResult],
    inspections: &[RideInspection],
) -> Result<()> {
    writeln!(out, "# Boostride Check Results\n")?;

    let total_checks = results.len();
    let passed_checks = results.iter().filter(|r| r.passed).count();
    let failed_checks = total_checks - passed_checks;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total checks**: {total_checks}")?;
    writeln!(out, "- **Passed**: {passed_checks}")?;
    writeln!(out, "- **Failed**: {failed_checks}\n")?;

    if !results.is_empty() {
        writeln!(out, "## Detailed Results\n")?;
    }
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };

        writeln!(out, "### {} {} ({})\n", status, result.check_name, result.seed_label)?;
        writeln!(
            out,
            "- **Iterations**: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(out, "- **Average time**: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "- **Failures**:")?;
            for failure in &result.failures {
                writeln!(out, "  - {failure}")?;
            }
        }
        writeln!(out)?;
    }

    for inspection in inspections {
        writeln!(out, "## Ride {}\n", inspection.seed_label)?;
        writeln!(
            out,
            "Crash at `{:.4}`, duration `{:.3}s`, digest `{}`\n",
            inspection.params.crash_fraction, inspection.duration_seconds, inspection.digest
        )?;
        writeln!(out, "| # | time | value |")?;
        writeln!(out, "|---|------|-------|")?;
        for checkpoint in &inspection.checkpoints {
            writeln!(
                out,
                "| {} | {:.6} | {:.6} |",
                checkpoint.index, checkpoint.time_fraction, checkpoint.boost_value
            )?;
        }
        writeln!(out)?;
    }
    Ok(())
}

pub fn generate_csv_report(out: &mut dyn Write, results: &[CheckResult]) -> Result<()> {
    writeln!(
        out,
        "check,seed,passed,iterations,successful,avg_micros,first_failure"
    )?;
    for result in results {
        let first_failure = result
            .failures
            .first()
            .map(|failure| format!("\"{}\"", failure.replace('"', "\"\"")))
            .unwrap_or_default();
        writeln!(
            out,
            "{},\"{}\",{},{},{},{},{}",
            result.check_name,
            result.seed_label.replace('"', "\"\""),
            result.passed,
            result.iterations_run,
            result.successful_iterations,
            result.average_duration.as_micros(),
            first_failure
        )?;
    }
    Ok(())
}
