//! Quality gate commands: `bvs gate`, `bvs rereview`.

use anyhow::{Context, Result};
use bvs::config::BvsConfig;
use bvs::gates::{QualityGateOrchestrator, ReReviewLoop};
use bvs_common::{GateKind, QualityGateResult};
use console::style;
use std::path::Path;

/// Run the full gate for a section. Returns whether it passed.
pub async fn cmd_gate(config: &BvsConfig, section_id: &str, json: bool) -> Result<bool> {
    let orchestrator = QualityGateOrchestrator::new(config.effective_gate_config());
    let result = orchestrator.run(&config.project_dir, section_id).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, config.verbose);
        if let Some(attempt) = orchestrator.tracker().attempts(section_id).last() {
            println!(
                "Fix attempt #{} recorded ({}, {} error(s))",
                attempt.attempt,
                attempt.gate_type,
                attempt.errors.len()
            );
        }
    }

    Ok(result.passed)
}

/// Re-verify only the failing checks of a previous result.
///
/// Without `--previous`, a full gate run supplies the starting result.
pub async fn cmd_rereview(
    config: &BvsConfig,
    section_id: &str,
    previous: Option<&Path>,
    max_iterations: u32,
    json: bool,
) -> Result<bool> {
    let orchestrator = QualityGateOrchestrator::new(config.effective_gate_config());

    let previous = match previous {
        Some(path) => load_result(path)?,
        None => orchestrator.run(&config.project_dir, section_id).await,
    };

    let outcome = ReReviewLoop::new(&orchestrator)
        .with_max_iterations(max_iterations)
        .run(&config.project_dir, section_id, previous)
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_result(&outcome.final_result, config.verbose);
        let verdict = if outcome.success {
            style("converged").green()
        } else {
            style("did not converge").red()
        };
        println!(
            "Re-review {} after {} iteration(s)",
            verdict, outcome.iterations
        );
    }

    Ok(outcome.success)
}

fn load_result(path: &Path) -> Result<QualityGateResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read gate result: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse gate result: {}", path.display()))
}

fn print_result(result: &QualityGateResult, verbose: bool) {
    println!();
    for kind in GateKind::SEQUENTIAL_ORDER {
        let check = result.check(kind);
        let status = if check.skipped {
            style("SKIP").dim()
        } else if check.passed {
            style("PASS").green()
        } else {
            style("FAIL").red()
        };
        println!(
            "  {} {:<10} {:>6}ms  {}",
            status,
            kind.as_str(),
            check.duration.as_millis(),
            style(&check.command).dim()
        );

        for issue in check.issues.iter().take(if verbose { usize::MAX } else { 10 }) {
            let location = match (&issue.file, issue.line) {
                (Some(file), Some(line)) => format!("{}:{}: ", file, line),
                (Some(file), None) => format!("{}: ", file),
                _ => String::new(),
            };
            println!("      {}{}", location, issue.message);
        }
        if !verbose && check.issues.len() > 10 {
            println!("      ... and {} more", check.issues.len() - 10);
        }
        if verbose && !check.passed && !check.output.is_empty() {
            println!("{}", style(&check.output).dim());
        }
    }
    println!();

    let summary = if result.passed {
        style("Quality gate passed").green().bold()
    } else {
        style("Quality gate failed").red().bold()
    };
    println!("{} in {}ms", summary, result.total_duration.as_millis());
}
