//! Selective re-verification after a fix.
//!
//! Re-runs only the checks that failed in the carried-forward result and
//! stops as soon as everything passes, the failing-item total stops
//! shrinking, or the iteration budget is spent. Fixes between iterations are
//! applied elsewhere; this loop only re-verifies and never touches the
//! fix-attempt ledger.

use crate::gates::orchestrator::QualityGateOrchestrator;
use bvs_common::QualityGateResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default cap on re-review iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// How a re-review ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReReviewOutcome {
    pub success: bool,
    /// Re-runs performed; 0 when the input already passed
    pub iterations: u32,
    pub final_result: QualityGateResult,
}

/// Drives failing checks towards convergence.
pub struct ReReviewLoop<'a> {
    orchestrator: &'a QualityGateOrchestrator,
    max_iterations: u32,
}

impl<'a> ReReviewLoop<'a> {
    pub fn new(orchestrator: &'a QualityGateOrchestrator) -> Self {
        Self {
            orchestrator,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub async fn run(
        &self,
        project_root: &Path,
        section_id: &str,
        previous: QualityGateResult,
    ) -> ReReviewOutcome {
        let mut current = previous;
        let mut baseline = current.total_failing_count();

        for iteration in 1..=self.max_iterations {
            let failing = current.failing_kinds();
            if failing.is_empty() {
                debug!(section_id, "nothing failing, re-review done");
                return ReReviewOutcome {
                    success: true,
                    iterations: iteration - 1,
                    final_result: current,
                };
            }

            debug!(section_id, iteration, checks = ?failing, "re-running failing checks");
            let start = Instant::now();
            let rerun = self.orchestrator.run_checks(project_root, &failing).await;
            for check in rerun {
                let kind = check.kind;
                *current.check_mut(kind) = check;
            }
            current.recompute_passed();
            current.total_duration = start.elapsed();

            let remaining = current.total_failing_count();
            if remaining == 0 {
                info!(section_id, iteration, "re-review converged");
                return ReReviewOutcome {
                    success: true,
                    iterations: iteration,
                    final_result: current,
                };
            }
            if remaining >= baseline {
                warn!(
                    section_id,
                    iteration,
                    before = baseline,
                    after = remaining,
                    "re-review made no progress"
                );
                return ReReviewOutcome {
                    success: false,
                    iterations: iteration,
                    final_result: current,
                };
            }

            debug!(section_id, iteration, before = baseline, after = remaining, "progress");
            baseline = remaining;
        }

        warn!(
            section_id,
            max_iterations = self.max_iterations,
            "re-review budget exhausted"
        );
        ReReviewOutcome {
            success: current.passed,
            iterations: self.max_iterations,
            final_result: current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::config::QualityGateConfig;
    use crate::gates::test_support::ScriptedRunner;
    use bvs_common::{CheckResult, GateIssue, GateKind, Severity};
    use std::sync::Arc;
    use std::time::Duration;

    fn tsc_errors(count: usize) -> String {
        (0..count)
            .map(|i| format!("src/f{i}.ts({},1): error TS2322: mismatch {i}", i + 1))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn failing_typecheck(errors: usize) -> QualityGateResult {
        let issues = (0..errors)
            .map(|i| GateIssue::at("src/a.ts", i as u32 + 1, 1, Severity::Error, "mismatch"))
            .collect();
        let check = CheckResult {
            kind: GateKind::Typecheck,
            passed: false,
            skipped: false,
            issues,
            summary: None,
            duration: Duration::from_millis(5),
            command: "npx tsc --noEmit".to_string(),
            output: String::new(),
        };
        QualityGateResult::from_checks(
            vec![
                check,
                CheckResult::skipped(GateKind::Lint),
                CheckResult::skipped(GateKind::Build),
                CheckResult::skipped(GateKind::Tests),
            ],
            Duration::from_millis(5),
        )
    }

    fn gate(runner: Arc<ScriptedRunner>) -> QualityGateOrchestrator {
        QualityGateOrchestrator::new(QualityGateConfig::default()).with_runner(runner)
    }

    #[tokio::test]
    async fn test_stops_on_no_progress() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond(GateKind::Typecheck, 2, &tsc_errors(1))
                .respond(GateKind::Typecheck, 2, &tsc_errors(1)),
        );
        let orchestrator = gate(runner.clone());

        let outcome = ReReviewLoop::new(&orchestrator)
            .with_max_iterations(5)
            .run(Path::new("."), "s", failing_typecheck(3))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.final_result.total_failing_count(), 1);
        assert_eq!(runner.calls(), vec![GateKind::Typecheck, GateKind::Typecheck]);
    }

    #[tokio::test]
    async fn test_converges() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond(GateKind::Typecheck, 2, &tsc_errors(1))
                .respond(GateKind::Typecheck, 0, ""),
        );
        let orchestrator = gate(runner);

        let outcome = ReReviewLoop::new(&orchestrator)
            .run(Path::new("."), "s", failing_typecheck(3))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.iterations, 2);
        assert!(outcome.final_result.passed);
    }

    #[tokio::test]
    async fn test_only_failing_checks_rerun() {
        let runner = Arc::new(ScriptedRunner::new());
        let orchestrator = gate(runner.clone());
        let mut previous = failing_typecheck(2);
        previous.lint = CheckResult {
            command: "npx eslint .".to_string(),
            ..CheckResult::skipped(GateKind::Lint)
        };
        previous.lint.skipped = false;

        let outcome = ReReviewLoop::new(&orchestrator)
            .run(Path::new("."), "s", previous)
            .await;

        assert!(outcome.success);
        assert_eq!(runner.calls(), vec![GateKind::Typecheck]);
        // Passing checks carried over untouched
        assert_eq!(outcome.final_result.lint.command, "npx eslint .");
    }

    #[tokio::test]
    async fn test_already_passing_input() {
        let runner = Arc::new(ScriptedRunner::new());
        let orchestrator = gate(runner.clone());
        let passing = QualityGateResult::from_checks(Vec::new(), Duration::ZERO);

        let outcome = ReReviewLoop::new(&orchestrator)
            .run(Path::new("."), "s", passing)
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.iterations, 0);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond(GateKind::Typecheck, 2, &tsc_errors(3))
                .respond(GateKind::Typecheck, 2, &tsc_errors(2)),
        );
        let orchestrator = gate(runner.clone());

        let outcome = ReReviewLoop::new(&orchestrator)
            .with_max_iterations(2)
            .run(Path::new("."), "s", failing_typecheck(4))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.iterations, 2);
        assert_eq!(outcome.final_result.total_failing_count(), 2);
    }

    #[tokio::test]
    async fn test_never_records_fix_attempts() {
        let runner = Arc::new(ScriptedRunner::new().respond(GateKind::Typecheck, 2, &tsc_errors(3)));
        let orchestrator = gate(runner);

        ReReviewLoop::new(&orchestrator)
            .run(Path::new("."), "s", failing_typecheck(3))
            .await;
        assert_eq!(orchestrator.tracker().get_fix_attempt_count("s"), 0);
    }
}
