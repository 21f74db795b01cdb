//! Quality gate orchestration.
//!
//! Runs the enabled checks against a project, parses their output and
//! aggregates a [`QualityGateResult`]. [`QualityGateOrchestrator::run_checks`]
//! is pure. [`QualityGateOrchestrator::run`] wraps it with boundary events and
//! fix-attempt tracking.

use crate::gates::config::QualityGateConfig;
use crate::gates::parsers::ParserSet;
use crate::gates::runner::{CommandRunner, ProcessRunner};
use crate::gates::tracker::FixAttemptTracker;
use bvs_common::{CheckResult, FixAttempt, GateIssue, GateKind, QualityGateResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Boundary events emitted around a gate run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateEvent {
    /// A gate run is about to execute.
    Started {
        section_id: String,
        checks: Vec<GateKind>,
        parallel: bool,
    },
    /// A gate run finished.
    Result {
        section_id: String,
        result: Box<QualityGateResult>,
        /// Ledger entry recorded for a failed run
        fix_attempt: Option<FixAttempt>,
    },
}

/// Runs quality gate checks for sections of work.
pub struct QualityGateOrchestrator {
    config: QualityGateConfig,
    runner: Arc<dyn CommandRunner>,
    parsers: ParserSet,
    tracker: Arc<FixAttemptTracker>,
    events: Option<mpsc::UnboundedSender<GateEvent>>,
}

impl QualityGateOrchestrator {
    /// Create an orchestrator that runs real processes with its own tracker.
    pub fn new(config: QualityGateConfig) -> Self {
        let tracker = Arc::new(FixAttemptTracker::new(
            config.max_fix_attempts,
            config.allow_skip,
        ));
        Self {
            config,
            runner: Arc::new(ProcessRunner::new()),
            parsers: ParserSet::default(),
            tracker,
            events: None,
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_parsers(mut self, parsers: ParserSet) -> Self {
        self.parsers = parsers;
        self
    }

    /// Share a tracker with other orchestrators.
    pub fn with_tracker(mut self, tracker: Arc<FixAttemptTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// Deliver `Started`/`Result` events to a listener.
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<GateEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn tracker(&self) -> &Arc<FixAttemptTracker> {
        &self.tracker
    }

    /// Run a full gate for a section.
    ///
    /// Emits `Started` before and `Result` after execution, and records a fix
    /// attempt when the aggregate fails. Never returns an error.
    pub async fn run(&self, project_root: &Path, section_id: &str) -> QualityGateResult {
        self.emit(GateEvent::Started {
            section_id: section_id.to_string(),
            checks: self.config.enabled_kinds(),
            parallel: self.config.run_in_parallel,
        });

        let result = self.run_all(project_root).await;

        let fix_attempt = if result.passed {
            info!(
                section_id,
                duration_ms = result.total_duration.as_millis() as u64,
                "quality gate passed"
            );
            None
        } else {
            warn!(
                section_id,
                failing = ?result.failing_kinds(),
                items = result.total_failing_count(),
                "quality gate failed"
            );
            self.tracker.record(section_id, &result)
        };

        self.emit(GateEvent::Result {
            section_id: section_id.to_string(),
            result: Box::new(result.clone()),
            fix_attempt,
        });

        result
    }

    /// Run every check kind without events or tracking.
    pub async fn run_all(&self, project_root: &Path) -> QualityGateResult {
        let start = Instant::now();
        let checks = self
            .run_checks(project_root, &GateKind::SEQUENTIAL_ORDER)
            .await;
        QualityGateResult::from_checks(checks, start.elapsed())
    }

    /// Run a subset of checks.
    ///
    /// Results come back in sequential order (typecheck, lint, build, tests)
    /// regardless of execution mode. Disabled kinds yield skipped results.
    pub async fn run_checks(&self, project_root: &Path, kinds: &[GateKind]) -> Vec<CheckResult> {
        let ordered: Vec<GateKind> = GateKind::SEQUENTIAL_ORDER
            .into_iter()
            .filter(|kind| kinds.contains(kind))
            .collect();

        if self.config.run_in_parallel {
            use futures::future::join_all;

            let futures: Vec<_> = ordered
                .iter()
                .map(|kind| self.run_check(*kind, project_root))
                .collect();
            join_all(futures).await
        } else {
            let mut results = Vec::with_capacity(ordered.len());
            for kind in ordered {
                results.push(self.run_check(kind, project_root).await);
            }
            results
        }
    }

    async fn run_check(&self, kind: GateKind, project_root: &Path) -> CheckResult {
        if !self.config.is_enabled(kind) {
            debug!(gate = %kind, "check disabled, skipping");
            return CheckResult::skipped(kind);
        }

        let invocation = self.config.invocation(kind);
        let out = self
            .runner
            .run(&invocation, project_root, self.config.max_output_bytes)
            .await;
        let parsed = self
            .parsers
            .parse(kind, &out.output, out.exit_code, project_root);

        let mut issues = parsed.issues;
        let mut output = out.output;
        if let Some(error) = &out.error {
            issues.push(GateIssue::message(error.as_str()));
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(error);
        }
        let passed = parsed.passed && out.error.is_none();

        debug!(
            gate = %kind,
            exit_code = out.exit_code,
            passed,
            issues = issues.len(),
            duration_ms = out.duration.as_millis() as u64,
            "check finished"
        );

        CheckResult {
            kind,
            passed,
            skipped: false,
            issues,
            summary: parsed.summary,
            duration: out.duration,
            command: invocation.command_line(),
            output,
        }
    }

    fn emit(&self, event: GateEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(event);
        }
    }
}
