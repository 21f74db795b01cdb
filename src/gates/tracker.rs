//! Per-section fix-attempt ledger.
//!
//! One [`FixAttempt`] is appended for every failed gate run of a section.
//! The ledger and the skipped set live for the lifetime of the tracker and
//! are only cleared by [`FixAttemptTracker::reset_fix_attempts`].

use bvs_common::{FixAttempt, FixAttemptError, FixGateType, GateKind, QualityGateResult};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Ledger {
    attempts: HashMap<String, Vec<FixAttempt>>,
    skipped: HashSet<String>,
}

/// Records failed gate runs and enforces the attempt ceiling.
///
/// Writers to different sections are independent. Two concurrent writers to
/// the same section must be serialized by the caller.
#[derive(Debug)]
pub struct FixAttemptTracker {
    max_attempts: u32,
    allow_skip: bool,
    ledger: Mutex<Ledger>,
}

impl FixAttemptTracker {
    pub fn new(max_attempts: u32, allow_skip: bool) -> Self {
        Self {
            max_attempts,
            allow_skip,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // The ledger holds plain data, so a poisoned lock is still usable
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an attempt for a failed result.
    ///
    /// Returns `None` and records nothing when the result passed.
    pub fn record(&self, section_id: &str, result: &QualityGateResult) -> Option<FixAttempt> {
        let gate_type = primary_gate_type(result)?;
        let errors = collect_errors(result);

        let mut ledger = self.ledger();
        let entries = ledger.attempts.entry(section_id.to_string()).or_default();
        let attempt = FixAttempt {
            section_id: section_id.to_string(),
            attempt: entries.len() as u32 + 1,
            gate_type,
            errors,
            timestamp: Utc::now(),
        };
        entries.push(attempt.clone());

        if attempt.attempt >= self.max_attempts {
            warn!(
                section = section_id,
                attempt = attempt.attempt,
                max = self.max_attempts,
                "fix attempts exhausted"
            );
        } else {
            info!(
                section = section_id,
                attempt = attempt.attempt,
                gate = %gate_type,
                errors = attempt.errors.len(),
                "recorded fix attempt"
            );
        }

        Some(attempt)
    }

    pub fn get_fix_attempt_count(&self, section_id: &str) -> u32 {
        self.ledger()
            .attempts
            .get(section_id)
            .map_or(0, |entries| entries.len() as u32)
    }

    pub fn is_max_attempts_exceeded(&self, section_id: &str) -> bool {
        self.get_fix_attempt_count(section_id) >= self.max_attempts
    }

    /// Recorded attempts for a section, oldest first.
    pub fn attempts(&self, section_id: &str) -> Vec<FixAttempt> {
        self.ledger()
            .attempts
            .get(section_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Mark a section's gate as skipped. Only succeeds when skipping is allowed.
    pub fn skip_gate(&self, section_id: &str) -> bool {
        if !self.allow_skip {
            warn!(section = section_id, "skipping gates is not allowed");
            return false;
        }
        self.ledger().skipped.insert(section_id.to_string());
        info!(section = section_id, "gate skipped");
        true
    }

    pub fn is_skipped(&self, section_id: &str) -> bool {
        self.ledger().skipped.contains(section_id)
    }

    /// Clear both the attempts and the skipped flag for a section.
    pub fn reset_fix_attempts(&self, section_id: &str) {
        let mut ledger = self.ledger();
        ledger.attempts.remove(section_id);
        ledger.skipped.remove(section_id);
    }
}

/// Single label for a failed run: typecheck > lint > build > tests, with
/// build reported as typecheck.
fn primary_gate_type(result: &QualityGateResult) -> Option<FixGateType> {
    if result.passed {
        return None;
    }
    let failed = |kind: GateKind| !result.check(kind).passed;
    let label = if failed(GateKind::Typecheck) {
        FixGateType::Typecheck
    } else if failed(GateKind::Lint) {
        FixGateType::Lint
    } else if failed(GateKind::Build) {
        FixGateType::Typecheck
    } else {
        // Only tests (or an aggregate flagged failed by e2e) remain
        FixGateType::Tests
    };
    Some(label)
}

fn collect_errors(result: &QualityGateResult) -> Vec<FixAttemptError> {
    let mut errors = Vec::new();

    for kind in [GateKind::Typecheck, GateKind::Lint] {
        let check = result.check(kind);
        if check.passed {
            continue;
        }
        errors.extend(check.errors().map(|issue| {
            FixAttemptError::new(issue.file.clone().unwrap_or_default(), issue.message.clone())
        }));
    }

    if !result.build.passed {
        errors.extend(
            result
                .build
                .issues
                .iter()
                .map(|issue| FixAttemptError::new("build", issue.message.clone())),
        );
    }

    if !result.tests.passed {
        errors.extend(result.tests.issues.iter().map(|failure| {
            let message = match &failure.detail {
                Some(detail) => format!("{}: {}", failure.message, detail),
                None => failure.message.clone(),
            };
            FixAttemptError::new(failure.file.as_deref().unwrap_or("unknown"), message)
        }));
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvs_common::{CheckResult, GateIssue, Severity};
    use std::time::Duration;

    fn check(kind: GateKind, passed: bool, issues: Vec<GateIssue>) -> CheckResult {
        CheckResult {
            kind,
            passed,
            skipped: false,
            issues,
            summary: None,
            duration: Duration::from_millis(10),
            command: kind.to_string(),
            output: String::new(),
        }
    }

    fn result(checks: Vec<CheckResult>) -> QualityGateResult {
        QualityGateResult::from_checks(checks, Duration::from_millis(40))
    }

    fn scenario_four() -> QualityGateResult {
        result(vec![
            check(
                GateKind::Typecheck,
                false,
                vec![
                    GateIssue::at("src/a.ts", 1, 1, Severity::Error, "Type mismatch"),
                    GateIssue::at("src/b.ts", 2, 3, Severity::Error, "Cannot find name"),
                ],
            ),
            check(GateKind::Lint, true, vec![]),
            check(GateKind::Build, true, vec![]),
            check(
                GateKind::Tests,
                false,
                vec![GateIssue {
                    file: Some("src/a.test.ts".to_string()),
                    message: "adds numbers".to_string(),
                    ..Default::default()
                }],
            ),
        ])
    }

    #[test]
    fn test_record_combines_failing_gates() {
        let tracker = FixAttemptTracker::new(3, false);
        let gate = scenario_four();
        assert!(!gate.passed);

        let attempt = tracker.record("section-1", &gate).unwrap();
        assert_eq!(attempt.attempt, 1);
        assert_eq!(attempt.gate_type, FixGateType::Typecheck);
        assert_eq!(
            attempt.errors,
            vec![
                FixAttemptError::new("src/a.ts", "Type mismatch"),
                FixAttemptError::new("src/b.ts", "Cannot find name"),
                FixAttemptError::new("src/a.test.ts", "adds numbers"),
            ]
        );
        assert_eq!(tracker.get_fix_attempt_count("section-1"), 1);
    }

    #[test]
    fn test_passing_result_is_not_recorded() {
        let tracker = FixAttemptTracker::new(3, false);
        assert!(tracker.record("s", &result(vec![])).is_none());
        assert_eq!(tracker.get_fix_attempt_count("s"), 0);
    }

    #[test]
    fn test_build_failure_is_labelled_typecheck() {
        let gate = result(vec![check(
            GateKind::Build,
            false,
            vec![GateIssue::message("Cannot find module 'react'")],
        )]);
        let attempt = FixAttemptTracker::new(3, false).record("s", &gate).unwrap();

        assert_eq!(attempt.gate_type, FixGateType::Typecheck);
        assert_eq!(
            attempt.errors,
            vec![FixAttemptError::new("build", "Cannot find module 'react'")]
        );
    }

    #[test]
    fn test_lint_outranks_build() {
        let gate = result(vec![
            check(GateKind::Lint, false, vec![]),
            check(GateKind::Build, false, vec![]),
        ]);
        let attempt = FixAttemptTracker::new(3, false).record("s", &gate).unwrap();
        assert_eq!(attempt.gate_type, FixGateType::Lint);
    }

    #[test]
    fn test_tests_only_failure() {
        let gate = result(vec![check(
            GateKind::Tests,
            false,
            vec![GateIssue::message("loads config").with_detail("expected true")],
        )]);
        let attempt = FixAttemptTracker::new(3, false).record("s", &gate).unwrap();

        assert_eq!(attempt.gate_type, FixGateType::Tests);
        assert_eq!(
            attempt.errors,
            vec![FixAttemptError::new("unknown", "loads config: expected true")]
        );
    }

    #[test]
    fn test_lint_warnings_are_not_collected() {
        let gate = result(vec![check(
            GateKind::Lint,
            false,
            vec![
                GateIssue::at("a.ts", 1, 1, Severity::Error, "bad"),
                GateIssue::at("a.ts", 2, 1, Severity::Warning, "meh"),
            ],
        )]);
        let attempt = FixAttemptTracker::new(3, false).record("s", &gate).unwrap();
        assert_eq!(attempt.errors, vec![FixAttemptError::new("a.ts", "bad")]);
    }

    #[test]
    fn test_max_attempts() {
        let tracker = FixAttemptTracker::new(2, false);
        let gate = scenario_four();

        tracker.record("s", &gate);
        assert!(!tracker.is_max_attempts_exceeded("s"));
        let second = tracker.record("s", &gate).unwrap();
        assert_eq!(second.attempt, 2);
        assert!(tracker.is_max_attempts_exceeded("s"));
        assert!(!tracker.is_max_attempts_exceeded("other"));
    }

    #[test]
    fn test_sections_are_independent() {
        let tracker = FixAttemptTracker::new(3, false);
        let gate = scenario_four();
        tracker.record("a", &gate);
        tracker.record("a", &gate);
        tracker.record("b", &gate);

        assert_eq!(tracker.get_fix_attempt_count("a"), 2);
        assert_eq!(tracker.get_fix_attempt_count("b"), 1);
        assert_eq!(tracker.attempts("b")[0].attempt, 1);
    }

    #[test]
    fn test_skip_requires_permission() {
        let strict = FixAttemptTracker::new(3, false);
        assert!(!strict.skip_gate("s"));
        assert!(!strict.is_skipped("s"));

        let lenient = FixAttemptTracker::new(3, true);
        assert!(lenient.skip_gate("s"));
        assert!(lenient.is_skipped("s"));
    }

    #[test]
    fn test_reset_clears_attempts_and_skip() {
        let tracker = FixAttemptTracker::new(3, true);
        tracker.record("s", &scenario_four());
        tracker.skip_gate("s");

        tracker.reset_fix_attempts("s");
        assert_eq!(tracker.get_fix_attempt_count("s"), 0);
        assert!(tracker.attempts("s").is_empty());
        assert!(!tracker.is_skipped("s"));

        let again = tracker.record("s", &scenario_four()).unwrap();
        assert_eq!(again.attempt, 1);
    }
}
