//! Quality gate result types.

use crate::serde_helpers::duration_ms;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// One of the verification checks a gate run can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    Typecheck,
    Lint,
    Tests,
    Build,
}

impl GateKind {
    /// Order used by sequential runs and by the re-review loop.
    pub const SEQUENTIAL_ORDER: [GateKind; 4] = [
        GateKind::Typecheck,
        GateKind::Lint,
        GateKind::Build,
        GateKind::Tests,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Typecheck => "typecheck",
            GateKind::Lint => "lint",
            GateKind::Tests => "tests",
            GateKind::Build => "build",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "typecheck" | "type-check" | "tsc" => Ok(GateKind::Typecheck),
            "lint" => Ok(GateKind::Lint),
            "tests" | "test" => Ok(GateKind::Tests),
            "build" => Ok(GateKind::Build),
            _ => Err(format!(
                "Invalid gate '{}'. Valid values: typecheck, lint, tests, build",
                s
            )),
        }
    }
}

/// Severity of a structured issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl Severity {
    /// Parse a tool-reported severity word. Anything that is not a warning
    /// counts as an error.
    pub fn from_word(word: &str) -> Self {
        if word.eq_ignore_ascii_case("warning") || word.eq_ignore_ascii_case("warn") {
            Severity::Warning
        } else {
            Severity::Error
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A structured problem extracted from check output.
///
/// Compiler and lint diagnostics fill in the location fields. Build errors
/// only carry a message. Failing tests use `message` for the test name and
/// `detail` for the first line of the failure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GateIssue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default)]
    pub severity: Severity,
    /// Compiler error code or lint rule id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Set only when the tool reported an automatic fix
    #[serde(default)]
    pub fixable: bool,
}

impl GateIssue {
    /// An error with only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// A diagnostic at a source location.
    pub fn at(file: &str, line: u32, column: u32, severity: Severity, message: &str) -> Self {
        Self {
            file: Some(file.to_string()),
            line: Some(line),
            column: Some(column),
            severity,
            message: message.to_string(),
            ..Default::default()
        }
    }

    pub fn with_rule(mut self, rule: &str) -> Self {
        self.rule = Some(rule.to_string());
        self
    }

    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Test counts from a runner's summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub total: u32,
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub kind: GateKind,
    /// Derived from the exit code, never from the parsed issues
    pub passed: bool,
    /// True when the check was disabled and not executed
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub issues: Vec<GateIssue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<TestSummary>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// The literal command line that was invoked
    pub command: String,
    /// Captured stdout followed by stderr
    #[serde(default)]
    pub output: String,
}

impl CheckResult {
    /// A trivially passing result for a disabled check.
    pub fn skipped(kind: GateKind) -> Self {
        Self {
            kind,
            passed: true,
            skipped: true,
            issues: Vec::new(),
            summary: None,
            duration: Duration::ZERO,
            command: String::new(),
            output: String::new(),
        }
    }

    /// Issues with error severity.
    pub fn errors(&self) -> impl Iterator<Item = &GateIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }

    /// Number of failing items this check contributes to progress tracking.
    ///
    /// A failed check always counts at least one item, so an unparseable
    /// failure is never mistaken for a clean run.
    pub fn failing_count(&self) -> usize {
        if self.passed {
            return 0;
        }
        let parsed = match self.kind {
            GateKind::Tests => {
                let reported = self.summary.map_or(0, |s| s.failed as usize);
                reported.max(self.issues.len())
            }
            GateKind::Build => self.issues.len(),
            GateKind::Typecheck | GateKind::Lint => self.error_count(),
        };
        parsed.max(1)
    }
}

/// Result of one end-to-end scenario. Produced by external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct E2eResult {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of a quality gate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateResult {
    /// Logical AND of every enabled check
    pub passed: bool,
    pub type_check: CheckResult,
    pub lint: CheckResult,
    pub tests: CheckResult,
    pub build: CheckResult,
    #[serde(default)]
    pub e2e: Vec<E2eResult>,
    #[serde(with = "duration_ms")]
    pub total_duration: Duration,
}

impl QualityGateResult {
    /// Build an aggregate from individual check results.
    ///
    /// Checks that are not supplied count as skipped.
    pub fn from_checks(checks: impl IntoIterator<Item = CheckResult>, total_duration: Duration) -> Self {
        let mut result = Self {
            passed: true,
            type_check: CheckResult::skipped(GateKind::Typecheck),
            lint: CheckResult::skipped(GateKind::Lint),
            tests: CheckResult::skipped(GateKind::Tests),
            build: CheckResult::skipped(GateKind::Build),
            e2e: Vec::new(),
            total_duration,
        };
        for check in checks {
            let kind = check.kind;
            *result.check_mut(kind) = check;
        }
        result.recompute_passed();
        result
    }

    pub fn check(&self, kind: GateKind) -> &CheckResult {
        match kind {
            GateKind::Typecheck => &self.type_check,
            GateKind::Lint => &self.lint,
            GateKind::Tests => &self.tests,
            GateKind::Build => &self.build,
        }
    }

    pub fn check_mut(&mut self, kind: GateKind) -> &mut CheckResult {
        match kind {
            GateKind::Typecheck => &mut self.type_check,
            GateKind::Lint => &mut self.lint,
            GateKind::Tests => &mut self.tests,
            GateKind::Build => &mut self.build,
        }
    }

    /// Re-derive `passed` from the individual checks.
    pub fn recompute_passed(&mut self) {
        self.passed = GateKind::SEQUENTIAL_ORDER
            .iter()
            .all(|kind| self.check(*kind).passed);
    }

    /// Checks that did not pass, in sequential order.
    pub fn failing_kinds(&self) -> Vec<GateKind> {
        GateKind::SEQUENTIAL_ORDER
            .into_iter()
            .filter(|kind| !self.check(*kind).passed)
            .collect()
    }

    /// Failing items summed across all four checks.
    pub fn total_failing_count(&self) -> usize {
        GateKind::SEQUENTIAL_ORDER
            .iter()
            .map(|kind| self.check(*kind).failing_count())
            .sum()
    }
}
