//! Structured error extraction from raw check output.
//!
//! Each gate kind has an [`OutputParser`]. Parsers never fail: output that
//! matches nothing yields zero issues, and the pass/fail verdict always comes
//! from the exit code.
//!
//! Recognised dialects:
//! - type-check: `file(line,col): error TS1234: message`
//! - lint: `file:line:col: severity rule - message` and ESLint JSON reports
//! - tests: `Tests: N passed, M failed, K total` plus `FAIL <file>` blocks
//! - build: `[plugin] Error:`, `ERROR in <target>`, `Error: <msg>` and
//!   type-checker style compile errors

use crate::util::json_array_candidates;
use bvs_common::{GateIssue, GateKind, Severity, TestSummary};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

static TSC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(.+?)\(([^,()]+),([^,()]+)\):\s*(error|warning)\s+(TS\d+):\s*(.*?)\s*$")
        .unwrap()
});

static LINT_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(.+?):(\d+):(\d+):\s*(error|warning)\s+(\S+)\s+-\s+(.*?)\s*$").unwrap()
});

static TEST_SUMMARY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*Tests:\s+(.*?\d+\s+total)").unwrap());

static PASSED_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+passed").unwrap());

static FAILED_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+failed").unwrap());

static TOTAL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+total").unwrap());

static FAIL_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*FAIL\s+(\S+)").unwrap());

static PASS_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*PASS\s+").unwrap());

static FAILURE_GLYPH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([●✕×✗])\s+(.+?)\s*$").unwrap());

static TEST_DURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\(\d+(?:\.\d+)?\s*m?s\)$").unwrap());

static PLUGIN_ERROR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\[([^\]]+)\]\s*Error:\s*(.*?)\s*$").unwrap());

static ERROR_IN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*ERROR in\s+(.*?)\s*$").unwrap());

static BARE_ERROR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Error:\s*(.*?)\s*$").unwrap());

/// Structured view of one check's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedOutput {
    /// `exit_code == 0`
    pub passed: bool,
    pub issues: Vec<GateIssue>,
    pub summary: Option<TestSummary>,
}

impl ParsedOutput {
    fn new(exit_code: i32, issues: Vec<GateIssue>) -> Self {
        Self {
            passed: exit_code == 0,
            issues,
            summary: None,
        }
    }
}

/// Turns raw output of one check into structured issues.
pub trait OutputParser: Send + Sync {
    fn parse(&self, output: &str, exit_code: i32, project_root: &Path) -> ParsedOutput;
}

/// Parser for `tsc`-style diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypecheckParser;

impl OutputParser for TypecheckParser {
    fn parse(&self, output: &str, exit_code: i32, project_root: &Path) -> ParsedOutput {
        ParsedOutput::new(exit_code, typecheck_issues(output, project_root))
    }
}

fn typecheck_issues(output: &str, project_root: &Path) -> Vec<GateIssue> {
    TSC_REGEX
        .captures_iter(output)
        .filter_map(|cap| {
            // Non-numeric positions discard the match
            let line = cap[2].trim().parse::<u32>().ok()?;
            let column = cap[3].trim().parse::<u32>().ok()?;
            let file = relativize(cap[1].trim(), project_root);
            Some(
                GateIssue::at(&file, line, column, Severity::from_word(&cap[4]), &cap[6])
                    .with_rule(&cap[5]),
            )
        })
        .collect()
}

/// Parser for lint output, text and ESLint JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct LintParser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintFileReport {
    file_path: String,
    #[serde(default)]
    messages: Vec<EslintMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EslintMessage {
    #[serde(default)]
    line: Option<u32>,
    #[serde(default)]
    column: Option<u32>,
    #[serde(default)]
    rule_id: Option<String>,
    message: String,
    #[serde(default)]
    severity: u8,
    #[serde(default)]
    fix: Option<serde_json::Value>,
}

impl OutputParser for LintParser {
    fn parse(&self, output: &str, exit_code: i32, project_root: &Path) -> ParsedOutput {
        let mut issues: Vec<GateIssue> = LINT_LINE_REGEX
            .captures_iter(output)
            .filter_map(|cap| {
                let line = cap[2].parse::<u32>().ok()?;
                let column = cap[3].parse::<u32>().ok()?;
                let file = relativize(cap[1].trim(), project_root);
                Some(
                    GateIssue::at(&file, line, column, Severity::from_word(&cap[4]), &cap[6])
                        .with_rule(&cap[5]),
                )
            })
            .collect();

        issues.extend(eslint_json_issues(output, project_root));
        ParsedOutput::new(exit_code, issues)
    }
}

fn eslint_json_issues(output: &str, project_root: &Path) -> Vec<GateIssue> {
    let Some(reports) = json_array_candidates(output)
        .into_iter()
        .find_map(|candidate| serde_json::from_str::<Vec<EslintFileReport>>(candidate).ok())
    else {
        return Vec::new();
    };

    reports
        .into_iter()
        .flat_map(|report| {
            let file = relativize(&report.file_path, project_root);
            report.messages.into_iter().map(move |msg| GateIssue {
                file: Some(file.clone()),
                line: msg.line,
                column: msg.column,
                severity: if msg.severity == 2 {
                    Severity::Error
                } else {
                    Severity::Warning
                },
                rule: msg.rule_id,
                message: msg.message,
                detail: None,
                fixable: msg.fix.is_some(),
            })
        })
        .collect()
}

/// Parser for Jest-style test runner output.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestParser;

impl OutputParser for TestParser {
    fn parse(&self, output: &str, exit_code: i32, _project_root: &Path) -> ParsedOutput {
        let mut parsed = ParsedOutput::new(exit_code, failing_tests(output));
        parsed.summary = test_summary(output);
        parsed
    }
}

fn test_summary(output: &str) -> Option<TestSummary> {
    let line = TEST_SUMMARY_REGEX
        .captures_iter(output)
        .last()?
        .get(1)?
        .as_str();

    let count = |re: &Regex| {
        re.captures(line)
            .and_then(|cap| cap[1].parse::<u32>().ok())
            .unwrap_or(0)
    };

    Some(TestSummary {
        passed: count(&PASSED_REGEX),
        failed: count(&FAILED_REGEX),
        total: count(&TOTAL_REGEX),
    })
}

/// Last segment of a `Suite › test` name, used to match the short listing
/// line against the detailed failure header.
fn short_test_name(name: &str) -> &str {
    name.rsplit(" › ").next().unwrap_or(name).trim()
}

fn failing_tests(output: &str) -> Vec<GateIssue> {
    let lines: Vec<&str> = output.lines().collect();
    let mut current_file: Option<String> = None;
    let mut failures: Vec<GateIssue> = Vec::new();
    let mut awaiting_header: Vec<bool> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(cap) = FAIL_MARKER_REGEX.captures(line) {
            current_file = Some(cap[1].to_string());
            continue;
        }
        if PASS_MARKER_REGEX.is_match(line) {
            current_file = None;
            continue;
        }
        let Some(cap) = FAILURE_GLYPH_REGEX.captures(line) else {
            continue;
        };

        let detailed = &cap[1] == "●";
        // ● also prefixes console output, so it only counts inside a FAIL block
        if detailed && current_file.is_none() {
            continue;
        }
        let name = TEST_DURATION_REGEX.replace(&cap[2], "").trim().to_string();
        if name.is_empty() {
            continue;
        }
        let detail = if detailed {
            failure_detail(&lines[i + 1..])
        } else {
            None
        };

        if detailed {
            // Each listing line is claimed by at most one detailed header
            let listed = failures
                .iter()
                .zip(&awaiting_header)
                .position(|(f, awaiting)| {
                    *awaiting
                        && f.file == current_file
                        && short_test_name(&f.message) == short_test_name(&name)
                });
            if let Some(idx) = listed {
                failures[idx].message = name;
                failures[idx].detail = detail;
                awaiting_header[idx] = false;
                continue;
            }
        }
        failures.push(GateIssue {
            file: current_file.clone(),
            message: name,
            detail,
            ..Default::default()
        });
        awaiting_header.push(!detailed);
    }

    failures
}

fn failure_detail(following: &[&str]) -> Option<String> {
    let next = following.iter().map(|l| l.trim()).find(|l| !l.is_empty())?;
    if FAILURE_GLYPH_REGEX.is_match(next)
        || FAIL_MARKER_REGEX.is_match(next)
        || PASS_MARKER_REGEX.is_match(next)
    {
        return None;
    }
    Some(next.to_string())
}

/// Parser for bundler and compiler build output.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildParser;

impl OutputParser for BuildParser {
    fn parse(&self, output: &str, exit_code: i32, project_root: &Path) -> ParsedOutput {
        let mut errors: Vec<String> = Vec::new();

        errors.extend(
            PLUGIN_ERROR_REGEX
                .captures_iter(output)
                .map(|cap| format!("[{}] {}", &cap[1], &cap[2])),
        );
        errors.extend(
            ERROR_IN_REGEX
                .captures_iter(output)
                .map(|cap| format!("ERROR in {}", &cap[1])),
        );
        errors.extend(
            BARE_ERROR_REGEX
                .captures_iter(output)
                .map(|cap| cap[1].to_string()),
        );
        errors.extend(
            typecheck_issues(output, project_root)
                .into_iter()
                .filter(|issue| issue.is_error())
                .map(|issue| {
                    format!(
                        "{}({},{}): {}: {}",
                        issue.file.unwrap_or_default(),
                        issue.line.unwrap_or_default(),
                        issue.column.unwrap_or_default(),
                        issue.rule.unwrap_or_default(),
                        issue.message
                    )
                }),
        );

        ParsedOutput::new(exit_code, errors.into_iter().map(GateIssue::message).collect())
    }
}

/// Rewrite absolute paths under the project root as relative ones.
fn relativize(file: &str, project_root: &Path) -> String {
    let path = Path::new(file);
    if path.is_absolute()
        && let Ok(relative) = path.strip_prefix(project_root)
    {
        return relative.to_string_lossy().into_owned();
    }
    file.to_string()
}

/// The parser used for each gate kind.
#[derive(Clone)]
pub struct ParserSet {
    parsers: BTreeMap<GateKind, Arc<dyn OutputParser>>,
}

impl Default for ParserSet {
    fn default() -> Self {
        let mut parsers: BTreeMap<GateKind, Arc<dyn OutputParser>> = BTreeMap::new();
        parsers.insert(GateKind::Typecheck, Arc::new(TypecheckParser));
        parsers.insert(GateKind::Lint, Arc::new(LintParser));
        parsers.insert(GateKind::Tests, Arc::new(TestParser));
        parsers.insert(GateKind::Build, Arc::new(BuildParser));
        Self { parsers }
    }
}

impl std::fmt::Debug for ParserSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserSet")
            .field("kinds", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ParserSet {
    /// Replace the parser for one gate kind.
    pub fn with_parser(mut self, kind: GateKind, parser: Arc<dyn OutputParser>) -> Self {
        self.parsers.insert(kind, parser);
        self
    }

    /// Parse output for a kind. Kinds without a parser yield no issues.
    pub fn parse(&self, kind: GateKind, output: &str, exit_code: i32, project_root: &Path) -> ParsedOutput {
        match self.parsers.get(&kind) {
            Some(parser) => parser.parse(output, exit_code, project_root),
            None => ParsedOutput::new(exit_code, Vec::new()),
        }
    }
}
