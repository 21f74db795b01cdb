//! Quality gate configuration.
//!
//! Mirrors the `[gates]` section of `.bvs/bvs.toml`:
//!
//! ```toml
//! [gates]
//! run_in_parallel = false
//! max_fix_attempts = 3
//! allow_skip = false
//!
//! [gates.typecheck]
//! command = "npx"
//! args = ["tsc", "--noEmit"]
//! incremental = true
//!
//! [gates.lint]
//! auto_fix = false
//!
//! [gates.tests]
//! coverage_threshold = 80.0
//! timeout_secs = 600
//!
//! [gates.build]
//! enabled = false
//! ```

use bvs_common::GateKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cap on captured output per check, in bytes.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Default ceiling on recorded fix attempts per section.
pub const DEFAULT_MAX_FIX_ATTEMPTS: u32 = 3;

/// A fully resolved command line for one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckInvocation {
    pub kind: GateKind,
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
}

impl CheckInvocation {
    /// The literal command string reported in results.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Type-check settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypecheckConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Append `--incremental`
    pub incremental: bool,
}

impl Default for TypecheckConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            command: "npx".to_string(),
            args: vec!["tsc".to_string(), "--noEmit".to_string()],
            timeout_secs: None,
            incremental: false,
        }
    }
}

/// Lint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Append `--fix`
    pub auto_fix: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            command: "npx".to_string(),
            args: vec!["eslint".to_string(), ".".to_string()],
            timeout_secs: None,
            auto_fix: false,
        }
    }
}

/// Test-run settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestsConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Informational only; not enforced by the gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_threshold: Option<f64>,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            command: "npm".to_string(),
            args: vec!["test".to_string()],
            timeout_secs: None,
            coverage_threshold: None,
        }
    }
}

/// Build settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            command: "npm".to_string(),
            args: vec!["run".to_string(), "build".to_string()],
            timeout_secs: None,
        }
    }
}

/// Configuration for a quality gate run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityGateConfig {
    /// Launch all enabled checks concurrently
    pub run_in_parallel: bool,
    /// Attempts before a section counts as exhausted
    pub max_fix_attempts: u32,
    /// Whether `skip_gate` may mark a section as skipped
    pub allow_skip: bool,
    /// Cap on captured bytes per output stream
    pub max_output_bytes: usize,
    pub typecheck: TypecheckConfig,
    pub lint: LintConfig,
    pub tests: TestsConfig,
    pub build: BuildConfig,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            run_in_parallel: false,
            max_fix_attempts: DEFAULT_MAX_FIX_ATTEMPTS,
            allow_skip: false,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            typecheck: TypecheckConfig::default(),
            lint: LintConfig::default(),
            tests: TestsConfig::default(),
            build: BuildConfig::default(),
        }
    }
}

impl QualityGateConfig {
    /// Enable or disable parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.run_in_parallel = parallel;
        self
    }

    /// Set the fix-attempt ceiling.
    pub fn with_max_fix_attempts(mut self, attempts: u32) -> Self {
        self.max_fix_attempts = attempts;
        self
    }

    /// Allow or forbid skipping a section's gate.
    pub fn with_allow_skip(mut self, allow: bool) -> Self {
        self.allow_skip = allow;
        self
    }

    /// Set the captured-output cap.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Replace the command for one check.
    pub fn with_command(mut self, kind: GateKind, command: &str, args: &[&str]) -> Self {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        match kind {
            GateKind::Typecheck => {
                self.typecheck.command = command.to_string();
                self.typecheck.args = args;
            }
            GateKind::Lint => {
                self.lint.command = command.to_string();
                self.lint.args = args;
            }
            GateKind::Tests => {
                self.tests.command = command.to_string();
                self.tests.args = args;
            }
            GateKind::Build => {
                self.build.command = command.to_string();
                self.build.args = args;
            }
        }
        self
    }

    /// Enable or disable one check.
    pub fn with_enabled(mut self, kind: GateKind, enabled: bool) -> Self {
        match kind {
            GateKind::Typecheck => self.typecheck.enabled = enabled,
            GateKind::Lint => self.lint.enabled = enabled,
            GateKind::Tests => self.tests.enabled = enabled,
            GateKind::Build => self.build.enabled = enabled,
        }
        self
    }

    pub fn is_enabled(&self, kind: GateKind) -> bool {
        match kind {
            GateKind::Typecheck => self.typecheck.enabled,
            GateKind::Lint => self.lint.enabled,
            GateKind::Tests => self.tests.enabled,
            GateKind::Build => self.build.enabled,
        }
    }

    /// Enabled checks in sequential order.
    pub fn enabled_kinds(&self) -> Vec<GateKind> {
        GateKind::SEQUENTIAL_ORDER
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }

    /// Resolve the command line for a check, applying kind-specific flags.
    pub fn invocation(&self, kind: GateKind) -> CheckInvocation {
        let (program, mut args, timeout_secs) = match kind {
            GateKind::Typecheck => (
                &self.typecheck.command,
                self.typecheck.args.clone(),
                self.typecheck.timeout_secs,
            ),
            GateKind::Lint => (&self.lint.command, self.lint.args.clone(), self.lint.timeout_secs),
            GateKind::Tests => (&self.tests.command, self.tests.args.clone(), self.tests.timeout_secs),
            GateKind::Build => (&self.build.command, self.build.args.clone(), self.build.timeout_secs),
        };

        match kind {
            GateKind::Typecheck if self.typecheck.incremental => {
                args.push("--incremental".to_string());
            }
            GateKind::Lint if self.lint.auto_fix => args.push("--fix".to_string()),
            _ => {}
        }

        CheckInvocation {
            kind,
            program: program.clone(),
            args,
            timeout: timeout_secs.map(Duration::from_secs),
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_fix_attempts == 0 {
            warnings.push(
                "max_fix_attempts is 0: every section counts as exhausted immediately".to_string(),
            );
        }
        if self.max_output_bytes == 0 {
            warnings.push("max_output_bytes is 0: no check output will be captured".to_string());
        }

        let enabled = self.enabled_kinds();
        if enabled.is_empty() {
            warnings.push("All gates are disabled: every run passes trivially".to_string());
        }
        for kind in enabled {
            if self.invocation(kind).program.trim().is_empty() {
                warnings.push(format!("Gate '{}' is enabled but has no command", kind));
            }
        }

        if let Some(threshold) = self.tests.coverage_threshold
            && !(0.0..=100.0).contains(&threshold)
        {
            warnings.push(format!(
                "Invalid coverage_threshold {}: should be between 0 and 100",
                threshold
            ));
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QualityGateConfig::default();
        assert!(!config.run_in_parallel);
        assert_eq!(config.max_fix_attempts, 3);
        assert!(!config.allow_skip);
        assert_eq!(config.enabled_kinds(), GateKind::SEQUENTIAL_ORDER.to_vec());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_invocation_command_line() {
        let config = QualityGateConfig::default();
        assert_eq!(
            config.invocation(GateKind::Typecheck).command_line(),
            "npx tsc --noEmit"
        );
        assert_eq!(config.invocation(GateKind::Build).command_line(), "npm run build");
    }

    #[test]
    fn test_kind_specific_flags() {
        let mut config = QualityGateConfig::default();
        config.typecheck.incremental = true;
        config.lint.auto_fix = true;

        assert_eq!(
            config.invocation(GateKind::Typecheck).args.last().map(String::as_str),
            Some("--incremental")
        );
        assert_eq!(
            config.invocation(GateKind::Lint).args.last().map(String::as_str),
            Some("--fix")
        );
    }

    #[test]
    fn test_timeout_resolution() {
        let mut config = QualityGateConfig::default();
        config.tests.timeout_secs = Some(90);
        assert_eq!(
            config.invocation(GateKind::Tests).timeout,
            Some(Duration::from_secs(90))
        );
        assert_eq!(config.invocation(GateKind::Lint).timeout, None);
    }

    #[test]
    fn test_enabled_kinds_keep_sequential_order() {
        let config = QualityGateConfig::default()
            .with_enabled(GateKind::Lint, false)
            .with_enabled(GateKind::Typecheck, false);
        assert_eq!(config.enabled_kinds(), vec![GateKind::Build, GateKind::Tests]);
    }

    #[test]
    fn test_validate_warnings() {
        let mut config = QualityGateConfig::default()
            .with_max_fix_attempts(0)
            .with_command(GateKind::Build, "  ", &[]);
        config.tests.coverage_threshold = Some(150.0);

        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("max_fix_attempts")));
        assert!(warnings.iter().any(|w| w.contains("'build'")));
        assert!(warnings.iter().any(|w| w.contains("coverage_threshold")));
    }

    #[test]
    fn test_all_disabled_warns() {
        let config = GateKind::SEQUENTIAL_ORDER
            .into_iter()
            .fold(QualityGateConfig::default(), |c, k| c.with_enabled(k, false));
        assert!(config.validate().iter().any(|w| w.contains("disabled")));
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config: QualityGateConfig = toml::from_str(
            r#"
run_in_parallel = true

[lint]
auto_fix = true

[build]
enabled = false
"#,
        )
        .unwrap();

        assert!(config.run_in_parallel);
        assert!(config.lint.auto_fix);
        assert_eq!(config.lint.command, "npx");
        assert!(!config.build.enabled);
        assert_eq!(config.build.command, "npm");
        assert_eq!(config.max_fix_attempts, DEFAULT_MAX_FIX_ATTEMPTS);
    }
}
