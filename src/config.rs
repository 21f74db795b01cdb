//! Project configuration for bvs.
//!
//! Settings are read from `.bvs/bvs.toml` and layered
//! (file → environment → CLI):
//!
//! ```toml
//! [gates]
//! run_in_parallel = true
//! max_fix_attempts = 5
//! allow_skip = false
//!
//! [gates.tests]
//! command = "npx"
//! args = ["vitest", "run"]
//! timeout_secs = 600
//!
//! [scheduler]
//! max_tasks = 500
//! ```
//!
//! Environment overrides: `BVS_RUN_IN_PARALLEL`, `BVS_MAX_FIX_ATTEMPTS`,
//! `BVS_ALLOW_SKIP`.

use crate::dag::GraphLimits;
use crate::gates::QualityGateConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory holding bvs state inside a project.
pub const BVS_DIR: &str = ".bvs";

/// Config file name inside [`BVS_DIR`].
pub const CONFIG_FILE: &str = "bvs.toml";

pub const ENV_RUN_IN_PARALLEL: &str = "BVS_RUN_IN_PARALLEL";
pub const ENV_MAX_FIX_ATTEMPTS: &str = "BVS_MAX_FIX_ATTEMPTS";
pub const ENV_ALLOW_SKIP: &str = "BVS_ALLOW_SKIP";

/// The complete bvs.toml configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BvsToml {
    /// Quality gate settings
    #[serde(default)]
    pub gates: QualityGateConfig,
    /// Task graph size limits
    #[serde(default)]
    pub scheduler: GraphLimits,
}

impl BvsToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse bvs.toml")
    }

    /// Load configuration from `<bvs_dir>/bvs.toml`.
    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(bvs_dir: &Path) -> Result<Self> {
        let config_path = bvs_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize bvs.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.gates.validate();

        let limits = &self.scheduler;
        if limits.max_tasks == 0 {
            warnings.push("scheduler.max_tasks is 0: every task set is rejected".to_string());
        }
        if limits.max_dependencies_per_task > limits.max_total_dependencies {
            warnings.push(format!(
                "scheduler.max_dependencies_per_task ({}) exceeds max_total_dependencies ({})",
                limits.max_dependencies_per_task, limits.max_total_dependencies
            ));
        }

        warnings
    }
}

/// Apply environment overrides to gate settings.
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides(
    gates: &mut QualityGateConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(value) = lookup(ENV_RUN_IN_PARALLEL) {
        match parse_bool(&value) {
            Some(parallel) => gates.run_in_parallel = parallel,
            None => warn!(var = ENV_RUN_IN_PARALLEL, value = %value, "ignoring invalid boolean"),
        }
    }
    if let Some(value) = lookup(ENV_MAX_FIX_ATTEMPTS) {
        match value.trim().parse::<u32>() {
            Ok(attempts) => gates.max_fix_attempts = attempts,
            Err(_) => warn!(var = ENV_MAX_FIX_ATTEMPTS, value = %value, "ignoring invalid number"),
        }
    }
    if let Some(value) = lookup(ENV_ALLOW_SKIP) {
        match parse_bool(&value) {
            Some(allow) => gates.allow_skip = allow,
            None => warn!(var = ENV_ALLOW_SKIP, value = %value, "ignoring invalid boolean"),
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolved configuration for a project.
///
/// It merges settings from:
/// 1. bvs.toml file
/// 2. Environment variables
/// 3. CLI arguments
#[derive(Debug, Clone)]
pub struct BvsConfig {
    /// Path to the project directory
    pub project_dir: PathBuf,
    /// Path to the .bvs directory
    pub bvs_dir: PathBuf,
    /// Parsed bvs.toml configuration
    pub toml: BvsToml,
    /// CLI override: verbose mode
    pub verbose: bool,
    /// CLI override: run checks in parallel
    pub cli_parallel: Option<bool>,
    /// CLI override for max_fix_attempts
    pub cli_max_fix_attempts: Option<u32>,
}

impl BvsConfig {
    /// Create a new BvsConfig from a project directory.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .with_context(|| format!("Failed to resolve project directory: {}", project_dir.display()))?;
        let bvs_dir = project_dir.join(BVS_DIR);
        let toml = BvsToml::load_or_default(&bvs_dir)?;

        Ok(Self {
            project_dir,
            bvs_dir,
            toml,
            verbose: false,
            cli_parallel: None,
            cli_max_fix_attempts: None,
        })
    }

    /// Create BvsConfig with CLI overrides.
    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        parallel: Option<bool>,
        max_fix_attempts: Option<u32>,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        config.cli_parallel = parallel;
        config.cli_max_fix_attempts = max_fix_attempts;
        Ok(config)
    }

    /// Path to bvs.toml.
    pub fn config_file(&self) -> PathBuf {
        self.bvs_dir.join(CONFIG_FILE)
    }

    /// Gate settings after environment and CLI overrides.
    pub fn effective_gate_config(&self) -> QualityGateConfig {
        self.gate_config_with(|key| std::env::var(key).ok())
    }

    fn gate_config_with(&self, lookup: impl Fn(&str) -> Option<String>) -> QualityGateConfig {
        let mut gates = self.toml.gates.clone();
        apply_env_overrides(&mut gates, lookup);
        if let Some(parallel) = self.cli_parallel {
            gates.run_in_parallel = parallel;
        }
        if let Some(attempts) = self.cli_max_fix_attempts {
            gates.max_fix_attempts = attempts;
        }
        gates
    }

    pub fn scheduler_limits(&self) -> GraphLimits {
        self.toml.scheduler
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
