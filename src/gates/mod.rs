//! Quality gate: run verification checks, track fix attempts, re-verify.
//!
//! ## Architecture
//!
//! 1. **Config** - which checks run, with which commands and options
//! 2. **Runner** - executes one check command with bounded output capture
//! 3. **Parsers** - pluggable per-kind extraction of structured issues
//! 4. **Orchestrator** - sequential or parallel runs, aggregation, events
//! 5. **Tracker** - per-section fix-attempt ledger and skip approvals
//! 6. **Re-review** - re-runs only failing checks until they converge
//!
//! The pass/fail verdict of a check always comes from the command's exit
//! code. Parsed issues are best-effort detail.

pub mod config;
pub mod orchestrator;
pub mod parsers;
pub mod rereview;
pub mod runner;
pub mod tracker;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{
    BuildConfig, CheckInvocation, DEFAULT_MAX_FIX_ATTEMPTS, DEFAULT_MAX_OUTPUT_BYTES, LintConfig,
    QualityGateConfig, TestsConfig, TypecheckConfig,
};
pub use orchestrator::{GateEvent, QualityGateOrchestrator};
pub use parsers::{
    BuildParser, LintParser, OutputParser, ParsedOutput, ParserSet, TestParser, TypecheckParser,
};
pub use rereview::{DEFAULT_MAX_ITERATIONS, ReReviewLoop, ReReviewOutcome};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner, TRUNCATION_MARKER};
pub use tracker::FixAttemptTracker;
