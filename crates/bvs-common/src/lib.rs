//! Shared domain types for the bvs scheduling and verification core.
//!
//! Everything in this crate is plain serializable data. The scheduling and
//! quality-gate logic lives in the `bvs` crate and only reads or annotates
//! these records.

pub mod attempt;
pub mod gate;
pub mod serde_helpers;
pub mod task;

pub use attempt::{FixAttempt, FixAttemptError, FixGateType};
pub use gate::{CheckResult, E2eResult, GateIssue, GateKind, QualityGateResult, Severity, TestSummary};
pub use task::TaskDescriptor;
