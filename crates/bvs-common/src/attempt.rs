//! Fix-attempt ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gate label attached to a fix attempt.
///
/// Build failures are reported as `Typecheck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixGateType {
    Typecheck,
    Lint,
    Tests,
}

impl fmt::Display for FixGateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixGateType::Typecheck => write!(f, "typecheck"),
            FixGateType::Lint => write!(f, "lint"),
            FixGateType::Tests => write!(f, "tests"),
        }
    }
}

/// A single error the fixer is expected to address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAttemptError {
    pub file: String,
    pub message: String,
}

impl FixAttemptError {
    pub fn new(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// One failed gate run recorded against a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAttempt {
    pub section_id: String,
    /// 1-based attempt counter
    pub attempt: u32,
    pub gate_type: FixGateType,
    pub errors: Vec<FixAttemptError>,
    pub timestamp: DateTime<Utc>,
}
