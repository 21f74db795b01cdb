//! Scheduling and verification core for parallel coding agents.
//!
//! - [`dag`] levels a task list into groups that can run concurrently
//! - [`gates`] runs type-check, lint, build and test checks, tracks fix
//!   attempts and re-verifies failing checks

pub mod config;
pub mod dag;
pub mod errors;
pub mod gates;
pub mod logging;
pub mod util;
