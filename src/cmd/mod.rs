//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled                  |
//! |-------------|-----------------------------------|
//! | `schedule`  | `Schedule`, `Validate`, `Ready`   |
//! | `gate`      | `Gate`, `Rereview`                |
//! | `config`    | `Config`                          |
//!
//! Commands return `Ok(false)` when they ran but the outcome should make the
//! process exit non-zero.

pub mod config;
pub mod gate;
pub mod schedule;

pub use config::cmd_config;
pub use gate::{cmd_gate, cmd_rereview};
pub use schedule::{cmd_ready, cmd_schedule, cmd_validate};
