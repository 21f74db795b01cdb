//! Scripted command runner for gate tests.

use crate::gates::config::CheckInvocation;
use crate::gates::runner::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use bvs_common::GateKind;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

/// Replays queued outputs per gate kind. An empty queue yields a clean exit.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: Mutex<HashMap<GateKind, VecDeque<CommandOutput>>>,
    calls: Mutex<Vec<GateKind>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, kind: GateKind, exit_code: i32, output: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(CommandOutput {
                exit_code,
                output: output.to_string(),
                error: None,
                duration: Duration::from_millis(5),
                truncated: false,
            });
        self
    }

    pub fn fail_to_spawn(self, kind: GateKind, error: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(CommandOutput::failed(error, Duration::ZERO));
        self
    }

    /// Kinds invoked so far, in call order.
    pub fn calls(&self) -> Vec<GateKind> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &CheckInvocation,
        _cwd: &Path,
        _max_output_bytes: usize,
    ) -> CommandOutput {
        self.calls.lock().unwrap().push(invocation.kind);
        self.responses
            .lock()
            .unwrap()
            .get_mut(&invocation.kind)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(CommandOutput {
                duration: Duration::from_millis(1),
                ..Default::default()
            })
    }
}

/// Blocks every invocation on a shared barrier, so a batch of checks only
/// completes when all of them are in flight at once.
#[derive(Debug)]
pub struct BarrierRunner {
    barrier: Arc<Barrier>,
}

impl BarrierRunner {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(parties)),
        }
    }
}

#[async_trait]
impl CommandRunner for BarrierRunner {
    async fn run(
        &self,
        _invocation: &CheckInvocation,
        _cwd: &Path,
        _max_output_bytes: usize,
    ) -> CommandOutput {
        self.barrier.wait().await;
        CommandOutput {
            duration: Duration::from_millis(1),
            ..Default::default()
        }
    }
}
