//! Process execution for gate checks.

use crate::gates::config::CheckInvocation;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

/// Appended to output that hit the capture cap.
pub const TRUNCATION_MARKER: &str = "[output truncated]";

/// What a finished (or failed-to-start) check command produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Process exit code; -1 when the process could not be run or was killed
    pub exit_code: i32,
    /// Captured stdout followed by stderr
    pub output: String,
    /// Spawn, wait or timeout failure
    pub error: Option<String>,
    pub duration: Duration,
    pub truncated: bool,
}

impl CommandOutput {
    /// A result for a command that never produced an exit status.
    pub fn failed(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            exit_code: -1,
            output: String::new(),
            error: Some(error.into()),
            duration,
            truncated: false,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

/// Abstraction over running a check command.
/// Real implementation: `ProcessRunner`. Tests substitute scripted runners.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command in `cwd`. Never returns an error: every failure is
    /// reported through a failing [`CommandOutput`].
    async fn run(
        &self,
        invocation: &CheckInvocation,
        cwd: &Path,
        max_output_bytes: usize,
    ) -> CommandOutput;
}

/// Runs checks as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        invocation: &CheckInvocation,
        cwd: &Path,
        max_output_bytes: usize,
    ) -> CommandOutput {
        let start = Instant::now();
        let command_line = invocation.command_line();
        debug!(check = %invocation.kind, command = %command_line, "spawning check");

        let mut child = match Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                warn!(check = %invocation.kind, error = %e, "failed to spawn check");
                return CommandOutput::failed(
                    format!("Failed to spawn '{}': {}", command_line, e),
                    start.elapsed(),
                );
            }
        };

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let capture = async {
            tokio::join!(
                read_capped(stdout, max_output_bytes),
                read_capped(stderr, max_output_bytes),
                child.wait()
            )
        };

        let finished = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, capture).await.ok(),
            None => Some(capture.await),
        };

        let Some(((out, out_truncated), (err, err_truncated), status)) = finished else {
            let _ = child.kill().await;
            let secs = invocation.timeout.map_or(0, |t| t.as_secs());
            warn!(check = %invocation.kind, timeout_secs = secs, "check timed out");
            return CommandOutput::failed(
                format!("'{}' timed out after {} seconds", command_line, secs),
                start.elapsed(),
            );
        };

        let truncated = out_truncated || err_truncated;
        let output = combine_streams(&out, &err, truncated);

        match status {
            Ok(status) => CommandOutput {
                exit_code: status.code().unwrap_or(-1),
                output,
                error: None,
                duration: start.elapsed(),
                truncated,
            },
            Err(e) => CommandOutput {
                output,
                truncated,
                ..CommandOutput::failed(
                    format!("Failed to wait for '{}': {}", command_line, e),
                    start.elapsed(),
                )
            },
        }
    }
}

/// Read a stream keeping at most `cap` bytes. The remainder is drained so the
/// child never blocks on a full pipe.
async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>, cap: usize) -> (Vec<u8>, bool) {
    let Some(mut reader) = reader else {
        return (Vec::new(), false);
    };

    let mut kept = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(kept.len());
                if n > room {
                    truncated = true;
                }
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    (kept, truncated)
}

fn combine_streams(stdout: &[u8], stderr: &[u8], truncated: bool) -> String {
    let mut output = String::from_utf8_lossy(stdout).into_owned();
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.is_empty() {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&stderr);
    }
    if truncated {
        if !output.is_empty() && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(TRUNCATION_MARKER);
    }
    output
}
