//! Sandbox Supervisor
//!
//! Validates, launches, monitors, and sanitizes external-process
//! invocations. One invocation gets one deadline; on expiry the child's
//! process group is terminated and whatever output was collected so far is
//! returned. The interactive layer can also request cancellation through
//! the shared `Notify` handle.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::interpreter::errors::ShellError;

use super::platform;
use super::types::{CommandMeta, SandboxConfig, SupervisedOutput, TRUNCATION_MARKER};
use super::validation;

#[derive(Debug, Clone)]
pub struct Supervisor {
    config: SandboxConfig,
    cancel: Arc<Notify>,
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Deadline,
    Cancelled,
}

impl Supervisor {
    pub fn new(config: SandboxConfig) -> Self {
        Self {
            config,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Handle the UI layer may use to cancel the invocation in flight.
    pub fn cancel_handle(&self) -> Arc<Notify> {
        self.cancel.clone()
    }

    /// Run validation and the whitelist check without starting anything.
    pub fn validate(&self, meta: &CommandMeta) -> Result<(), ShellError> {
        let rejected = |reason: String| {
            tracing::warn!(command = meta.name, reason = %reason, "sandbox rejected command");
            ShellError::SandboxRejected {
                command: meta.name.to_string(),
                reason,
            }
        };
        validation::validate(meta).map_err(&rejected)?;
        if !validation::whitelisted(meta.name, &self.config) {
            return Err(rejected(format!(
                "'{}' is not on the sandbox whitelist",
                meta.name
            )));
        }
        Ok(())
    }

    /// Validate, apply platform isolation, and start the child.
    pub fn spawn(&self, mut command: Command, meta: &CommandMeta) -> Result<Child, ShellError> {
        self.validate(meta)?;
        platform::apply_isolation(&mut command);
        command.spawn().map_err(ShellError::Io)
    }

    /// Wait for a spawned child under the configured deadline, collecting
    /// capped stdout/stderr and scrubbing control characters.
    pub async fn supervise(&self, mut child: Child) -> Result<SupervisedOutput, ShellError> {
        let stdout_task = read_capped(child.stdout.take(), self.config.max_stdout_bytes);
        let stderr_task = read_capped(child.stderr.take(), self.config.max_stderr_bytes);

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = tokio::time::sleep(self.config.timeout) => WaitOutcome::Deadline,
            _ = self.cancel.notified() => WaitOutcome::Cancelled,
        };

        let (exit_code, timed_out, cancelled) = match outcome {
            WaitOutcome::Exited(status) => {
                let status = status?;
                (status.code().unwrap_or(-1), false, false)
            }
            WaitOutcome::Deadline => {
                platform::terminate(&mut child);
                let _ = child.wait().await;
                (124, true, false)
            }
            WaitOutcome::Cancelled => {
                platform::terminate(&mut child);
                let _ = child.wait().await;
                (130, false, true)
            }
        };

        let (stdout_bytes, stdout_truncated) = join_capture(stdout_task).await;
        let (stderr_bytes, stderr_truncated) = join_capture(stderr_task).await;

        let mut stdout = sanitize(&stdout_bytes);
        if stdout_truncated {
            stdout.push_str(TRUNCATION_MARKER);
        }
        let mut stderr = sanitize(&stderr_bytes);
        if stderr_truncated {
            stderr.push_str(TRUNCATION_MARKER);
        }

        Ok(SupervisedOutput {
            stdout,
            stderr,
            exit_code,
            timed_out,
            cancelled,
        })
    }
}

/// Drain a stream to EOF, keeping only the first `cap` bytes. Reading past
/// the cap keeps the child from blocking on a full pipe.
fn read_capped<R>(reader: Option<R>, cap: usize) -> Option<JoinHandle<(Vec<u8>, bool)>>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let mut reader = reader?;
    Some(tokio::spawn(async move {
        let mut kept: Vec<u8> = Vec::new();
        let mut truncated = false;
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if kept.len() < cap {
                        let take = (cap - kept.len()).min(n);
                        kept.extend_from_slice(&buf[..take]);
                        if take < n {
                            truncated = true;
                        }
                    } else {
                        truncated = true;
                    }
                }
            }
        }
        (kept, truncated)
    }))
}

async fn join_capture(task: Option<JoinHandle<(Vec<u8>, bool)>>) -> (Vec<u8>, bool) {
    match task {
        Some(handle) => handle.await.unwrap_or((Vec::new(), false)),
        None => (Vec::new(), false),
    }
}

/// Remove NUL and all C0 control characters except tab, newline, and
/// carriage return.
pub fn sanitize(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c == '\t' || c == '\n' || c == '\r' || !c.is_ascii_control())
        .collect()
}
