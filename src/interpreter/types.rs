//! Interpreter Types
//!
//! The per-command result model and the mutable state the interpreter
//! threads through one `execute()` call.

use std::path::PathBuf;
use std::time::Duration;

use crate::environment::Environment;
use crate::history::HistoryStore;
use crate::interpreter::errors::ShellError;
use crate::jobs::JobTable;

/// Result of executing a command, pipeline, or whole line.
///
/// `exit_code == 0` iff the command counts as successful for chain
/// evaluation. `duration` is strictly positive on every code path,
/// builtins included.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub output: String,
    pub error: String,
    pub exit_code: i32,
    pub duration: Duration,
}

impl ExecutionResult {
    pub fn new(output: impl Into<String>, error: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            error: error.into(),
            exit_code,
            duration: Duration::from_nanos(1),
        }
    }

    /// An empty success result.
    pub fn success() -> Self {
        Self::new("", "", 0)
    }

    /// Materialize an error as a result with the error's exit code.
    pub fn from_error(err: &ShellError) -> Self {
        Self::new("", format!("wardsh: {}\n", err), err.exit_code())
    }

    /// Stamp the measured duration, clamped to stay strictly positive.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration.max(Duration::from_nanos(1));
        self
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Convenience constructors mirroring the common builtin shapes.
pub fn output(text: impl Into<String>) -> ExecutionResult {
    ExecutionResult::new(text, "", 0)
}

pub fn failure(message: impl Into<String>) -> ExecutionResult {
    ExecutionResult::new("", message, 1)
}

/// Mutable shell state owned by the facade and borrowed by the engine for
/// the duration of one `execute()` call.
#[derive(Debug)]
pub struct ShellState {
    pub cwd: PathBuf,
    pub previous_dir: PathBuf,
    pub env: Environment,
    pub history: HistoryStore,
    pub jobs: JobTable,
    /// Set by the `exit` builtin; the front end terminates the session
    /// after the current line finishes.
    pub exit_request: Option<i32>,
    pub last_exit: i32,
}

impl ShellState {
    pub fn new(cwd: PathBuf, env: Environment, history: HistoryStore) -> Self {
        Self {
            previous_dir: cwd.clone(),
            cwd,
            env,
            history,
            jobs: JobTable::new(),
            exit_request: None,
            last_exit: 0,
        }
    }

    /// The home directory: `$HOME` (through the environment store) or the
    /// platform home as a fallback.
    pub fn home(&self) -> PathBuf {
        self.env
            .get("HOME")
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}
