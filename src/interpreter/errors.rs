//! Shell Error Taxonomy
//!
//! Every failure the shell can produce is a tagged variant here. Errors are
//! caught at the `execute()` boundary and materialized into an
//! `ExecutionResult` with the variant's exit code; nothing unwinds past the
//! facade.

use thiserror::Error;

use crate::parser::{LexerError, ParseError};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{}", unknown_command_message(.name, .suggestion))]
    UnknownCommand {
        name: String,
        suggestion: Option<String>,
    },

    #[error("{command}: denied by policy rule '{rule}': {description}")]
    PolicyDenied {
        command: String,
        rule: String,
        description: String,
    },

    #[error("{command}: rejected by sandbox: {reason}")]
    SandboxRejected { command: String, reason: String },

    #[error("{command}: timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no such job: {0}")]
    NoSuchJob(String),
}

fn unknown_command_message(name: &str, suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!("{}: command not found (did you mean '{}'?)", name, s),
        None => format!("{}: command not found", name),
    }
}

impl ShellError {
    /// Exit code reported when this error reaches the `execute()` boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnterminatedQuote | Self::Parse(_) => 2,
            Self::UnknownCommand { .. } => 127,
            Self::Timeout { .. } => 124,
            Self::PolicyDenied { .. }
            | Self::SandboxRejected { .. }
            | Self::Io(_)
            | Self::NoSuchJob(_) => 1,
        }
    }
}

impl From<LexerError> for ShellError {
    fn from(e: LexerError) -> Self {
        match e {
            LexerError::UnterminatedQuote(_) => Self::UnterminatedQuote,
        }
    }
}

impl From<ParseError> for ShellError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e.to_string())
    }
}
