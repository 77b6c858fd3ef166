//! Abstract Syntax Tree Types for Shell Lines
//!
//! This module defines the AST a parsed input line folds into:
//! a line is a list of conditional chains, a chain is a list of pipelines
//! joined by connectors, a pipeline is a list of commands joined by `|`,
//! and a command is a name plus arguments and redirections.

use std::fmt;

use indexmap::IndexMap;

// =============================================================================
// WORDS
// =============================================================================

/// Quoting that applied to a word when it was lexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quoting {
    /// No quotes: variable and tilde expansion apply.
    #[default]
    None,
    /// Single quotes: fully literal, no expansion.
    Single,
    /// Double quotes: variable expansion applies, tilde does not.
    Double,
}

/// A single word with its surrounding quotes already stripped.
///
/// The quoting is retained so the expander can decide which expansions
/// apply to the text.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub quoting: Quoting,
}

impl Word {
    pub fn new(text: impl Into<String>, quoting: Quoting) -> Self {
        Self {
            text: text.into(),
            quoting,
        }
    }

    /// An unquoted word.
    pub fn bare(text: impl Into<String>) -> Self {
        Self::new(text, Quoting::None)
    }
}

// =============================================================================
// REDIRECTIONS
// =============================================================================

/// Redirection operators recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectKind {
    Stdin,  // <
    Stdout, // >
    Append, // >>
    Stderr, // 2>
}

impl fmt::Display for RedirectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => write!(f, "<"),
            Self::Stdout => write!(f, ">"),
            Self::Append => write!(f, ">>"),
            Self::Stderr => write!(f, "2>"),
        }
    }
}

/// Redirections attached to one command, at most one per kind.
pub type Redirects = IndexMap<RedirectKind, Word>;

// =============================================================================
// COMMANDS, PIPELINES, CHAINS
// =============================================================================

/// A simple command: name, arguments, redirections.
///
/// Invariant: `name` is non-empty after parsing and `args` excludes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: Word,
    pub args: Vec<Word>,
    pub redirects: Redirects,
}

impl Command {
    pub fn new(name: Word) -> Self {
        Self {
            name,
            args: Vec::new(),
            redirects: Redirects::new(),
        }
    }
}

/// A sequence of commands joined by `|`.
///
/// Stdout of command `i` wires to stdin of command `i + 1`; redirects on a
/// command override the pipe wiring. A trailing `&` backgrounds the whole
/// pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub background: bool,
}

impl Pipeline {
    pub fn new(commands: Vec<Command>) -> Self {
        Self {
            commands,
            background: false,
        }
    }
}

/// Operator joining a pipeline to the next one within a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// Ends the chain.
    #[default]
    None,
    And, // &&
    Or,  // ||
    Seq, // ;
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
            Self::Seq => write!(f, ";"),
        }
    }
}

/// A sequence of pipelines joined by `;`, `&&`, `||`.
///
/// Each entry carries the connector that joins it to the *following*
/// pipeline; the last entry's connector is `None`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionalChain {
    pub parts: Vec<(Pipeline, Connector)>,
}

/// A full input line: conditional chains separated by newlines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    pub chains: Vec<ConditionalChain>,
}

impl Line {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
