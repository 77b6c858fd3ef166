//! Parser for Shell Lines
//!
//! Folds the token stream into `Line -> ConditionalChain -> Pipeline ->
//! Command`. Rules:
//! - `;` joins pipelines within a chain (always-run connector); literal
//!   newlines split chains
//! - `&&` / `||` attach the next pipeline with the matching connector
//! - `|` concatenates the next command into the current pipeline
//! - a redirect token attaches to the most recent command and consumes the
//!   next word
//! - a trailing `&` backgrounds the current pipeline
//! - empty commands between consecutive separators are dropped silently

use thiserror::Error;

use crate::ast::{Command, ConditionalChain, Connector, Line, Pipeline, RedirectKind, Word};

use super::lexer::{Token, TokenType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected operator '{0}'")]
    UnexpectedOperator(String),
    #[error("unexpected end of input after '{0}'")]
    TrailingOperator(String),
    #[error("expected a path after '{0}'")]
    MissingRedirectTarget(String),
    #[error("duplicate redirect '{0}'")]
    DuplicateRedirect(String),
    #[error("empty command name")]
    EmptyCommandName,
}

/// Incremental builder for one line.
struct LineBuilder {
    line: Line,
    chain: ConditionalChain,
    pipeline: Vec<Command>,
    current: Option<Command>,
    /// Connector left dangling by the previous `&&` / `||`, used to reject
    /// chains that end in one.
    pending: Option<Connector>,
    /// A `|` was seen and the next command has not started yet.
    after_pipe: bool,
}

impl LineBuilder {
    fn new() -> Self {
        Self {
            line: Line::default(),
            chain: ConditionalChain::default(),
            pipeline: Vec::new(),
            current: None,
            pending: None,
            after_pipe: false,
        }
    }

    fn push_word(&mut self, word: Word) -> Result<(), ParseError> {
        match &mut self.current {
            Some(cmd) => cmd.args.push(word),
            None => {
                if word.text.is_empty() {
                    return Err(ParseError::EmptyCommandName);
                }
                self.current = Some(Command::new(word));
                self.pending = None;
                self.after_pipe = false;
            }
        }
        Ok(())
    }

    fn finish_command(&mut self) {
        if let Some(cmd) = self.current.take() {
            self.pipeline.push(cmd);
        }
    }

    /// Close the current pipeline and attach it to the chain with the given
    /// connector. An empty pipeline is dropped silently (`;;` tolerance).
    fn finish_pipeline(&mut self, connector: Connector, background: bool) {
        self.finish_command();
        if self.pipeline.is_empty() {
            return;
        }
        let mut pipeline = Pipeline::new(std::mem::take(&mut self.pipeline));
        pipeline.background = background;
        self.chain.parts.push((pipeline, connector));
        if matches!(connector, Connector::And | Connector::Or) {
            self.pending = Some(connector);
        }
    }

    fn finish_chain(&mut self) {
        self.finish_pipeline(Connector::None, false);
        // Normalize: the last pipeline of a chain carries no connector.
        if let Some(last) = self.chain.parts.last_mut() {
            if last.1 == Connector::Seq {
                last.1 = Connector::None;
            }
        }
        if !self.chain.parts.is_empty() {
            self.line.chains.push(std::mem::take(&mut self.chain));
        }
    }
}

/// Parse a token stream into a `Line`.
pub fn parse(tokens: Vec<Token>) -> Result<Line, ParseError> {
    let mut b = LineBuilder::new();
    let mut iter = tokens.into_iter();

    while let Some(token) = iter.next() {
        match token.token_type {
            TokenType::Word => {
                b.push_word(Word::new(token.text, token.quoting))?;
            }
            TokenType::RedirectIn
            | TokenType::RedirectOut
            | TokenType::RedirectAppend
            | TokenType::RedirectErr => {
                let kind = redirect_kind(token.token_type);
                let cmd = match (&mut b.current, b.pipeline.last_mut()) {
                    (Some(cmd), _) => cmd,
                    (None, Some(cmd)) => cmd,
                    (None, None) => {
                        return Err(ParseError::UnexpectedOperator(token.text));
                    }
                };
                let target = match iter.next() {
                    Some(t) if t.token_type == TokenType::Word => Word::new(t.text, t.quoting),
                    _ => return Err(ParseError::MissingRedirectTarget(token.text)),
                };
                if cmd.redirects.contains_key(&kind) {
                    return Err(ParseError::DuplicateRedirect(kind.to_string()));
                }
                cmd.redirects.insert(kind, target);
            }
            TokenType::Semi => {
                if b.after_pipe {
                    return Err(ParseError::TrailingOperator("|".to_string()));
                }
                b.finish_pipeline(Connector::Seq, false);
            }
            TokenType::AndAnd | TokenType::OrOr => {
                let connector = if token.token_type == TokenType::AndAnd {
                    Connector::And
                } else {
                    Connector::Or
                };
                if b.after_pipe {
                    return Err(ParseError::TrailingOperator("|".to_string()));
                }
                b.finish_command();
                if b.pipeline.is_empty() {
                    return Err(ParseError::UnexpectedOperator(token.text));
                }
                b.finish_pipeline(connector, false);
            }
            TokenType::Pipe => {
                if b.current.is_none() {
                    return Err(ParseError::UnexpectedOperator(token.text));
                }
                b.finish_command();
                b.after_pipe = true;
            }
            TokenType::Amp => {
                if b.after_pipe {
                    return Err(ParseError::TrailingOperator("|".to_string()));
                }
                b.finish_command();
                if b.pipeline.is_empty() {
                    return Err(ParseError::UnexpectedOperator(token.text));
                }
                b.finish_pipeline(Connector::Seq, true);
            }
            TokenType::Newline => {
                if b.after_pipe {
                    return Err(ParseError::TrailingOperator("|".to_string()));
                }
                if b.pending.is_some() && b.current.is_none() && b.pipeline.is_empty() {
                    // A newline ends the chain, so `a &&\n` dangles.
                    let dangling = b.pending.take().map(|c| c.to_string()).unwrap_or_default();
                    return Err(ParseError::TrailingOperator(dangling));
                }
                b.finish_chain();
            }
        }
    }

    if b.after_pipe {
        return Err(ParseError::TrailingOperator("|".to_string()));
    }
    if b.pending.is_some() && b.current.is_none() && b.pipeline.is_empty() {
        let dangling = b.pending.take().map(|c| c.to_string()).unwrap_or_default();
        return Err(ParseError::TrailingOperator(dangling));
    }
    b.finish_chain();
    Ok(b.line)
}

fn redirect_kind(token_type: TokenType) -> RedirectKind {
    match token_type {
        TokenType::RedirectIn => RedirectKind::Stdin,
        TokenType::RedirectOut => RedirectKind::Stdout,
        TokenType::RedirectAppend => RedirectKind::Append,
        TokenType::RedirectErr => RedirectKind::Stderr,
        _ => unreachable!("not a redirect token"),
    }
}
