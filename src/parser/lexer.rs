//! Lexer for Shell Lines
//!
//! The lexer tokenizes a command line into a stream of tokens the parser
//! consumes. It handles:
//! - Words with single/double quoting and backslash escapes
//! - Operators (`;`, `&&`, `||`, `|`, `&`), two-character forms matched
//!   greedily before their single-character variants
//! - Redirections (`<`, `>`, `>>`, `2>`)
//!
//! Quotes are stripped while a word accumulates; the quoting that applied
//! is recorded on the token so the expander can tell literal text from
//! expandable text. `$NAME` sequences inside double quotes are preserved
//! verbatim for later expansion.

use thiserror::Error;

use crate::ast::Quoting;

/// Token types produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Word,
    Semi,    // ;
    AndAnd,  // &&
    OrOr,    // ||
    Pipe,    // |
    Amp,     // &
    Newline, // literal newline in the input

    RedirectIn,     // <
    RedirectOut,    // >
    RedirectAppend, // >>
    RedirectErr,    // 2>
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Word => "WORD",
            Self::Semi => ";",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Pipe => "|",
            Self::Amp => "&",
            Self::Newline => "NEWLINE",
            Self::RedirectIn => "<",
            Self::RedirectOut => ">",
            Self::RedirectAppend => ">>",
            Self::RedirectErr => "2>",
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            Self::RedirectIn | Self::RedirectOut | Self::RedirectAppend | Self::RedirectErr
        )
    }

    /// True for tokens that separate commands or pipelines.
    pub fn is_separator(&self) -> bool {
        matches!(
            self,
            Self::Semi | Self::AndAnd | Self::OrOr | Self::Pipe | Self::Amp | Self::Newline
        )
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    /// Quote-stripped text for words, the operator spelling otherwise.
    pub text: String,
    /// For word tokens: the quoting that applied while lexing.
    pub quoting: Quoting,
}

impl Token {
    pub fn word(text: impl Into<String>, quoting: Quoting) -> Self {
        Self {
            token_type: TokenType::Word,
            text: text.into(),
            quoting,
        }
    }

    pub fn operator(token_type: TokenType) -> Self {
        Self {
            token_type,
            text: token_type.as_str().to_string(),
            quoting: Quoting::None,
        }
    }
}

/// Error thrown when the lexer encounters invalid input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexerError {
    #[error("unterminated quote: missing closing {0}")]
    UnterminatedQuote(char),
}

/// Characters that double-quote backslashes may escape.
const DOUBLE_QUOTE_ESCAPABLE: &[char] = &['"', '\\', '$', '`'];

/// Tokenize a command line.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();

    let mut word = String::new();
    let mut quoting = Quoting::None;
    // Distinguishes an empty quoted word ('') from no word at all.
    let mut in_word = false;
    let mut i = 0;

    macro_rules! flush_word {
        () => {
            if in_word {
                tokens.push(Token::word(std::mem::take(&mut word), quoting));
                quoting = Quoting::None;
                in_word = false;
            }
        };
    }

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => {
                flush_word!();
                i += 1;
            }
            '\n' => {
                flush_word!();
                tokens.push(Token::operator(TokenType::Newline));
                i += 1;
            }
            '\\' => {
                // Escape the next character into the current word; a
                // trailing backslash stays literal.
                if i + 1 < chars.len() {
                    word.push(chars[i + 1]);
                    i += 2;
                } else {
                    word.push('\\');
                    i += 1;
                }
                in_word = true;
            }
            '\'' => {
                if quoting == Quoting::None {
                    quoting = Quoting::Single;
                }
                in_word = true;
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            word.push(ch);
                            i += 1;
                        }
                        None => return Err(LexerError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                if quoting == Quoting::None {
                    quoting = Quoting::Double;
                }
                in_word = true;
                i += 1;
                loop {
                    match chars.get(i) {
                        Some('"') => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            // Backslash escapes ", \, $, and `. Anything else
                            // keeps the backslash, so Windows paths survive.
                            match chars.get(i + 1) {
                                Some(&next) if DOUBLE_QUOTE_ESCAPABLE.contains(&next) => {
                                    word.push(next);
                                    i += 2;
                                }
                                Some(_) | None => {
                                    word.push('\\');
                                    i += 1;
                                }
                            }
                        }
                        Some(&ch) => {
                            word.push(ch);
                            i += 1;
                        }
                        None => return Err(LexerError::UnterminatedQuote('"')),
                    }
                }
            }
            ';' => {
                flush_word!();
                tokens.push(Token::operator(TokenType::Semi));
                i += 1;
            }
            '&' => {
                flush_word!();
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::operator(TokenType::AndAnd));
                    i += 2;
                } else {
                    tokens.push(Token::operator(TokenType::Amp));
                    i += 1;
                }
            }
            '|' => {
                flush_word!();
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::operator(TokenType::OrOr));
                    i += 2;
                } else {
                    tokens.push(Token::operator(TokenType::Pipe));
                    i += 1;
                }
            }
            '<' => {
                flush_word!();
                tokens.push(Token::operator(TokenType::RedirectIn));
                i += 1;
            }
            '>' => {
                // An unquoted word consisting of exactly "2" directly before
                // `>` is the stderr redirect, not an argument.
                if in_word && word == "2" && quoting == Quoting::None {
                    word.clear();
                    in_word = false;
                    tokens.push(Token::operator(TokenType::RedirectErr));
                    i += 1;
                } else {
                    flush_word!();
                    if chars.get(i + 1) == Some(&'>') {
                        tokens.push(Token::operator(TokenType::RedirectAppend));
                        i += 2;
                    } else {
                        tokens.push(Token::operator(TokenType::RedirectOut));
                        i += 1;
                    }
                }
            }
            _ => {
                word.push(c);
                in_word = true;
                i += 1;
            }
        }
    }

    if in_word {
        tokens.push(Token::word(word, quoting));
    }
    Ok(tokens)
}
