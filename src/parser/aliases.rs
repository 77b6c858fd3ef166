//! Alias Expansion
//!
//! Token-level alias substitution, applied between lexing and parsing.
//!
//! Rules:
//! 1. Only the first word at a command position is checked (start of line,
//!    or right after `;`, `&&`, `||`, `|`, `&`, or a newline)
//! 2. Only literal unquoted words are eligible
//! 3. The replacement text is re-tokenized and spliced in place of the name;
//!    operators inside the replacement fold into the surrounding line
//! 4. Expansion is non-recursive: tokens produced by a replacement are never
//!    alias-checked again

use indexmap::IndexMap;

use crate::ast::Quoting;

use super::lexer::{tokenize, LexerError, Token, TokenType};

/// Expand aliases in a token stream.
///
/// Returns an error only when an alias replacement itself fails to lex
/// (for example an unterminated quote in the stored replacement).
pub fn expand_aliases(
    tokens: Vec<Token>,
    aliases: &IndexMap<String, String>,
) -> Result<Vec<Token>, LexerError> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut at_command_start = true;

    for token in tokens {
        let eligible = at_command_start
            && token.token_type == TokenType::Word
            && token.quoting == Quoting::None;

        if eligible {
            if let Some(replacement) = aliases.get(&token.text) {
                let spliced = tokenize(replacement)?;
                // The spliced tokens may end in a separator, which puts the
                // *next* original token back at a command position.
                at_command_start = spliced
                    .last()
                    .map(|t| t.token_type.is_separator())
                    .unwrap_or(true);
                out.extend(spliced);
                continue;
            }
        }

        at_command_start = token.token_type.is_separator();
        out.push(token);
    }

    Ok(out)
}
