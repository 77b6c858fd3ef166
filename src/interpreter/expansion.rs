//! Word Expansion
//!
//! Turns parsed words into the plain strings handed to dispatch:
//! 1. Variable expansion: `$NAME` and `${NAME}` on unquoted and
//!    double-quoted words; an unset variable expands to the empty string;
//!    `$` followed by a non-identifier character stays literal
//! 2. Tilde expansion: a leading `~` or `~/` on an unquoted word
//!
//! Single-quoted words pass through untouched. Quote stripping already
//! happened in the lexer.

use indexmap::IndexMap;

use crate::ast::{Command, Quoting, RedirectKind, Word};
use crate::interpreter::types::ShellState;

/// A command after expansion, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedCommand {
    pub name: String,
    pub args: Vec<String>,
    pub redirects: IndexMap<RedirectKind, String>,
}

/// Expand a parsed command against the shell state.
pub fn expand_command(cmd: &Command, state: &ShellState) -> ExpandedCommand {
    let redirects = cmd
        .redirects
        .iter()
        .map(|(kind, word)| (*kind, expand_word(word, state)))
        .collect();
    ExpandedCommand {
        name: expand_word(&cmd.name, state),
        args: cmd.args.iter().map(|w| expand_word(w, state)).collect(),
        redirects,
    }
}

/// Expand one word according to its quoting.
pub fn expand_word(word: &Word, state: &ShellState) -> String {
    match word.quoting {
        Quoting::Single => word.text.clone(),
        Quoting::Double => expand_variables(&word.text, state),
        Quoting::None => {
            let expanded = expand_variables(&word.text, state);
            expand_tilde(&expanded, state)
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace `$NAME` and `${NAME}` with values from the environment.
fn expand_variables(text: &str, state: &ShellState) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('{') => {
                // ${NAME}; an unclosed or empty brace form stays literal.
                let mut j = i + 2;
                while j < chars.len() && chars[j] != '}' {
                    j += 1;
                }
                let name: String = chars[i + 2..j].iter().collect();
                if j < chars.len() && !name.is_empty() && name.chars().all(is_ident_char) {
                    out.push_str(&state.env.get(&name).unwrap_or_default());
                    i = j + 1;
                } else {
                    out.push('$');
                    i += 1;
                }
            }
            Some(&c) if is_ident_start(c) => {
                let mut j = i + 1;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                let name: String = chars[i + 1..j].iter().collect();
                out.push_str(&state.env.get(&name).unwrap_or_default());
                i = j;
            }
            _ => {
                // `$` before a non-identifier character is literal.
                out.push('$');
                i += 1;
            }
        }
    }

    out
}

/// Expand a leading `~` or `~/...` to the home directory.
fn expand_tilde(text: &str, state: &ShellState) -> String {
    if text == "~" {
        return state.home().to_string_lossy().into_owned();
    }
    if let Some(rest) = text.strip_prefix("~/") {
        let mut home = state.home().to_string_lossy().into_owned();
        home.push('/');
        home.push_str(rest);
        return home;
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::history::HistoryStore;
    use std::path::PathBuf;

    fn state() -> ShellState {
        let mut env = Environment::new();
        env.set_local("NAME", "world");
        env.set_local("DIR", "/tmp");
        env.set_local("HOME", "/home/tester");
        ShellState::new(PathBuf::from("/"), env, HistoryStore::new(10))
    }

    fn bare(text: &str) -> Word {
        Word::bare(text)
    }

    #[test]
    fn test_unquoted_variable() {
        let s = state();
        assert_eq!(expand_word(&bare("$NAME"), &s), "world");
        assert_eq!(expand_word(&bare("hello-$NAME"), &s), "hello-world");
    }

    #[test]
    fn test_braced_variable() {
        let s = state();
        assert_eq!(expand_word(&bare("${NAME}s"), &s), "worlds");
    }

    #[test]
    fn test_unset_variable_expands_empty() {
        let s = state();
        assert_eq!(expand_word(&bare("$WARDSH_UNSET_XYZ"), &s), "");
    }

    #[test]
    fn test_double_quoted_expands() {
        let s = state();
        let word = Word::new("hi $NAME", Quoting::Double);
        assert_eq!(expand_word(&word, &s), "hi world");
    }

    #[test]
    fn test_single_quoted_is_literal() {
        let s = state();
        let word = Word::new("$NAME", Quoting::Single);
        assert_eq!(expand_word(&word, &s), "$NAME");
    }

    #[test]
    fn test_dollar_before_non_identifier_is_literal() {
        let s = state();
        assert_eq!(expand_word(&bare("$1"), &s), "$1");
        assert_eq!(expand_word(&bare("a$ b"), &s), "a$ b");
        assert_eq!(expand_word(&bare("$"), &s), "$");
        assert_eq!(expand_word(&bare("$?"), &s), "$?");
    }

    #[test]
    fn test_unclosed_brace_is_literal() {
        let s = state();
        assert_eq!(expand_word(&bare("${NAME"), &s), "${NAME");
        assert_eq!(expand_word(&bare("${}"), &s), "${}");
    }

    #[test]
    fn test_tilde_expansion() {
        let s = state();
        assert_eq!(expand_word(&bare("~"), &s), "/home/tester");
        assert_eq!(expand_word(&bare("~/docs"), &s), "/home/tester/docs");
    }

    #[test]
    fn test_tilde_not_expanded_mid_word_or_quoted() {
        let s = state();
        assert_eq!(expand_word(&bare("a~b"), &s), "a~b");
        let quoted = Word::new("~/docs", Quoting::Double);
        assert_eq!(expand_word(&quoted, &s), "~/docs");
    }

    #[test]
    fn test_tilde_user_form_left_alone() {
        let s = state();
        assert_eq!(expand_word(&bare("~alice"), &s), "~alice");
    }

    #[test]
    fn test_expansion_identity_without_alias_or_vars() {
        let s = state();
        let cmd = Command::new(bare("ls"));
        let expanded = expand_command(&cmd, &s);
        assert_eq!(expanded.name, "ls");
        assert!(expanded.args.is_empty());
    }

    #[test]
    fn test_redirect_targets_expanded() {
        let s = state();
        let mut cmd = Command::new(bare("sort"));
        cmd.redirects
            .insert(RedirectKind::Stdout, bare("$DIR/out.txt"));
        let expanded = expand_command(&cmd, &s);
        assert_eq!(expanded.redirects[&RedirectKind::Stdout], "/tmp/out.txt");
    }
}
