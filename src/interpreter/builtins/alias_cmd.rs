//! alias / unalias - Alias management
//!
//! `alias` with no arguments lists definitions. Definitions accept both
//! `alias name=value` and `alias name value...`; quotes around the
//! replacement (including nested ones) were already stripped by the lexer.
//! `unalias` on a near-miss suggests the alias one edit away.

use crate::interpreter::types::{failure, output, ExecutionResult, ShellState};

pub fn handle_alias(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    if args.is_empty() {
        let mut listing = String::new();
        for (name, replacement) in state.env.aliases() {
            listing.push_str(&format!("alias {}='{}'\n", name, replacement));
        }
        return output(listing);
    }

    let first = &args[0];
    if let Some((name, value)) = first.split_once('=') {
        if name.is_empty() {
            return failure("alias: invalid alias name\n");
        }
        // `alias g=git status`: everything after the `=` belongs to the
        // replacement.
        let mut replacement = value.to_string();
        for extra in &args[1..] {
            replacement.push(' ');
            replacement.push_str(extra);
        }
        state.env.set_alias(name, replacement);
        ExecutionResult::success()
    } else if args.len() == 1 {
        match state.env.alias(first) {
            Some(replacement) => output(format!("alias {}='{}'\n", first, replacement)),
            None => failure(format!("alias: {}: not found\n", first)),
        }
    } else {
        state.env.set_alias(first, args[1..].join(" "));
        ExecutionResult::success()
    }
}

pub fn handle_unalias(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let Some(name) = args.first() else {
        return failure("unalias: usage: unalias NAME\n");
    };

    if state.env.remove_alias(name) {
        return ExecutionResult::success();
    }

    let suggestion = state
        .env
        .aliases()
        .keys()
        .find(|candidate| within_one_edit(name, candidate));
    match suggestion {
        Some(candidate) => failure(format!(
            "unalias: {}: not found (did you mean '{}'?)\n",
            name, candidate
        )),
        None => failure(format!("unalias: {}: not found\n", name)),
    }
}

/// True when `a` and `b` are at most one edit (insert, delete, replace)
/// apart.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };

    match long.len() - short.len() {
        0 => {
            let mismatches = short.iter().zip(long.iter()).filter(|(x, y)| x != y).count();
            mismatches <= 1
        }
        1 => {
            // One deletion from the longer string must yield the shorter.
            let mut i = 0;
            let mut j = 0;
            let mut skipped = false;
            while i < short.len() && j < long.len() {
                if short[i] == long[j] {
                    i += 1;
                    j += 1;
                } else if skipped {
                    return false;
                } else {
                    skipped = true;
                    j += 1;
                }
            }
            true
        }
        _ => false,
    }
}
