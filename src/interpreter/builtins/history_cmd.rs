//! history - Print recorded command lines
//!
//! `history` prints everything; `history N` prints the last N entries.
//! Entries are numbered by absolute position, oldest first.

use crate::interpreter::types::{failure, output, ExecutionResult, ShellState};

pub fn handle_history(state: &ShellState, args: &[String]) -> ExecutionResult {
    let count = match args.first() {
        None => state.history.len(),
        Some(arg) => match arg.parse::<usize>() {
            Ok(n) => n,
            Err(_) => {
                return failure(format!("history: {}: numeric argument required\n", arg));
            }
        },
    };

    let entries = state.history.recent(count);
    let first_index = state.history.len() - entries.len() + 1;
    let mut listing = String::new();
    for (offset, entry) in entries.iter().enumerate() {
        listing.push_str(&format!("{:5}  {}\n", first_index + offset, entry.command));
    }
    output(listing)
}
