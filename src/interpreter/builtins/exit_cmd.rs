//! exit - Request session termination
//!
//! Sets the pending-exit flag and reports the requested code, so the rest
//! of the current line still evaluates (`exit 1 || echo backup` runs the
//! fallback). The front end terminates once the line completes.

use crate::interpreter::types::{failure, ExecutionResult, ShellState};

pub fn handle_exit(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let code = match args.first() {
        None => 0,
        Some(arg) => match arg.parse::<i32>() {
            Ok(n) => n,
            Err(_) => {
                return failure(format!("exit: {}: numeric argument required\n", arg));
            }
        },
    };
    state.exit_request = Some(code);
    ExecutionResult::new("", "", code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::history::HistoryStore;
    use std::path::PathBuf;

    fn state() -> ShellState {
        ShellState::new(PathBuf::from("/"), Environment::new(), HistoryStore::new(10))
    }

    #[test]
    fn test_exit_default_zero() {
        let mut s = state();
        let r = handle_exit(&mut s, &[]);
        assert_eq!(r.exit_code, 0);
        assert_eq!(s.exit_request, Some(0));
    }

    #[test]
    fn test_exit_with_code() {
        let mut s = state();
        let r = handle_exit(&mut s, &["3".to_string()]);
        assert_eq!(r.exit_code, 3);
        assert_eq!(s.exit_request, Some(3));
    }

    #[test]
    fn test_exit_non_numeric() {
        let mut s = state();
        let r = handle_exit(&mut s, &["soon".to_string()]);
        assert_eq!(r.exit_code, 1);
        assert_eq!(s.exit_request, None);
    }
}
