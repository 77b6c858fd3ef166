//! set - Shell-local variable assignment
//!
//! Both `set NAME VALUE` and `set NAME=VALUE` store the same value.

use crate::interpreter::types::{failure, ExecutionResult, ShellState};

pub fn handle_set(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    match args {
        [] => failure("set: usage: set NAME VALUE\n"),
        [single] => match single.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                state.env.set_local(name, value);
                ExecutionResult::success()
            }
            _ => failure("set: usage: set NAME VALUE\n"),
        },
        [name, rest @ ..] => {
            if name.is_empty() || name.contains('=') {
                return failure(format!("set: invalid variable name '{}'\n", name));
            }
            state.env.set_local(name, rest.join(" "));
            ExecutionResult::success()
        }
    }
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

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_two_args() {
        let mut s = state();
        let r = handle_set(&mut s, &args(&["NAME", "value"]));
        assert_eq!(r.exit_code, 0);
        assert_eq!(s.env.get("NAME").as_deref(), Some("value"));
    }

    #[test]
    fn test_set_equals_form_matches_two_arg_form() {
        let mut s = state();
        handle_set(&mut s, &args(&["A", "same"]));
        handle_set(&mut s, &args(&["B=same"]));
        assert_eq!(s.env.get("A"), s.env.get("B"));
    }

    #[test]
    fn test_set_joins_extra_args() {
        let mut s = state();
        handle_set(&mut s, &args(&["MSG", "hello", "world"]));
        assert_eq!(s.env.get("MSG").as_deref(), Some("hello world"));
    }

    #[test]
    fn test_set_missing_args_fails() {
        let mut s = state();
        assert_eq!(handle_set(&mut s, &[]).exit_code, 1);
        assert_eq!(handle_set(&mut s, &args(&["JUSTNAME"])).exit_code, 1);
    }

    #[test]
    fn test_set_empty_value_allowed() {
        let mut s = state();
        let r = handle_set(&mut s, &args(&["EMPTY="]));
        assert_eq!(r.exit_code, 0);
        assert_eq!(s.env.get("EMPTY").as_deref(), Some(""));
    }
}
