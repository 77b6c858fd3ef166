//! export - Exported variable assignment
//!
//! `export NAME=VALUE` makes the variable visible to child processes and
//! persists it across sessions. `export NAME` promotes an existing
//! shell-local variable.

use crate::interpreter::types::{failure, ExecutionResult, ShellState};

pub fn handle_export(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    if args.is_empty() {
        return failure("export: usage: export NAME=VALUE\n");
    }

    for arg in args {
        match arg.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                state.env.set_exported(name, value);
            }
            Some(_) => {
                return failure("export: usage: export NAME=VALUE\n");
            }
            None => match state.env.local(arg) {
                Some(value) => {
                    let value = value.to_string();
                    state.env.set_exported(arg, value);
                }
                None => {
                    return failure(format!("export: {}: not set\n", arg));
                }
            },
        }
    }
    ExecutionResult::success()
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
    fn test_export_sets_exported() {
        let mut s = state();
        let r = handle_export(&mut s, &args(&["API_URL=https://example.com"]));
        assert_eq!(r.exit_code, 0);
        assert_eq!(
            s.env.exported().get("API_URL").map(|v| v.as_str()),
            Some("https://example.com")
        );
    }

    #[test]
    fn test_export_visible_in_child_env() {
        let mut s = state();
        handle_export(&mut s, &args(&["CHILD_VISIBLE=yes"]));
        assert_eq!(
            s.env.child_env().get("CHILD_VISIBLE").map(|v| v.as_str()),
            Some("yes")
        );
    }

    #[test]
    fn test_export_promotes_local() {
        let mut s = state();
        s.env.set_local("PROMOTE", "me");
        let r = handle_export(&mut s, &args(&["PROMOTE"]));
        assert_eq!(r.exit_code, 0);
        assert_eq!(s.env.exported().get("PROMOTE").map(|v| v.as_str()), Some("me"));
    }

    #[test]
    fn test_export_unknown_name_fails() {
        let mut s = state();
        let r = handle_export(&mut s, &args(&["NOPE"]));
        assert_eq!(r.exit_code, 1);
        assert!(r.error.contains("NOPE"));
    }

    #[test]
    fn test_export_no_args_fails() {
        let mut s = state();
        assert_eq!(handle_export(&mut s, &[]).exit_code, 1);
    }
}
