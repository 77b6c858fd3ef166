//! Builtin Command Dispatch
//!
//! Builtins run inside the shell without spawning a child process. Every
//! handler returns an `ExecutionResult`; the engine stamps the duration.

pub mod alias_cmd;
pub mod cd_cmd;
pub mod exit_cmd;
pub mod export_cmd;
pub mod history_cmd;
pub mod jobs_cmd;
pub mod set_cmd;

use crate::interpreter::types::{output, ExecutionResult, ShellState};

/// Builtin names, exposed for the completion collaborator.
pub const BUILTIN_NAMES: &[&str] = &[
    "cd", "pwd", "echo", "set", "export", "alias", "unalias", "history", "jobs", "fg", "bg",
    "disown", "kill", "exit",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Dispatch a command to its builtin handler. Returns `None` when the
/// command should go through external resolution instead, either because
/// it is not a builtin, or for `kill` with a non-`%` target (that form is
/// the external `kill`).
pub async fn dispatch(
    name: &str,
    args: &[String],
    state: &mut ShellState,
) -> Option<ExecutionResult> {
    if name == "kill" && args.first().map(|a| !a.starts_with('%')).unwrap_or(false) {
        return None;
    }

    let result = match name {
        "cd" => cd_cmd::handle_cd(state, args),
        "pwd" => handle_pwd(state),
        "echo" => handle_echo(args),
        "set" => set_cmd::handle_set(state, args),
        "export" => export_cmd::handle_export(state, args),
        "alias" => alias_cmd::handle_alias(state, args),
        "unalias" => alias_cmd::handle_unalias(state, args),
        "history" => history_cmd::handle_history(state, args),
        "jobs" => jobs_cmd::handle_jobs(state),
        "fg" => jobs_cmd::handle_fg(state, args).await,
        "bg" => jobs_cmd::handle_bg(state, args),
        "disown" => jobs_cmd::handle_disown(state, args),
        "kill" => jobs_cmd::handle_kill(state, args),
        "exit" => exit_cmd::handle_exit(state, args),
        _ => return None,
    };
    Some(result)
}

/// pwd - print the current directory.
fn handle_pwd(state: &ShellState) -> ExecutionResult {
    output(format!("{}\n", state.cwd.display()))
}

/// echo - print args joined by single spaces, newline-terminated.
fn handle_echo(args: &[String]) -> ExecutionResult {
    output(format!("{}\n", args.join(" ")))
}
