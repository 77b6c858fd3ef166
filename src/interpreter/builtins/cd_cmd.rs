//! cd - Change directory builtin
//!
//! Supports:
//! - cd [dir] - change to directory
//! - cd - change to the home directory
//! - cd - - change to the previous directory and print it
//!
//! Quoted paths, including Windows paths with spaces, arrive here already
//! quote-stripped by the lexer.

use std::path::{Component, Path, PathBuf};

use crate::interpreter::types::{failure, output, ExecutionResult, ShellState};

pub fn handle_cd(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let mut print_path = false;
    let target: PathBuf = match args.first().map(|s| s.as_str()) {
        None | Some("~") => state.home(),
        Some("-") => {
            print_path = true;
            state.previous_dir.clone()
        }
        Some(path) => PathBuf::from(path),
    };

    let resolved = if target.is_absolute() {
        normalize_path(&target)
    } else {
        normalize_path(&state.cwd.join(&target))
    };

    match std::fs::metadata(&resolved) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return failure(format!("cd: {}: Not a directory\n", target.display()));
        }
        Err(_) => {
            return failure(format!(
                "cd: {}: No such file or directory\n",
                target.display()
            ));
        }
    }

    state.previous_dir = state.cwd.clone();
    state.cwd = resolved.clone();
    state
        .env
        .set_local("PWD", resolved.to_string_lossy().into_owned());
    state.env.set_local(
        "OLDPWD",
        state.previous_dir.to_string_lossy().into_owned(),
    );

    if print_path {
        output(format!("{}\n", resolved.display()))
    } else {
        ExecutionResult::success()
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(parts.last(), Some(Component::Normal(_))) {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }
    let mut out = PathBuf::new();
    for part in parts {
        out.push(part.as_os_str());
    }
    if out.as_os_str().is_empty() {
        PathBuf::from("/")
    } else {
        out
    }
}
