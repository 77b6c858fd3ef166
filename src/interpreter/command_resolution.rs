//! Command Resolution
//!
//! PATH-based lookup for external commands. On unix the candidate must be a
//! regular file with an executable bit; on Windows the search additionally
//! tries the usual executable extensions. Also provides the unix-to-Windows
//! command suggestions used in unknown-command errors.

use std::path::{Path, PathBuf};

use crate::environment::Environment;
use crate::interpreter::errors::ShellError;

/// Extensions tried on Windows, in order. The empty entry covers names that
/// already carry an extension.
#[cfg(windows)]
const WINDOWS_EXTENSIONS: &[&str] = &["", ".exe", ".com", ".bat", ".cmd", ".ps1"];

#[cfg(windows)]
const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_LIST_SEPARATOR: char = ':';

/// Resolve a command name to an executable path.
///
/// A name containing a path separator is resolved relative to the working
/// directory; anything else is searched on PATH.
pub fn resolve_executable(name: &str, env: &Environment, cwd: &Path) -> Option<PathBuf> {
    if name.contains('/') || (cfg!(windows) && name.contains('\\')) {
        let candidate = if Path::new(name).is_absolute() {
            PathBuf::from(name)
        } else {
            cwd.join(name)
        };
        return executable_candidate(candidate);
    }

    let path_env = env.get("PATH").unwrap_or_default();
    for dir in path_env.split(PATH_LIST_SEPARATOR).filter(|d| !d.is_empty()) {
        if let Some(found) = resolve_in_dir(Path::new(dir), name) {
            return Some(found);
        }
    }
    None
}

#[cfg(not(windows))]
fn resolve_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    executable_candidate(dir.join(name))
}

#[cfg(windows)]
fn resolve_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    for ext in WINDOWS_EXTENSIONS {
        let candidate = dir.join(format!("{}{}", name, ext));
        if let Some(found) = executable_candidate(candidate) {
            return Some(found);
        }
    }
    None
}

#[cfg(not(windows))]
fn executable_candidate(path: PathBuf) -> Option<PathBuf> {
    use std::os::unix::fs::PermissionsExt;
    let meta = std::fs::metadata(&path).ok()?;
    if meta.is_file() && meta.permissions().mode() & 0o111 != 0 {
        Some(path)
    } else {
        None
    }
}

#[cfg(windows)]
fn executable_candidate(path: PathBuf) -> Option<PathBuf> {
    let meta = std::fs::metadata(&path).ok()?;
    if meta.is_file() {
        Some(path)
    } else {
        None
    }
}

/// Common unix commands and their Windows equivalents, suggested when an
/// unknown command looks like a unix habit.
const WINDOWS_EQUIVALENTS: &[(&str, &str)] = &[
    ("ls", "dir"),
    ("cat", "type"),
    ("grep", "findstr"),
    ("rm", "del"),
    ("cp", "copy"),
    ("mv", "move"),
    ("ps", "tasklist"),
    ("which", "where"),
    ("clear", "cls"),
    ("man", "help"),
];

pub fn windows_equivalent(name: &str) -> Option<&'static str> {
    WINDOWS_EQUIVALENTS
        .iter()
        .find(|(unix, _)| *unix == name)
        .map(|(_, win)| *win)
}

/// Build the unknown-command error, including the Windows suggestion when
/// one applies on this platform.
pub fn unknown_command(name: &str) -> ShellError {
    let suggestion = if cfg!(windows) {
        windows_equivalent(name).map(|s| s.to_string())
    } else {
        None
    };
    ShellError::UnknownCommand {
        name: name.to_string(),
        suggestion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_equivalents() {
        assert_eq!(windows_equivalent("ls"), Some("dir"));
        assert_eq!(windows_equivalent("cat"), Some("type"));
        assert_eq!(windows_equivalent("grep"), Some("findstr"));
        assert_eq!(windows_equivalent("cargo"), None);
    }

    #[cfg(unix)]
    mod unix {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        #[test]
        fn test_resolves_from_path() {
            let dir = tempfile::tempdir().unwrap();
            let exe = dir.path().join("mytool");
            std::fs::write(&exe, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

            let mut env = Environment::new();
            env.set_local("PATH", dir.path().to_string_lossy().to_string());
            let found = resolve_executable("mytool", &env, Path::new("/"));
            assert_eq!(found, Some(exe));
        }

        #[test]
        fn test_non_executable_file_skipped() {
            let dir = tempfile::tempdir().unwrap();
            let exe = dir.path().join("notexec");
            std::fs::write(&exe, "data").unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o644)).unwrap();

            let mut env = Environment::new();
            env.set_local("PATH", dir.path().to_string_lossy().to_string());
            assert_eq!(resolve_executable("notexec", &env, Path::new("/")), None);
        }

        #[test]
        fn test_path_order_respected() {
            let first = tempfile::tempdir().unwrap();
            let second = tempfile::tempdir().unwrap();
            for d in [&first, &second] {
                let exe = d.path().join("tool");
                std::fs::write(&exe, "#!/bin/sh\n").unwrap();
                std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
            }

            let mut env = Environment::new();
            env.set_local(
                "PATH",
                format!(
                    "{}:{}",
                    first.path().to_string_lossy(),
                    second.path().to_string_lossy()
                ),
            );
            let found = resolve_executable("tool", &env, Path::new("/")).unwrap();
            assert!(found.starts_with(first.path()));
        }

        #[test]
        fn test_explicit_path_bypasses_search() {
            let dir = tempfile::tempdir().unwrap();
            let exe = dir.path().join("run.sh");
            std::fs::write(&exe, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

            let env = Environment::new();
            let name = exe.to_string_lossy().to_string();
            assert_eq!(resolve_executable(&name, &env, Path::new("/")), Some(exe));
        }

        #[test]
        fn test_relative_path_resolved_against_cwd() {
            let dir = tempfile::tempdir().unwrap();
            let exe = dir.path().join("local.sh");
            std::fs::write(&exe, "#!/bin/sh\n").unwrap();
            std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

            let env = Environment::new();
            assert_eq!(
                resolve_executable("./local.sh", &env, dir.path()),
                Some(dir.path().join("./local.sh"))
            );
        }
    }

    #[test]
    fn test_missing_command_resolves_to_none() {
        let mut env = Environment::new();
        env.set_local("PATH", "/nonexistent-dir-for-tests");
        assert_eq!(
            resolve_executable("definitely-not-a-command", &env, Path::new("/")),
            None
        );
    }

    #[test]
    fn test_unknown_command_error_code() {
        let err = unknown_command("frobnicate");
        assert_eq!(err.exit_code(), 127);
    }
}
