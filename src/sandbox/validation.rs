//! Pre-execution Validation
//!
//! Checks performed on a prepared child process before it starts: command
//! name shape, argument size and traversal patterns, dangerous environment
//! entries, working-directory confinement, and the command whitelist.

use std::path::Path;

use crate::policy::rules::PROTECTED_SYSTEM_PATHS;

use super::types::{CommandMeta, SandboxConfig};

pub const MAX_COMMAND_NAME_BYTES: usize = 64;
pub const MAX_ARG_BYTES: usize = 1024;

const FORBIDDEN_NAME_CHARS: &[char] = &['\0', '\n', '\r', ';', '|', '&', '`', '$'];

/// Substrings no argument may contain (compared case-insensitively so the
/// Windows spellings cannot be cased around).
const TRAVERSAL_PATTERNS: &[&str] = &[
    "../",
    "/etc/",
    "/proc/",
    "/sys/",
    "/dev/",
    "c:\\windows\\",
    "c:\\program files\\",
];

/// Validate everything but the whitelist.
pub fn validate(meta: &CommandMeta) -> Result<(), String> {
    validate_name(meta.name)?;
    for arg in meta.args {
        validate_arg(arg)?;
    }
    validate_env(meta)?;
    validate_cwd(meta.cwd)?;
    Ok(())
}

fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty command name".to_string());
    }
    if name.len() > MAX_COMMAND_NAME_BYTES {
        return Err(format!(
            "command name exceeds {} bytes",
            MAX_COMMAND_NAME_BYTES
        ));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(format!("forbidden character {:?} in command name", c));
    }
    Ok(())
}

fn validate_arg(arg: &str) -> Result<(), String> {
    if arg.len() > MAX_ARG_BYTES {
        return Err(format!("argument exceeds {} bytes", MAX_ARG_BYTES));
    }
    if arg.contains('\0') {
        return Err("NUL byte in argument".to_string());
    }
    let lowered = arg.to_lowercase();
    for pattern in TRAVERSAL_PATTERNS {
        if lowered.contains(pattern) {
            return Err(format!("path traversal pattern '{}' in argument", pattern));
        }
    }
    Ok(())
}

fn validate_env(meta: &CommandMeta) -> Result<(), String> {
    for key in meta.env.keys() {
        if key == "LD_PRELOAD" || key == "LD_LIBRARY_PATH" || key.starts_with("DYLD_") {
            return Err(format!("dangerous environment variable '{}'", key));
        }
    }
    Ok(())
}

fn validate_cwd(cwd: &Path) -> Result<(), String> {
    let absolute = if cwd.is_absolute() {
        cwd.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|base| base.join(cwd))
            .unwrap_or_else(|_| cwd.to_path_buf())
    };
    for protected in PROTECTED_SYSTEM_PATHS {
        if absolute.starts_with(protected) {
            return Err(format!(
                "working directory {} is under protected path {}",
                absolute.display(),
                protected
            ));
        }
    }
    Ok(())
}

/// Whitelist check. The comparison strips a trailing `.exe` and any
/// directory components first, so `C:\tools\git.EXE` and `git` compare
/// equal.
pub fn whitelisted(name: &str, config: &SandboxConfig) -> bool {
    let basename = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name);
    let stripped = basename
        .strip_suffix(".exe")
        .or_else(|| basename.strip_suffix(".EXE"))
        .unwrap_or(basename);
    config.whitelist.contains(stripped)
}
