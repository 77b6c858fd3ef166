//! Shell Configuration
//!
//! Every option is an explicit typed field with a default. By default
//! nothing persists (useful for tests and one-shot runs); the binary points
//! the shell at a state directory with `with_state_dir`.

use std::path::{Path, PathBuf};

use crate::history::DEFAULT_MAX_ENTRIES;
use crate::sandbox::SandboxConfig;

#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Enforce the policy engine on every dispatch. With safe mode off the
    /// policy check is skipped; sandbox validation still applies.
    pub safe_mode: bool,
    pub sandbox: SandboxConfig,
    pub history_max_entries: usize,
    pub history_file: Option<PathBuf>,
    /// Exported-variable persistence (JSON map).
    pub export_file: Option<PathBuf>,
    /// Directory scanned for `.rego` policy files.
    pub policy_dir: Option<PathBuf>,
    /// Root for per-plugin storage, enforced by `authorize_plugin`.
    pub plugin_root: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            safe_mode: true,
            sandbox: SandboxConfig::default(),
            history_max_entries: DEFAULT_MAX_ENTRIES,
            history_file: None,
            export_file: None,
            policy_dir: None,
            plugin_root: None,
        }
    }
}

impl ShellConfig {
    /// A configuration whose persistent state lives under `root`.
    pub fn with_state_dir(root: &Path) -> Self {
        Self {
            history_file: Some(root.join("history.jsonl")),
            export_file: Some(root.join("env.json")),
            policy_dir: Some(root.join("policy")),
            plugin_root: Some(root.join("plugins")),
            ..Default::default()
        }
    }
}

/// Default state directory under the platform data dir.
pub fn default_state_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("wardsh"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_safe_and_ephemeral() {
        let config = ShellConfig::default();
        assert!(config.safe_mode);
        assert_eq!(config.history_max_entries, DEFAULT_MAX_ENTRIES);
        assert!(config.history_file.is_none());
        assert!(config.policy_dir.is_none());
    }

    #[test]
    fn test_state_dir_layout() {
        let config = ShellConfig::with_state_dir(Path::new("/state"));
        assert_eq!(config.history_file, Some(PathBuf::from("/state/history.jsonl")));
        assert_eq!(config.export_file, Some(PathBuf::from("/state/env.json")));
        assert_eq!(config.policy_dir, Some(PathBuf::from("/state/policy")));
        assert_eq!(config.plugin_root, Some(PathBuf::from("/state/plugins")));
    }
}
