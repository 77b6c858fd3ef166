//! Environment Store
//!
//! Holds the shell's variable scopes and the alias table:
//! - shell-local variables (`set NAME value`)
//! - exported variables, visible to child processes and persisted as a
//!   JSON map across sessions
//! - aliases, in definition order
//!
//! Lookup order during `$NAME` expansion: shell-local, then exported, then
//! the real process environment.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    exported: HashMap<String, String>,
    aliases: IndexMap<String, String>,
    export_file: Option<PathBuf>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an environment whose exported variables persist to `path`.
    /// Existing contents are loaded; a missing or malformed file is treated
    /// as empty.
    pub fn with_export_file(path: PathBuf) -> Self {
        let exported = fs::read_to_string(&path)
            .ok()
            .and_then(|text| serde_json::from_str::<HashMap<String, String>>(&text).ok())
            .unwrap_or_default();
        Self {
            vars: HashMap::new(),
            exported,
            aliases: IndexMap::new(),
            export_file: Some(path),
        }
    }

    /// Resolve a variable: shell-local, then exported, then process env.
    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(v) = self.vars.get(name) {
            return Some(v.clone());
        }
        if let Some(v) = self.exported.get(name) {
            return Some(v.clone());
        }
        std::env::var(name).ok()
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn local(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(|s| s.as_str())
    }

    pub fn set_exported(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.exported.insert(name.into(), value.into());
        self.save_exports();
    }

    pub fn exported(&self) -> &HashMap<String, String> {
        &self.exported
    }

    /// Environment handed to child processes: the process environment plus
    /// shell-local plus exported variables, exported winning collisions.
    pub fn child_env(&self) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        for (k, v) in &self.vars {
            env.insert(k.clone(), v.clone());
        }
        for (k, v) in &self.exported {
            env.insert(k.clone(), v.clone());
        }
        env
    }

    // -------------------------------------------------------------------
    // Aliases
    // -------------------------------------------------------------------

    pub fn alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(|s| s.as_str())
    }

    pub fn set_alias(&mut self, name: impl Into<String>, replacement: impl Into<String>) {
        self.aliases.insert(name.into(), replacement.into());
    }

    /// Remove an alias; returns false when no such alias exists.
    pub fn remove_alias(&mut self, name: &str) -> bool {
        self.aliases.shift_remove(name).is_some()
    }

    pub fn aliases(&self) -> &IndexMap<String, String> {
        &self.aliases
    }

    fn save_exports(&self) {
        let Some(path) = &self.export_file else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.exported) {
            Ok(text) => {
                if let Err(e) = fs::write(path, text) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to persist exported variables");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize exported variables");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order_local_first() {
        let mut env = Environment::new();
        env.set_exported("NAME", "exported");
        env.set_local("NAME", "local");
        assert_eq!(env.get("NAME").as_deref(), Some("local"));
    }

    #[test]
    fn test_exported_before_process_env() {
        let mut env = Environment::new();
        env.set_exported("PATH", "/custom/bin");
        assert_eq!(env.get("PATH").as_deref(), Some("/custom/bin"));
    }

    #[test]
    fn test_process_env_fallback() {
        let env = Environment::new();
        // PATH is present in any reasonable test environment.
        assert!(env.get("PATH").is_some());
        assert_eq!(env.get("WARDSH_DEFINITELY_UNSET_VAR"), None);
    }

    #[test]
    fn test_child_env_exported_wins() {
        let mut env = Environment::new();
        env.set_local("BOTH", "local");
        env.set_exported("BOTH", "exported");
        let child = env.child_env();
        assert_eq!(child.get("BOTH").map(|s| s.as_str()), Some("exported"));
    }

    #[test]
    fn test_child_env_includes_local() {
        let mut env = Environment::new();
        env.set_local("ONLY_LOCAL", "yes");
        assert_eq!(
            env.child_env().get("ONLY_LOCAL").map(|s| s.as_str()),
            Some("yes")
        );
    }

    #[test]
    fn test_alias_roundtrip() {
        let mut env = Environment::new();
        env.set_alias("ll", "ls -la");
        assert_eq!(env.alias("ll"), Some("ls -la"));
        assert!(env.remove_alias("ll"));
        assert!(!env.remove_alias("ll"));
        assert_eq!(env.alias("ll"), None);
    }

    #[test]
    fn test_aliases_keep_definition_order() {
        let mut env = Environment::new();
        env.set_alias("zz", "1");
        env.set_alias("aa", "2");
        let names: Vec<&String> = env.aliases().keys().collect();
        assert_eq!(names, vec!["zz", "aa"]);
    }

    #[test]
    fn test_export_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.json");
        {
            let mut env = Environment::with_export_file(path.clone());
            env.set_exported("SAVED", "value");
        }
        let env = Environment::with_export_file(path);
        assert_eq!(env.get("SAVED").as_deref(), Some("value"));
    }

    #[test]
    fn test_export_file_malformed_treated_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("env.json");
        fs::write(&path, "not json at all").unwrap();
        let env = Environment::with_export_file(path);
        assert!(env.exported().is_empty());
    }
}
