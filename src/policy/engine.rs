//! Policy Engine
//!
//! A reloadable store of named rules checked on every dispatch. Built-in
//! defaults are seeded on construction and on every reload; additional deny
//! rules are synthesized from policy files in the configured directory.
//!
//! A policy file is any `.rego` file; each line matching the idiom
//! `input.command == "NAME"` contributes a deny rule named
//! `<file_basename>_<NAME>`. Files without the idiom contribute nothing but
//! remain listable for introspection.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex_lite::Regex;

use crate::interpreter::errors::ShellError;

use super::rules::{default_rules, PolicyRule, RuleAction};

/// Extension scanned for in the policy directory.
pub const POLICY_EXTENSION: &str = "rego";

lazy_static! {
    static ref COMMAND_IDIOM: Regex =
        Regex::new(r#"input\.command\s*==\s*"([^"]+)""#).expect("static idiom regex");
}

#[derive(Debug)]
pub struct PolicyEngine {
    rules: IndexMap<String, PolicyRule>,
    /// Raw file contents, kept for introspection.
    sources: IndexMap<PathBuf, String>,
    policy_dir: Option<PathBuf>,
    plugin_root: Option<PathBuf>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyEngine {
    /// An engine with only the built-in defaults.
    pub fn new() -> Self {
        let mut engine = Self {
            rules: IndexMap::new(),
            sources: IndexMap::new(),
            policy_dir: None,
            plugin_root: None,
        };
        engine.install_defaults();
        engine
    }

    /// An engine that also ingests rules from `policy_dir`. Scan failures
    /// are logged, not fatal: the defaults always stand.
    pub fn with_policy_dir(policy_dir: PathBuf) -> Self {
        let mut engine = Self::new();
        engine.policy_dir = Some(policy_dir);
        if let Err(e) = engine.reload() {
            tracing::warn!(error = %e, "policy directory scan failed; using defaults only");
        }
        engine
    }

    /// Root directory for per-plugin storage; resources outside it are
    /// denied to plugins.
    pub fn set_plugin_root(&mut self, root: PathBuf) {
        self.plugin_root = Some(root);
    }

    /// Authorize a dispatch. Iterates every rule; the first matching Deny
    /// wins. Allow rules are informational and never override a Deny.
    pub fn authorize(&self, action: &str, command: &str, args: &[String]) -> Result<(), ShellError> {
        self.authorize_in_context(action, command, args, None)
    }

    /// Context-aware variant; rules carrying conditions only apply when the
    /// supplied context matches.
    pub fn authorize_in_context(
        &self,
        action: &str,
        command: &str,
        args: &[String],
        context: Option<&str>,
    ) -> Result<(), ShellError> {
        for rule in self.rules.values() {
            if rule.action != RuleAction::Deny {
                continue;
            }
            if !rule.applies_in_context(context) {
                continue;
            }
            if rule.matches_command(command) && rule.args_match(args) {
                tracing::warn!(
                    action,
                    command,
                    rule = %rule.name,
                    "policy denied command"
                );
                return Err(ShellError::PolicyDenied {
                    command: command.to_string(),
                    rule: rule.name.clone(),
                    description: rule.description.clone(),
                });
            }
        }
        Ok(())
    }

    /// Coarse path-based gate for the plugin host: read/write only under
    /// the plugin's own root.
    pub fn authorize_plugin(
        &self,
        plugin: &str,
        action: &str,
        resource: &str,
    ) -> Result<(), ShellError> {
        let denied = |reason: &str| {
            Err(ShellError::PolicyDenied {
                command: format!("plugin:{}", plugin),
                rule: "plugin_scope".to_string(),
                description: reason.to_string(),
            })
        };

        if !matches!(action, "read" | "write") {
            return denied(&format!("plugin action '{}' is not allowed", action));
        }
        if plugin.is_empty() || plugin.contains(['/', '\\', '.']) {
            return denied("invalid plugin name");
        }

        let Some(root) = &self.plugin_root else {
            return denied("no plugin root configured");
        };
        let path = Path::new(resource);
        if path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
            return denied("path traversal in plugin resource");
        }
        let scope = root.join(plugin);
        if !path.starts_with(&scope) {
            return denied(&format!(
                "resource outside plugin scope {}",
                scope.display()
            ));
        }
        Ok(())
    }

    /// Clear everything, re-seed the defaults, rescan the policy directory.
    /// Returns the number of rules synthesized from files.
    pub fn reload(&mut self) -> io::Result<usize> {
        self.rules.clear();
        self.sources.clear();
        self.install_defaults();

        let Some(dir) = self.policy_dir.clone() else {
            return Ok(0);
        };
        if !dir.exists() {
            return Ok(0);
        }

        let mut synthesized = 0;
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == POLICY_EXTENSION)
                    .unwrap_or(false)
            })
            .collect();
        entries.sort();

        for path in entries {
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable policy file");
                    continue;
                }
            };
            synthesized += self.ingest_file(&path, &content);
            self.sources.insert(path, content);
        }

        tracing::info!(
            rules = self.rules.len(),
            from_files = synthesized,
            "policy rules reloaded"
        );
        Ok(synthesized)
    }

    fn install_defaults(&mut self) {
        for rule in default_rules() {
            self.rules.insert(rule.name.clone(), rule);
        }
    }

    /// Synthesize a deny rule for each `input.command == "NAME"` line.
    fn ingest_file(&mut self, path: &Path, content: &str) -> usize {
        let basename = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "policy".to_string());

        let mut count = 0;
        for caps in COMMAND_IDIOM.captures_iter(content) {
            let Some(command) = caps.get(1) else { continue };
            let command = command.as_str();
            let name = format!("{}_{}", basename, command);
            let rule = PolicyRule::deny(
                name.clone(),
                format!("denied by policy file {}", path.display()),
                &[command],
            );
            self.rules.insert(name, rule);
            count += 1;
        }
        count
    }

    pub fn rules(&self) -> &IndexMap<String, PolicyRule> {
        &self.rules
    }

    pub fn sources(&self) -> &IndexMap<PathBuf, String> {
        &self.sources
    }
}
