//! Policy Rules
//!
//! A rule names an Allow or Deny assertion over (command, args). Matching:
//! - the command must appear in the rule's command list
//! - with arg patterns present, some argument must start with some pattern;
//!   the single pattern `/` compares exactly (prefix-matching it would
//!   over-match every absolute path)
//! - a rule with conditions only applies when the caller supplies a
//!   matching context
//!
//! When rules overlap, Deny wins.

use serde::Serialize;

/// Directories no default rule lets destructive commands touch.
pub const PROTECTED_SYSTEM_PATHS: &[&str] =
    &["/etc", "/usr", "/var", "/sys", "/proc", "/boot", "/root"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuleAction {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyRule {
    pub name: String,
    pub description: String,
    pub action: RuleAction,
    pub commands: Vec<String>,
    pub arg_patterns: Vec<String>,
    /// `context == "NAME"` atoms; empty means the rule always applies.
    pub conditions: Vec<String>,
}

impl PolicyRule {
    pub fn deny(
        name: impl Into<String>,
        description: impl Into<String>,
        commands: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            action: RuleAction::Deny,
            commands: commands.iter().map(|c| c.to_string()).collect(),
            arg_patterns: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn with_arg_patterns(mut self, patterns: &[&str]) -> Self {
        self.arg_patterns = patterns.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn matches_command(&self, command: &str) -> bool {
        self.commands.iter().any(|c| c == command)
    }

    /// With no patterns the rule matches any argument list. The pattern `/`
    /// requires an argument equal to `/`; every other pattern is a prefix.
    pub fn args_match(&self, args: &[String]) -> bool {
        if self.arg_patterns.is_empty() {
            return true;
        }
        args.iter().any(|arg| {
            self.arg_patterns.iter().any(|pattern| {
                if pattern == "/" {
                    arg == "/"
                } else {
                    arg.starts_with(pattern.as_str())
                }
            })
        })
    }

    /// Conditions gate a rule on the caller-supplied context.
    pub fn applies_in_context(&self, context: Option<&str>) -> bool {
        if self.conditions.is_empty() {
            return true;
        }
        let Some(context) = context else {
            return false;
        };
        self.conditions.iter().all(|cond| {
            parse_context_condition(cond)
                .map(|expected| expected == context)
                .unwrap_or(false)
        })
    }
}

/// Parse a `context == "NAME"` atom; anything else fails the condition.
fn parse_context_condition(cond: &str) -> Option<&str> {
    let rest = cond.trim().strip_prefix("context")?.trim_start();
    let rest = rest.strip_prefix("==")?.trim();
    rest.strip_prefix('"')?.strip_suffix('"')
}

/// Rules installed on first run and re-seeded on every reload. These are
/// the security-posture baseline.
pub fn default_rules() -> Vec<PolicyRule> {
    vec![
        PolicyRule::deny(
            "block_destructive_commands",
            "destructive or privilege-escalating commands are not allowed",
            &["dd", "mkfs", "fdisk", "format", "sudo", "su"],
        ),
        PolicyRule::deny(
            "protect_system_paths_rm",
            "rm may not target system directories",
            &["rm"],
        )
        .with_arg_patterns(PROTECTED_SYSTEM_PATHS),
        PolicyRule::deny(
            "block_root_wipe",
            "removing the filesystem root is not allowed",
            &["rm", "rmdir"],
        )
        .with_arg_patterns(&["/"]),
        PolicyRule::deny(
            "protect_system_dirs",
            "modifying protected system directories is not allowed",
            &["rm", "rmdir", "chmod", "chown"],
        )
        .with_arg_patterns(PROTECTED_SYSTEM_PATHS),
    ]
}
