//! Shell Facade
//!
//! Owns the working directory, environment, aliases, policy engine,
//! sandbox supervisor, history, and job table, and exposes
//! `execute(line) -> ExecutionResult`.
//!
//! `execute` never unwinds: lexer, parser, policy, sandbox, and IO errors
//! are all materialized into a result with a non-zero exit code, so a bad
//! command never kills the session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use tokio::sync::Notify;

use crate::config::ShellConfig;
use crate::environment::Environment;
use crate::history::HistoryStore;
use crate::interpreter::builtins::BUILTIN_NAMES;
use crate::interpreter::engine::{self, ExecContext};
use crate::interpreter::types::{ExecutionResult, ShellState};
use crate::parser::{expand_aliases, parse, tokenize};
use crate::policy::PolicyEngine;
use crate::sandbox::Supervisor;

/// Options for creating a shell.
#[derive(Default)]
pub struct ShellOptions {
    /// Initial working directory; defaults to the process working
    /// directory.
    pub cwd: Option<PathBuf>,
    pub config: ShellConfig,
}

pub struct Shell {
    state: ShellState,
    policy: PolicyEngine,
    sandbox: Supervisor,
    config: ShellConfig,
}

impl Shell {
    pub fn new(options: ShellOptions) -> Self {
        let config = options.config;

        let cwd = options
            .cwd
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("/"));

        let env = match &config.export_file {
            Some(path) => Environment::with_export_file(path.clone()),
            None => Environment::new(),
        };
        let history = match &config.history_file {
            Some(path) => HistoryStore::with_file(path.clone(), config.history_max_entries),
            None => HistoryStore::new(config.history_max_entries),
        };
        let mut policy = match &config.policy_dir {
            Some(dir) => PolicyEngine::with_policy_dir(dir.clone()),
            None => PolicyEngine::new(),
        };
        if let Some(root) = &config.plugin_root {
            policy.set_plugin_root(root.clone());
        }
        let sandbox = Supervisor::new(config.sandbox.clone());

        Self {
            state: ShellState::new(cwd, env, history),
            policy,
            sandbox,
            config,
        }
    }

    /// Execute one input line. Every outcome, including failures, comes
    /// back as an `ExecutionResult` with a strictly positive duration.
    pub async fn execute(&mut self, line: &str) -> ExecutionResult {
        let start = Instant::now();

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ExecutionResult::success().with_duration(start.elapsed());
        }
        self.state.history.add(trimmed);

        let result = self.run(line).await;
        result.with_duration(start.elapsed())
    }

    async fn run(&mut self, line: &str) -> ExecutionResult {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(e) => return ExecutionResult::from_error(&e.into()),
        };
        let tokens = match expand_aliases(tokens, self.state.env.aliases()) {
            Ok(tokens) => tokens,
            Err(e) => return ExecutionResult::from_error(&e.into()),
        };
        let parsed = match parse(tokens) {
            Ok(line) => line,
            Err(e) => return ExecutionResult::from_error(&e.into()),
        };

        let mut ctx = ExecContext {
            state: &mut self.state,
            policy: &self.policy,
            sandbox: &self.sandbox,
            safe_mode: self.config.safe_mode,
        };
        engine::run_line(&mut ctx, &parsed).await
    }

    /// Set when the `exit` builtin ran; the front end terminates the
    /// session once the current line has finished.
    pub fn exit_requested(&self) -> Option<i32> {
        self.state.exit_request
    }

    /// Re-seed defaults and rescan the policy directory.
    pub fn reload_policy(&mut self) -> std::io::Result<usize> {
        self.policy.reload()
    }

    /// Cancellation handle for the invocation in flight (UI layer).
    pub fn cancel_handle(&self) -> Arc<Notify> {
        self.sandbox.cancel_handle()
    }

    // -------------------------------------------------------------------
    // Introspection for the completion and suggestion collaborators
    // -------------------------------------------------------------------

    pub fn cwd(&self) -> &Path {
        &self.state.cwd
    }

    pub fn history(&self) -> &HistoryStore {
        &self.state.history
    }

    pub fn aliases(&self) -> &IndexMap<String, String> {
        self.state.env.aliases()
    }

    pub fn exported_names(&self) -> Vec<String> {
        self.state.env.exported().keys().cloned().collect()
    }

    pub fn builtin_names() -> &'static [&'static str] {
        BUILTIN_NAMES
    }

    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shell() -> Shell {
        // A neutral working directory; the sandbox refuses to run under
        // protected paths, and test runners may start anywhere.
        Shell::new(ShellOptions {
            cwd: Some(std::env::temp_dir()),
            config: ShellConfig::default(),
        })
    }

    #[tokio::test]
    async fn test_empty_line_is_success() {
        let mut sh = shell();
        for input in ["", "   ", "\t"] {
            let r = sh.execute(input).await;
            assert_eq!(r.exit_code, 0);
            assert_eq!(r.output, "");
            assert_eq!(r.error, "");
        }
    }

    #[tokio::test]
    async fn test_duration_strictly_positive() {
        let mut sh = shell();
        for input in ["", "echo hi", "not-a-real-command-xyz", "echo 'oops"] {
            let r = sh.execute(input).await;
            assert!(r.duration > Duration::ZERO, "{:?}", input);
        }
    }

    #[tokio::test]
    async fn test_and_chain_runs_both() {
        let mut sh = shell();
        let r = sh.execute("echo hello && echo world").await;
        assert!(r.output.contains("hello"));
        assert!(r.output.contains("world"));
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn test_or_chain_runs_fallback() {
        let mut sh = shell();
        let r = sh.execute("exit 1 || echo backup").await;
        assert!(r.output.contains("backup"));
        assert_eq!(r.exit_code, 0);
        assert_eq!(sh.exit_requested(), Some(1));
    }

    #[tokio::test]
    async fn test_mixed_chain_short_circuits() {
        let mut sh = shell();
        let r = sh
            .execute("echo step1 && echo step2 || echo should_not_run; echo final")
            .await;
        assert!(r.output.contains("step1"));
        assert!(r.output.contains("step2"));
        assert!(r.output.contains("final"));
        assert!(!r.output.contains("should_not_run"));
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn test_variable_set_and_expand() {
        let mut sh = shell();
        assert_eq!(sh.execute("set TEST hello").await.exit_code, 0);
        let r = sh.execute("echo $TEST").await;
        assert_eq!(r.output, "hello\n");
        assert_eq!(r.exit_code, 0);

        let r = sh.execute("echo $UNDEFINED").await;
        assert_eq!(r.output, "\n");
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn test_set_equals_form_equivalent() {
        let mut sh = shell();
        sh.execute("set A hello").await;
        sh.execute("set B=hello").await;
        let a = sh.execute("echo $A").await;
        let b = sh.execute("echo $B").await;
        assert_eq!(a.output, b.output);
    }

    #[tokio::test]
    async fn test_single_quotes_block_expansion() {
        let mut sh = shell();
        sh.execute("set TEST hello").await;
        let r = sh.execute("echo '$TEST'").await;
        assert_eq!(r.output, "$TEST\n");
        let r = sh.execute("echo \"$TEST\"").await;
        assert_eq!(r.output, "hello\n");
    }

    #[tokio::test]
    async fn test_rm_root_denied_by_policy() {
        let mut sh = shell();
        let r = sh.execute("rm -rf /").await;
        assert_ne!(r.exit_code, 0);
        assert!(
            r.error.contains("block_root_wipe") || r.error.contains("protect_system"),
            "{}",
            r.error
        );
    }

    #[tokio::test]
    async fn test_alias_define_and_unalias_suggestion() {
        let mut sh = shell();
        let r = sh.execute("alias g='git status'").await;
        assert_eq!(r.exit_code, 0);
        let r = sh.execute("unalias g.").await;
        assert_eq!(r.exit_code, 1);
        assert!(r.error.contains("did you mean 'g'?"), "{}", r.error);
    }

    #[tokio::test]
    async fn test_alias_expansion_applies() {
        let mut sh = shell();
        sh.execute("alias greet='echo hi'").await;
        let r = sh.execute("greet there").await;
        assert_eq!(r.output, "hi there\n");
    }

    #[tokio::test]
    async fn test_unalias_restores_listing() {
        let mut sh = shell();
        sh.execute("alias x='echo 1'").await;
        sh.execute("unalias x").await;
        let r = sh.execute("alias").await;
        assert!(!r.output.contains("x="));
        assert!(sh.aliases().is_empty());
    }

    #[tokio::test]
    async fn test_unterminated_quote_is_parse_error() {
        let mut sh = shell();
        let r = sh.execute("echo 'oops").await;
        assert_eq!(r.exit_code, 2);
        assert!(r.error.contains("unterminated quote"));
    }

    #[tokio::test]
    async fn test_dangling_operator_is_parse_error() {
        let mut sh = shell();
        let r = sh.execute("echo hi &&").await;
        assert_eq!(r.exit_code, 2);
    }

    #[tokio::test]
    async fn test_double_semicolon_tolerated() {
        let mut sh = shell();
        let r = sh.execute("echo a ;; echo b").await;
        assert_eq!(r.exit_code, 0);
        assert!(r.output.contains('a'));
        assert!(r.output.contains('b'));
    }

    #[tokio::test]
    async fn test_history_records_lines() {
        let mut sh = shell();
        sh.execute("echo one").await;
        sh.execute("echo two").await;
        let r = sh.execute("history").await;
        assert!(r.output.contains("echo one"));
        assert!(r.output.contains("echo two"));
        assert_eq!(sh.history().len(), 3);
    }

    #[tokio::test]
    async fn test_exit_code_is_last_pipeline_run() {
        let mut sh = shell();
        let r = sh.execute("exit 3; echo done").await;
        assert_eq!(r.exit_code, 0);
        let r = sh.execute("echo first; exit 5").await;
        assert_eq!(r.exit_code, 5);
    }

    #[tokio::test]
    async fn test_cd_and_pwd() {
        let dir = tempfile::tempdir().unwrap();
        let mut sh = shell();
        let path = dir.path().to_string_lossy().to_string();
        let r = sh.execute(&format!("cd {}", path)).await;
        assert_eq!(r.exit_code, 0);
        let r = sh.execute("pwd").await;
        assert_eq!(r.output.trim(), path);
    }

    #[tokio::test]
    async fn test_cd_failure_does_not_kill_session() {
        let mut sh = shell();
        let r = sh.execute("cd /definitely/not/a/dir").await;
        assert_eq!(r.exit_code, 1);
        let r = sh.execute("echo alive").await;
        assert_eq!(r.output, "alive\n");
    }

    #[tokio::test]
    async fn test_jobs_builtin_empty() {
        let mut sh = shell();
        let r = sh.execute("jobs").await;
        assert_eq!(r.exit_code, 0);
        assert_eq!(r.output, "");
    }

    #[tokio::test]
    async fn test_no_such_job_reference() {
        let mut sh = shell();
        let r = sh.execute("fg %4").await;
        assert_eq!(r.exit_code, 1);
        assert!(r.error.contains("no such job"));
    }

    #[tokio::test]
    async fn test_introspection_surface() {
        let mut sh = shell();
        sh.execute("alias ll='ls -la'").await;
        sh.execute("export MARKER=1").await;
        assert!(Shell::builtin_names().contains(&"cd"));
        assert!(sh.aliases().contains_key("ll"));
        assert!(sh.exported_names().contains(&"MARKER".to_string()));
        assert!(!sh.history().search("alias", 5).is_empty());
    }

    #[tokio::test]
    async fn test_policy_reload_preserves_behavior() {
        let mut sh = shell();
        let before = sh.execute("rm -rf /").await;
        sh.reload_policy().unwrap();
        let after = sh.execute("rm -rf /").await;
        assert_eq!(before.exit_code, after.exit_code);
        assert_eq!(before.error, after.error);
    }

    #[tokio::test]
    async fn test_persistent_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = ShellConfig::with_state_dir(dir.path());
        {
            let mut sh = Shell::new(ShellOptions {
                cwd: None,
                config: config.clone(),
            });
            sh.execute("export KEEP=me").await;
            sh.execute("echo persisted").await;
        }
        let sh = Shell::new(ShellOptions { cwd: None, config });
        assert!(sh.exported_names().contains(&"KEEP".to_string()));
        assert!(sh.history().iter().any(|e| e.command == "echo persisted"));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        #[tokio::test]
        async fn test_pipeline_end_to_end() {
            let mut sh = shell();
            let r = sh.execute("echo pipeline | cat").await;
            assert_eq!(r.output, "pipeline\n");
            assert_eq!(r.exit_code, 0);
        }

        #[tokio::test]
        async fn test_exported_variable_reaches_child() {
            let mut sh = shell();
            sh.execute("export WARDSH_E2E_MARKER=present").await;
            let r = sh.execute("env | grep WARDSH_E2E_MARKER").await;
            assert!(r.output.contains("present"));
        }

        #[tokio::test]
        async fn test_chain_with_external_exit_codes() {
            let mut sh = shell();
            let r = sh.execute("false || echo rescued").await;
            assert_eq!(r.output, "rescued\n");
            assert_eq!(r.exit_code, 0);

            let r = sh.execute("false && echo never").await;
            assert!(!r.output.contains("never"));
            assert_eq!(r.exit_code, 1);
        }
    }
}
