//! Execution Engine
//!
//! Evaluates a parsed line: conditional chains left to right, threading the
//! exit code through `&&` / `||` / `;` connectors. Skipped pipelines never
//! alter the carried exit code, and the line's exit code is that of the
//! last pipeline actually run.

use crate::ast::{Connector, Line};
use crate::interpreter::errors::ShellError;
use crate::interpreter::expansion::ExpandedCommand;
use crate::interpreter::types::{ExecutionResult, ShellState};
use crate::policy::PolicyEngine;
use crate::sandbox::Supervisor;

/// Everything one `execute()` call needs, borrowed from the facade.
pub struct ExecContext<'a> {
    pub state: &'a mut ShellState,
    pub policy: &'a PolicyEngine,
    pub sandbox: &'a Supervisor,
    /// With safe mode off the policy engine is skipped; sandbox validation
    /// still applies on the external path.
    pub safe_mode: bool,
}

impl ExecContext<'_> {
    /// Policy check applied on every dispatch, builtins included.
    pub(crate) fn authorize(&self, cmd: &ExpandedCommand) -> Result<(), ShellError> {
        if !self.safe_mode {
            return Ok(());
        }
        self.policy.authorize("execute", &cmd.name, &cmd.args)
    }
}

pub async fn run_line(ctx: &mut ExecContext<'_>, line: &Line) -> ExecutionResult {
    let mut output = String::new();
    let mut error = String::new();
    let mut exit_code = 0;

    for chain in &line.chains {
        let mut carried = 0;
        let mut prev: Option<Connector> = None;

        for (pipeline, connector) in &chain.parts {
            let should_run = match prev {
                None | Some(Connector::Seq) | Some(Connector::None) => true,
                Some(Connector::And) => carried == 0,
                Some(Connector::Or) => carried != 0,
            };

            if should_run {
                let result = super::pipeline::run_pipeline(ctx, pipeline).await;
                output.push_str(&result.output);
                error.push_str(&result.error);
                carried = result.exit_code;
                exit_code = result.exit_code;
                ctx.state.last_exit = result.exit_code;
            }

            prev = Some(*connector);
        }
    }

    ExecutionResult::new(output, error, exit_code)
}
