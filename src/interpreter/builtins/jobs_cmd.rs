//! jobs / fg / bg / disown / kill - Job-table builtins
//!
//! All of these resolve `%N`, `%name`, `%+`, `%-` references through the
//! job table. A missing reference produces a "no such job" error with exit
//! code 1. `kill` here handles only `%` references; a bare pid goes to the
//! external `kill` through normal dispatch.

use crate::interpreter::types::{failure, output, ExecutionResult, ShellState};
use crate::jobs::JobState;

/// jobs - harvest finished children, list the table, drop reported `Done`
/// entries.
pub fn handle_jobs(state: &mut ShellState) -> ExecutionResult {
    state.jobs.harvest();
    let mut listing = String::new();
    for job in state.jobs.iter() {
        listing.push_str(&format!(
            "[{}]  {:<8} {} (pid {})\n",
            job.id, job.state, job.command, job.pid
        ));
    }
    state.jobs.prune_done();
    output(listing)
}

/// fg [%ref] - wait for a job in the foreground.
pub async fn handle_fg(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let reference = args.first().map(|s| s.as_str()).unwrap_or("%+");
    let id = match state.jobs.resolve(reference) {
        Ok(id) => id,
        Err(e) => return ExecutionResult::from_error(&e),
    };
    let command = state
        .jobs
        .get(id)
        .map(|j| j.command.clone())
        .unwrap_or_default();
    match state.jobs.wait(id).await {
        Ok(exit_code) => ExecutionResult::new(format!("{}\n", command), "", exit_code),
        Err(e) => ExecutionResult::from_error(&e),
    }
}

/// bg [%ref] - resume a stopped job in the background.
pub fn handle_bg(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let reference = args.first().map(|s| s.as_str()).unwrap_or("%+");
    let id = match state.jobs.resolve(reference) {
        Ok(id) => id,
        Err(e) => return ExecutionResult::from_error(&e),
    };
    if let Some(job) = state.jobs.get(id) {
        if job.state == JobState::Running {
            return failure(format!("bg: job {} already running\n", id));
        }
    }
    match state.jobs.resume(id) {
        Ok(()) => {
            let command = state
                .jobs
                .get(id)
                .map(|j| j.command.clone())
                .unwrap_or_default();
            output(format!("[{}] {} &\n", id, command))
        }
        Err(e) => ExecutionResult::from_error(&e),
    }
}

/// disown [%ref] - forget a job without signaling it.
pub fn handle_disown(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let reference = args.first().map(|s| s.as_str()).unwrap_or("%+");
    match state.jobs.resolve(reference) {
        Ok(id) => {
            state.jobs.remove(id);
            ExecutionResult::success()
        }
        Err(e) => ExecutionResult::from_error(&e),
    }
}

/// kill %ref - send termination to a job.
pub fn handle_kill(state: &mut ShellState, args: &[String]) -> ExecutionResult {
    let Some(reference) = args.first() else {
        return failure("kill: usage: kill %job\n");
    };
    let id = match state.jobs.resolve(reference) {
        Ok(id) => id,
        Err(e) => return ExecutionResult::from_error(&e),
    };
    match state.jobs.kill(id) {
        Ok(()) => ExecutionResult::success(),
        Err(e) => ExecutionResult::from_error(&e),
    }
}
