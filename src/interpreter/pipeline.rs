//! Pipeline Execution
//!
//! Runs one pipeline's stages. Builtin stages run inline on the captured
//! output of the previous stage; runs of consecutive external stages are
//! spawned together and wired stdout-to-stdin with relay tasks, so external
//! stages execute concurrently. Redirects on a stage override the pipe
//! wiring on that side. The pipeline's exit code is the last stage's.
//!
//! A trailing `&` backgrounds the pipeline: every stage dispatches as an
//! external command, nothing is supervised, and the job table takes
//! ownership of the children.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};

use crate::ast::{Pipeline, RedirectKind};
use crate::interpreter::builtins;
use crate::interpreter::command_resolution::{resolve_executable, unknown_command};
use crate::interpreter::engine::ExecContext;
use crate::interpreter::errors::ShellError;
use crate::interpreter::expansion::{expand_command, ExpandedCommand};
use crate::interpreter::types::{output, ExecutionResult};
use crate::sandbox::types::CommandMeta;

pub async fn run_pipeline(ctx: &mut ExecContext<'_>, pipeline: &Pipeline) -> ExecutionResult {
    let start = Instant::now();
    let cmds: Vec<ExpandedCommand> = pipeline
        .commands
        .iter()
        .map(|c| expand_command(c, ctx.state))
        .collect();

    let result = if pipeline.background {
        launch_background(ctx, &cmds)
    } else {
        run_foreground(ctx, &cmds).await
    };

    let result = match result {
        Ok(res) => res.with_duration(start.elapsed()),
        Err(e) => ExecutionResult::from_error(&e).with_duration(start.elapsed()),
    };
    let head = cmds.first().map(|c| c.name.as_str()).unwrap_or("");
    tracing::debug!(
        cmd = %head,
        stages = cmds.len(),
        exit_code = result.exit_code,
        duration_ms = result.duration.as_millis() as u64,
        "pipeline finished"
    );
    result
}

async fn run_foreground(
    ctx: &mut ExecContext<'_>,
    cmds: &[ExpandedCommand],
) -> Result<ExecutionResult, ShellError> {
    let mut stderr_acc = String::new();
    let mut exit_code = 0;
    // Captured stdout of the previous stage, fed to the next one.
    let mut carry: Option<String> = None;

    let mut i = 0;
    while i < cmds.len() {
        if is_builtin_stage(&cmds[i]) {
            ctx.authorize(&cmds[i])?;
            let result = run_builtin_stage(ctx, &cmds[i]).await?;
            stderr_acc.push_str(&result.error);
            exit_code = result.exit_code;
            carry = Some(result.output);
            i += 1;
        } else {
            let mut j = i + 1;
            while j < cmds.len() && !is_builtin_stage(&cmds[j]) {
                j += 1;
            }
            let segment = run_external_segment(ctx, &cmds[i..j], carry.take()).await?;
            stderr_acc.push_str(&segment.stderr);
            exit_code = segment.exit_codes.last().copied().unwrap_or(0);
            carry = Some(segment.stdout);
            i = j;
        }
    }

    Ok(ExecutionResult::new(
        carry.unwrap_or_default(),
        stderr_acc,
        exit_code,
    ))
}

/// Builtins handle `%` job references in `kill`; a bare pid is the
/// external `kill`.
fn is_builtin_stage(cmd: &ExpandedCommand) -> bool {
    if !builtins::is_builtin(&cmd.name) {
        return false;
    }
    if cmd.name == "kill" {
        return cmd.args.first().map(|a| a.starts_with('%')).unwrap_or(true);
    }
    true
}

async fn run_builtin_stage(
    ctx: &mut ExecContext<'_>,
    cmd: &ExpandedCommand,
) -> Result<ExecutionResult, ShellError> {
    let start = Instant::now();
    let mut result = match builtins::dispatch(&cmd.name, &cmd.args, ctx.state).await {
        Some(result) => result,
        None => return Err(unknown_command(&cmd.name)),
    };

    // Builtin output honors redirections by writing the captured strings.
    if let Some(target) = cmd.redirects.get(&RedirectKind::Stdout) {
        std::fs::write(resolve_target(ctx, target), &result.output)?;
        result.output.clear();
    } else if let Some(target) = cmd.redirects.get(&RedirectKind::Append) {
        use std::io::Write;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(resolve_target(ctx, target))?;
        file.write_all(result.output.as_bytes())?;
        result.output.clear();
    }
    if let Some(target) = cmd.redirects.get(&RedirectKind::Stderr) {
        std::fs::write(resolve_target(ctx, target), &result.error)?;
        result.error.clear();
    }

    Ok(result.with_duration(start.elapsed()))
}

struct SegmentOutput {
    exit_codes: Vec<i32>,
    stdout: String,
    stderr: String,
}

/// Spawn a run of external stages together, wire the pipes, and supervise
/// every stage under its own deadline.
async fn run_external_segment(
    ctx: &mut ExecContext<'_>,
    cmds: &[ExpandedCommand],
    stdin_data: Option<String>,
) -> Result<SegmentOutput, ShellError> {
    let n = cmds.len();
    let mut children: Vec<Child> = Vec::with_capacity(n);

    for (k, cmd) in cmds.iter().enumerate() {
        ctx.authorize(cmd)?;
        let wiring = StageWiring {
            first: k == 0,
            last: k == n - 1,
            capture_last: true,
            has_stdin_data: stdin_data.is_some(),
            prev_out_redirected: k > 0 && stdout_redirected(&cmds[k - 1]),
            next_in_redirected: k + 1 < n
                && cmds[k + 1].redirects.contains_key(&RedirectKind::Stdin),
        };
        children.push(spawn_stage(ctx, cmd, wiring)?);
    }

    // Feed captured output from a preceding builtin stage into the first
    // child, then close the pipe to signal EOF.
    if let Some(data) = stdin_data {
        if let Some(mut stdin) = children[0].stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(data.as_bytes()).await;
            });
        }
    }

    // Relay tasks copy stdout of stage k into stdin of stage k + 1.
    for k in 0..n.saturating_sub(1) {
        let reader = children[k].stdout.take();
        let writer = children[k + 1].stdin.take();
        if let (Some(mut reader), Some(mut writer)) = (reader, writer) {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    }

    let mut handles = Vec::with_capacity(n);
    for child in children {
        let supervisor = ctx.sandbox.clone();
        handles.push(tokio::spawn(async move { supervisor.supervise(child).await }));
    }

    let timeout_secs = ctx.sandbox.config().timeout.as_secs();
    let mut exit_codes = Vec::with_capacity(n);
    let mut stdout = String::new();
    let mut stderr = String::new();

    for (k, handle) in handles.into_iter().enumerate() {
        let supervised = handle
            .await
            .map_err(|e| ShellError::Io(std::io::Error::other(e)))??;
        stderr.push_str(&supervised.stderr);
        if supervised.timed_out {
            let err = ShellError::Timeout {
                command: cmds[k].name.clone(),
                seconds: timeout_secs,
            };
            stderr.push_str(&format!("wardsh: {}\n", err));
        }
        if k == n - 1 {
            stdout = supervised.stdout;
        }
        tracing::debug!(
            cmd = %cmds[k].name,
            exit_code = supervised.exit_code,
            timed_out = supervised.timed_out,
            "external stage finished"
        );
        exit_codes.push(supervised.exit_code);
    }

    Ok(SegmentOutput {
        exit_codes,
        stdout,
        stderr,
    })
}

/// Spawn the whole pipeline detached and register it as a job.
fn launch_background(
    ctx: &mut ExecContext<'_>,
    cmds: &[ExpandedCommand],
) -> Result<ExecutionResult, ShellError> {
    if cmds.is_empty() {
        return Ok(ExecutionResult::success());
    }
    let n = cmds.len();
    let mut children: Vec<Child> = Vec::with_capacity(n);

    for (k, cmd) in cmds.iter().enumerate() {
        ctx.authorize(cmd)?;
        let wiring = StageWiring {
            first: k == 0,
            last: k == n - 1,
            capture_last: false,
            has_stdin_data: false,
            prev_out_redirected: k > 0 && stdout_redirected(&cmds[k - 1]),
            next_in_redirected: k + 1 < n
                && cmds[k + 1].redirects.contains_key(&RedirectKind::Stdin),
        };
        children.push(spawn_stage(ctx, cmd, wiring)?);
    }

    for k in 0..n.saturating_sub(1) {
        let reader = children[k].stdout.take();
        let writer = children[k + 1].stdin.take();
        if let (Some(mut reader), Some(mut writer)) = (reader, writer) {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    }

    let (id, pid) = ctx.state.jobs.add(cmds[0].name.clone(), children);
    tracing::debug!(job = id, pid, cmd = %cmds[0].name, "background job started");
    Ok(output(format!("[{}] {}\n", id, pid)))
}

fn stdout_redirected(cmd: &ExpandedCommand) -> bool {
    cmd.redirects.contains_key(&RedirectKind::Stdout)
        || cmd.redirects.contains_key(&RedirectKind::Append)
}

struct StageWiring {
    first: bool,
    last: bool,
    /// Pipe the last stage's stdout for capture (foreground) or discard it
    /// (background).
    capture_last: bool,
    has_stdin_data: bool,
    prev_out_redirected: bool,
    next_in_redirected: bool,
}

fn resolve_target(ctx: &ExecContext<'_>, target: &str) -> PathBuf {
    let path = PathBuf::from(target);
    if path.is_absolute() {
        path
    } else {
        ctx.state.cwd.join(path)
    }
}

/// Resolve the executable, build the child process with env and stdio
/// wiring, and hand it to the sandbox supervisor to validate and start.
fn spawn_stage(
    ctx: &mut ExecContext<'_>,
    cmd: &ExpandedCommand,
    wiring: StageWiring,
) -> Result<Child, ShellError> {
    let program = resolve_executable(&cmd.name, &ctx.state.env, &ctx.state.cwd)
        .ok_or_else(|| unknown_command(&cmd.name))?;
    let env_map = ctx.state.env.child_env();

    let mut command = Command::new(&program);
    command.args(&cmd.args);
    command.current_dir(&ctx.state.cwd);
    command.env_clear();
    command.envs(&env_map);

    // stdin: redirect file beats pipe wiring.
    if let Some(target) = cmd.redirects.get(&RedirectKind::Stdin) {
        command.stdin(Stdio::from(File::open(resolve_target(ctx, target))?));
    } else if wiring.first {
        if wiring.has_stdin_data {
            command.stdin(Stdio::piped());
        } else {
            command.stdin(Stdio::null());
        }
    } else if wiring.prev_out_redirected {
        // The previous stage writes to a file; nothing arrives by pipe.
        command.stdin(Stdio::null());
    } else {
        command.stdin(Stdio::piped());
    }

    // stdout
    if let Some(target) = cmd.redirects.get(&RedirectKind::Stdout) {
        command.stdout(Stdio::from(File::create(resolve_target(ctx, target))?));
    } else if let Some(target) = cmd.redirects.get(&RedirectKind::Append) {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(resolve_target(ctx, target))?;
        command.stdout(Stdio::from(file));
    } else if wiring.last {
        if wiring.capture_last {
            command.stdout(Stdio::piped());
        } else {
            command.stdout(Stdio::null());
        }
    } else if wiring.next_in_redirected {
        // The next stage reads a file instead; discard this stdout.
        command.stdout(Stdio::null());
    } else {
        command.stdout(Stdio::piped());
    }

    // stderr
    if let Some(target) = cmd.redirects.get(&RedirectKind::Stderr) {
        command.stderr(Stdio::from(File::create(resolve_target(ctx, target))?));
    } else {
        command.stderr(Stdio::piped());
    }

    let meta = CommandMeta {
        name: &cmd.name,
        args: &cmd.args,
        cwd: &ctx.state.cwd,
        env: &env_map,
    };
    ctx.sandbox.spawn(command, &meta)
}
