use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::EnvFilter;

use wardsh::config::{default_state_dir, ShellConfig};
use wardsh::{ExecutionResult, Shell, ShellOptions};

#[derive(Parser)]
#[command(name = "wardsh")]
#[command(about = "A policy-guarded interactive shell with a sandboxed executor")]
#[command(version)]
struct Cli {
    /// Execute a single command line and exit
    #[arg(short = 'c')]
    command: Option<String>,

    /// Read command lines from standard input, continuing past errors
    #[arg(long)]
    batch: bool,

    /// Enforce the policy engine on every dispatch (default)
    #[arg(long = "safe-mode", overrides_with = "unsafe_mode")]
    safe_mode: bool,

    /// Skip the policy engine; sandbox validation still applies
    #[arg(long = "unsafe-mode")]
    unsafe_mode: bool,

    /// Override the state directory (history, policy, exported env)
    #[arg(long = "config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("WARDSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let state_dir = cli.config.clone().or_else(default_state_dir);
    let mut config = match &state_dir {
        Some(dir) => ShellConfig::with_state_dir(dir),
        None => ShellConfig::default(),
    };
    config.safe_mode = cli.safe_mode || !cli.unsafe_mode;

    let mut shell = Shell::new(ShellOptions { cwd: None, config });

    let exit_code = if let Some(script) = cli.command {
        let result = shell.execute(&script).await;
        print_result(&result);
        shell.exit_requested().unwrap_or(result.exit_code)
    } else if cli.batch || !std::io::stdin().is_terminal() {
        run_batch(&mut shell).await
    } else {
        run_interactive(&mut shell).await
    };

    std::process::exit(exit_code);
}

/// Batch mode: execute each input line, continue past per-command errors,
/// stop when input closes or `exit` runs.
async fn run_batch(shell: &mut Shell) -> i32 {
    let stdin = std::io::stdin();
    let mut last_exit = 0;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            // A fatal IO error on the controlling input ends the session.
            Err(e) => {
                eprintln!("wardsh: input error: {}", e);
                return 1;
            }
        };
        let result = shell.execute(&line).await;
        print_result(&result);
        last_exit = result.exit_code;
        if let Some(code) = shell.exit_requested() {
            return code;
        }
    }

    last_exit
}

/// Interactive mode: a rustyline loop with the shell history mirrored into
/// the editor. Ctrl-C clears the line, Ctrl-D exits.
async fn run_interactive(shell: &mut Shell) -> i32 {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("wardsh: cannot initialize line editor: {}", e);
            return 1;
        }
    };
    for entry in shell.history().iter() {
        let _ = editor.add_history_entry(&entry.command);
    }

    let mut last_exit = 0;
    loop {
        let dir = shell
            .cwd()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| shell.cwd().display().to_string());
        let prompt = format!("wardsh:{}$ ", dir);

        match editor.readline(&prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                let result = shell.execute(&line).await;
                print_result(&result);
                last_exit = result.exit_code;
                if let Some(code) = shell.exit_requested() {
                    return code;
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return last_exit,
            Err(e) => {
                eprintln!("wardsh: input error: {}", e);
                return 1;
            }
        }
    }
}

fn print_result(result: &ExecutionResult) {
    if !result.output.is_empty() {
        print!("{}", result.output);
        let _ = std::io::stdout().flush();
    }
    if !result.error.is_empty() {
        eprint!("{}", result.error);
    }
}
