// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ccx`: wraps a cloud CLI with a persistent command server, an
//! argument-discovery planner, shell completion, and a change-set preview
//! gate. Most invocations carry no subcommand of their own — the whole argv
//! is the wrapped command's, forwarded to a warm daemon (or run directly if
//! none answers).

mod cli;
mod daemon;
mod runner;
mod settings;

use std::collections::BTreeMap;
use std::os::unix::process::CommandExt;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ccx_completion::{complete, CompletionContext, OperationInfo};
use ccx_pcs::Settings as PcsSettings;

use cli::{Cli, Command};
use settings::Settings;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Some(Command::Daemon) => run_daemon(settings),
        Some(Command::Complete { cursor, argv }) => {
            run_complete(argv, cursor);
            Ok(())
        }
        None => run_passthrough(cli.passthrough, settings),
    }
}

fn run_daemon(settings: Settings) -> anyhow::Result<()> {
    let pcs_settings = PcsSettings::new(settings.socket_path);
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(daemon::run(pcs_settings))
}

fn run_complete(argv: Vec<String>, cursor: usize) {
    let ctx = CompletionContext::new(argv, cursor);
    // ccx-completion's engine supports a planner fallback
    // (`ccx_completion::planner`) for flags with no static completion
    // source, but running it needs a loaded service model to search and
    // a live invoker to run the chosen plan against — this binary has
    // neither, so `OperationInfo::default()` leaves `planner` unset and
    // those flags fall through to the shell hook's own completer.
    let result = complete(&ctx, &OperationInfo::default());
    use std::io::Write;
    std::io::stdout().write_all(&ccx_completion::encode(&result)).ok();
}

fn run_passthrough(argv: Vec<String>, settings: Settings) -> anyhow::Result<()> {
    if argv.is_empty() {
        anyhow::bail!("no command given");
    }

    if argv == [".start-command-server", "/reload"] {
        return request_reload(&settings);
    }

    if is_changeset_execute(&argv) && !ccx_changeset::enforce_execute_gate(settings.execute_gate) {
        eprintln!("change set execution aborted by AWS_EXECUTE_CHANGESET");
        std::process::exit(1);
    }

    let cwd = std::env::current_dir()?.to_string_lossy().into_owned();
    let env: BTreeMap<String, String> = std::env::vars().collect();

    match ccx_pcs::client::try_dispatch(&settings.socket_path, argv.clone(), cwd.clone(), env.clone()) {
        Ok(Some(code)) => std::process::exit(code),
        Ok(None) => {}
        Err(err) => {
            report_error("command server dispatch failed", &err, settings.verbose_errors);
        }
    }

    spawn_daemon(&settings)?;
    for _ in 0..10 {
        std::thread::sleep(Duration::from_millis(50));
        if let Ok(Some(code)) = ccx_pcs::client::try_dispatch(&settings.socket_path, argv.clone(), cwd.clone(), env.clone()) {
            std::process::exit(code);
        }
    }

    tracing::warn!("no daemon answered, running directly");
    exec_directly(argv)
}

/// Whether `argv` looks like it will run `cloudformation`'s `deploy` or
/// `execute-change-set` operations — the two commands that execute a
/// previously previewed change set and so are subject to the gate
/// (spec.md §4.7). The original activates on the driver's own user-agent
/// string from inside its API-call hook; this port doesn't own that
/// driver (see `runner.rs`), so it matches on argv instead.
fn is_changeset_execute(argv: &[String]) -> bool {
    argv.iter().any(|a| a == "cloudformation")
        && argv.iter().any(|a| a == "deploy" || a == "execute-change-set")
}

fn request_reload(settings: &Settings) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.to_string_lossy().into_owned();
    let env: BTreeMap<String, String> = std::env::vars().collect();
    match ccx_pcs::client::try_dispatch(
        &settings.socket_path,
        vec![".start-command-server".into(), "/reload".into()],
        cwd,
        env,
    )? {
        Some(code) => std::process::exit(code),
        None => {
            eprintln!("no command server running at {}", settings.socket_path.display());
            std::process::exit(1);
        }
    }
}

fn spawn_daemon(settings: &Settings) -> anyhow::Result<()> {
    let exe = std::env::current_exe()?;
    std::process::Command::new(exe)
        .arg("daemon")
        .env("AWS_CLI_SOCKET", &settings.socket_path)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()?;
    Ok(())
}

/// Replace this process with the wrapped command directly, bypassing the
/// daemon entirely — the last-resort fallback when no server could be
/// reached at all.
fn exec_directly(argv: Vec<String>) -> anyhow::Result<()> {
    let (program, args) = argv.split_first().expect("checked non-empty above");
    let err = std::process::Command::new(program).args(args).exec();
    Err(anyhow::anyhow!(err))
}

fn report_error(context: &str, err: &impl std::fmt::Display, verbose: bool) {
    if verbose {
        eprintln!("{context}: {err}");
    } else {
        tracing::debug!(%err, context);
    }
}
