// SPDX-License-Identifier: MIT OR Apache-2.0
//! Running the supervisor in this process, and re-executing it in place
//! when asked to reload.

use std::os::unix::process::CommandExt;

use ccx_pcs::{Outcome, Settings};

use crate::runner::ProcessRunner;

static RUNNER: ProcessRunner = ProcessRunner;

/// Runs the supervisor to completion. On a reload outcome, re-execs this
/// same binary with the same argv so a newer copy on disk gets picked up;
/// a reload never returns.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    match ccx_pcs::supervisor::run(settings, &RUNNER).await? {
        Outcome::Shutdown => Ok(()),
        Outcome::Reload => {
            let exe = std::env::current_exe()?;
            let args: Vec<String> = std::env::args().skip(1).collect();
            tracing::info!(?exe, "reloading daemon");
            let err = std::process::Command::new(exe).args(args).exec();
            Err(anyhow::anyhow!(err))
        }
    }
}
