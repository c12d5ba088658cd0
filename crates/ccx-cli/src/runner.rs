// SPDX-License-Identifier: MIT OR Apache-2.0
//! The worker-side [`CommandRunner`]: runs the wrapped command's own argv
//! against the stdio file descriptors the client handed over. Reimplementing
//! the wrapped tool's driver is out of scope here — a worker's job is
//! amortising process startup, not re-parsing the tool's own command table —
//! so this just execs `argv[0]` as a child process wired to the passed fds.

use std::os::fd::OwnedFd;
use std::process::Command;

use ccx_pcs::CommandRunner;
use ccx_wire::Request;

pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, request: &Request, stdin: OwnedFd, stdout: OwnedFd, stderr: OwnedFd) -> i32 {
        let Some((program, args)) = request.argv.split_first() else {
            return 1;
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&request.cwd)
            .env_clear()
            .envs(&request.env)
            .stdin(ccx_pcs::worker::as_stdio(&stdin))
            .stdout(ccx_pcs::worker::as_stdio(&stdout))
            .stderr(ccx_pcs::worker::as_stdio(&stderr));

        match command.status() {
            Ok(status) => status.code().unwrap_or(1),
            Err(err) => {
                tracing::error!(%err, program, "failed to launch wrapped command");
                1
            }
        }
    }
}
