// SPDX-License-Identifier: MIT OR Apache-2.0
//! Environment-derived configuration. Every knob this tool reads from the
//! environment is collected here rather than scattered through `std::env`
//! calls, so the rest of the binary can be tested against a plain struct.

use std::path::PathBuf;
use std::time::Duration;

use ccx_changeset::ExecuteGate;

/// Runtime configuration assembled once at startup from the process
/// environment (and, for the socket path, a sensible XDG-ish default).
#[derive(Debug, Clone)]
pub struct Settings {
    /// `AWS_CLI_SOCKET` — where the command-server daemon listens.
    /// Defaults to `~/.aws/cli/command_server.sock`.
    pub socket_path: PathBuf,
    /// `AWS_EXECUTE_CHANGESET` — whether a previewed change set runs
    /// automatically, is asked about, or never runs. Defaults to a
    /// 10-second delay.
    pub execute_gate: ExecuteGate,
    /// `AWSHIT_EXCEPTION` — when set to `1`, print full error chains
    /// (including planner search detail) instead of a one-line summary.
    /// Named after the environment variable the original tool this one
    /// descends from used for the same purpose.
    pub verbose_errors: bool,
}

impl Settings {
    #[must_use]
    pub fn from_env() -> Self {
        let socket_path = std::env::var_os("AWS_CLI_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(default_socket_path);

        let execute_gate = std::env::var("AWS_EXECUTE_CHANGESET")
            .ok()
            .map(|v| ccx_changeset::parse_execute_gate(&v))
            .unwrap_or(ExecuteGate::AfterDelay(Duration::from_secs(10)));

        let verbose_errors = std::env::var("AWSHIT_EXCEPTION")
            .map(|v| v == "1")
            .unwrap_or(false);

        Settings {
            socket_path,
            execute_gate,
            verbose_errors,
        }
    }
}

fn default_socket_path() -> PathBuf {
    let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    home.join(".aws").join("cli").join("command_server.sock")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_gate_defaults_to_ten_second_delay_when_unset() {
        std::env::remove_var("AWS_EXECUTE_CHANGESET");
        let settings = Settings::from_env();
        assert_eq!(settings.execute_gate, ExecuteGate::AfterDelay(Duration::from_secs(10)));
    }

    #[test]
    fn default_socket_path_is_under_aws_cli_dir() {
        std::env::set_var("HOME", "/home/example");
        std::env::remove_var("AWS_CLI_SOCKET");
        let settings = Settings::from_env();
        assert_eq!(settings.socket_path, PathBuf::from("/home/example/.aws/cli/command_server.sock"));
    }
}
