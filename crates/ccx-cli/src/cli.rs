// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `ccx` binary's own flags and subcommands. This is a thin front end:
//! most invocations carry no subcommand at all and just forward their whole
//! argv to the daemon (or run it directly if none answers).

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ccx", about = "Persistent-server companion for a cloud CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Everything after the recognised subcommands is the wrapped command's
    /// own argv, forwarded as-is.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub passthrough: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the command-server supervisor in the foreground. Normally only
    /// reached through a re-exec from a client that found no daemon
    /// listening; not meant to be invoked directly by a user.
    #[command(name = "daemon", hide = true)]
    Daemon,

    /// Emit shell completion candidates for a partial command line.
    Complete {
        /// Index of the word under the cursor within `argv`.
        #[arg(long)]
        cursor: usize,
        /// The full command line being completed, one argument per value.
        argv: Vec<String>,
    },
}
