// SPDX-License-Identifier: MIT OR Apache-2.0
//! ccx-pcs
//!
//! The persistent command server: a forking UNIX-domain-socket daemon
//! that keeps a pool of warm worker processes around so that invoking the
//! wrapped command doesn't pay interpreter/SDK startup cost every time.
//!
//! [`client`] is what the CLI entry point calls on every invocation;
//! [`supervisor`] and [`worker`] are the daemon side, normally only
//! reached through the `.daemon` subcommand `ccx-cli` re-execs itself
//! into after daemonizing.

pub mod client;
pub mod config;
pub mod error;
pub mod fdpass;
pub mod supervisor;
pub mod worker;

pub use config::Settings;
pub use error::{PcsError, Result};
pub use supervisor::Outcome;
pub use worker::CommandRunner;
