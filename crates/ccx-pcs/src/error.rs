// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the command-server daemon and its client.

/// Failures from the supervisor/worker split: forking, socket setup, or
/// passing file descriptors between processes.
#[derive(Debug, thiserror::Error)]
pub enum PcsError {
    #[error("syscall failed: {0}")]
    Errno(#[from] nix::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("wire protocol error: {0}")]
    Wire(#[from] ccx_wire::WireError),

    #[error("no idle worker available and the pool is already at capacity ({0})")]
    PoolExhausted(usize),

    #[error("worker {0} exited before it could be dispatched to")]
    WorkerGone(u32),

    #[error("daemon socket {0:?} is stale (no process listening); remove it and retry")]
    StaleSocket(std::path::PathBuf),

    #[error("client sent request without following stdio frame")]
    MissingStdio,
}

pub type Result<T> = std::result::Result<T, PcsError>;
