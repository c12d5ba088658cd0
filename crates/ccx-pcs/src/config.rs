// SPDX-License-Identifier: MIT OR Apache-2.0
//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Settings the supervisor is constructed from. Callers (the `ccx-cli`
/// binary) build this from environment variables and CLI flags; this
/// crate has no opinion on where the values come from.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Path of the UNIX domain socket the supervisor listens on.
    pub socket_path: PathBuf,
    /// Number of worker processes to keep warm in the pool at startup.
    pub pool_size: usize,
    /// Ceiling on how large the pool may grow past `pool_size` when every
    /// warm worker is busy. `None` means the supervisor keeps forking new
    /// workers on demand with no cap, matching the wrapped tool's own
    /// "fork a new worker" behaviour; set this to bound memory/PID use
    /// under a flood of concurrent invocations.
    pub max_pool_size: Option<usize>,
    /// How long the supervisor waits with no incoming connections, and
    /// how long an individual worker waits with no dispatched request,
    /// before exiting on its own.
    pub idle_timeout: Duration,
}

impl Settings {
    #[must_use]
    pub fn new(socket_path: PathBuf) -> Self {
        Settings {
            socket_path,
            pool_size: 4,
            max_pool_size: None,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::new(PathBuf::from("/tmp/ccx.sock"));
        assert_eq!(settings.pool_size, 4);
        assert_eq!(settings.max_pool_size, None);
        assert_eq!(settings.idle_timeout, Duration::from_secs(300));
    }
}
