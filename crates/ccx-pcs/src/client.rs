// SPDX-License-Identifier: MIT OR Apache-2.0
//! The client side: try an already-running daemon first, spawn one if
//! none answers, and fall back to running the command directly in-process
//! if the daemon can't be reached at all (a broken socket must never stop
//! the wrapped command from running).

use std::collections::BTreeMap;
use std::os::fd::AsFd;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use ccx_wire::{decode_response, encode_request, Request};

use crate::error::Result;
use crate::fdpass::{send_fds, Tag};

/// How long the client waits for a daemon to accept a connection before
/// giving up and spawning one itself.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(200);

/// Send a request to the daemon at `socket_path` and wait for its exit
/// code, passing this process's own stdio through so the daemon's worker
/// can wire the wrapped command up to them directly.
///
/// Returns `Ok(None)` if no daemon answered within [`CONNECT_TIMEOUT`] —
/// the caller should then either spawn a daemon and retry, or fall back
/// to running the command itself.
pub fn try_dispatch(socket_path: &Path, argv: Vec<String>, cwd: String, env: BTreeMap<String, String>) -> Result<Option<i32>> {
    let mut stream = match connect_with_timeout(socket_path) {
        Ok(s) => s,
        Err(_) => return Ok(None),
    };

    let request = Request::new(cwd, env, argv);
    let frame = encode_request(&request);
    {
        use std::io::Write;
        stream.write_all(&frame)?;
    }

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    send_fds(&stream, &[stdin.as_fd(), stdout.as_fd(), stderr.as_fd()], Tag::Stdio)?;

    let mut response_buf = Vec::new();
    {
        use std::io::Read;
        stream.read_to_end(&mut response_buf)?;
    }
    let response = decode_response(&response_buf)?;
    Ok(Some(response.exit_code))
}

fn connect_with_timeout(socket_path: &Path) -> std::io::Result<UnixStream> {
    let stream = UnixStream::connect(socket_path)?;
    stream.set_read_timeout(Some(CONNECT_TIMEOUT))?;
    stream.set_write_timeout(Some(CONNECT_TIMEOUT))?;
    Ok(stream)
}
