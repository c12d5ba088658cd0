// SPDX-License-Identifier: MIT OR Apache-2.0
//! A single worker process: waits for the supervisor to hand it a client
//! connection, reads the client's request and stdio descriptors off that
//! connection directly, runs the requested command, and reports back.

use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use ccx_wire::{decode_request, encode_response, Request, Response};

use crate::error::{PcsError, Result};
use crate::fdpass::{recv_fds, send_fds, Tag};

/// Runs the wrapped command once a worker has a fully assembled request:
/// the parsed invocation plus its stdin/stdout/stderr. Returns the exit
/// code to report back to the client. The real implementation (shelling
/// out to or embedding the cloud CLI) lives outside this crate; workers
/// only know how to get a request to one and a result back.
pub trait CommandRunner: Send + Sync {
    fn run(&self, request: &Request, stdin: OwnedFd, stdout: OwnedFd, stderr: OwnedFd) -> i32;
}

/// Read exactly one newline-terminated request line off `socket`, one byte
/// at a time. A buffered reader would risk pulling bytes from past the
/// `\n` into its buffer — bytes that actually belong to the client's
/// subsequent `send_fds` ancillary-data message — and lose them.
fn read_request(socket: &mut UnixStream) -> Result<Request> {
    use std::io::Read;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = socket.read(&mut byte)?;
        if n == 0 {
            return Err(PcsError::Wire(ccx_wire::WireError::Truncated));
        }
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    Ok(decode_request(&line)?)
}

fn write_response(socket: &mut UnixStream, response: Response) -> Result<()> {
    use std::io::Write;
    socket.write_all(&encode_response(response))?;
    Ok(())
}

/// The worker's main loop. Blocks waiting for the supervisor to pass it a
/// client (or tell it to shut down) over `control`. Exits on a clean
/// shutdown request, on `idle_timeout` elapsing with no new client, or on
/// the supervisor closing its end; the caller is expected to `exit` the
/// process afterward, matching how the rest of the pool is torn down.
pub fn serve(control: UnixStream, runner: &dyn CommandRunner, idle_timeout: Duration) -> Result<()> {
    control.set_read_timeout(Some(idle_timeout))?;
    loop {
        let (mut fds, tag) = match recv_fds(&control) {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                tracing::info!("supervisor channel closed, exiting");
                return Ok(());
            }
            Err(PcsError::Errno(nix::Error::EAGAIN)) => {
                tracing::info!("idle timeout elapsed, exiting");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match tag {
            Tag::Shutdown => {
                tracing::info!("received shutdown, exiting");
                return Ok(());
            }
            Tag::Stdio => {
                tracing::warn!("stdio frame with no pending client, dropping");
                continue;
            }
            Tag::Client => {
                let Some(client_fd) = fds.pop() else {
                    continue;
                };
                if let Err(e) = handle_client(client_fd, runner) {
                    tracing::warn!(error = %e, "request failed");
                }
                send_fds(&control, &[], Tag::Client).ok();
            }
        }
    }
}

fn handle_client(client_fd: OwnedFd, runner: &dyn CommandRunner) -> Result<()> {
    let mut client = UnixStream::from(client_fd);
    let request = read_request(&mut client)?;

    let (stdio_fds, tag) = recv_fds(&client)?.ok_or(PcsError::MissingStdio)?;
    if tag != Tag::Stdio || stdio_fds.len() != 3 {
        return Err(PcsError::MissingStdio);
    }
    let mut it = stdio_fds.into_iter();
    let (stdin, stdout, stderr) = (it.next().unwrap(), it.next().unwrap(), it.next().unwrap());

    let exit_code = runner.run(&request, stdin, stdout, stderr);
    write_response(&mut client, Response { exit_code })?;
    Ok(())
}

/// Duplicate a received descriptor into a `Stdio` a `std::process::Command`
/// can be wired up with, leaving the original fd intact for the caller to
/// manage (and eventually drop) on its own schedule.
pub fn as_stdio(fd: &OwnedFd) -> std::process::Stdio {
    let dup = nix::unistd::dup(fd.as_raw_fd()).expect("dup stdio fd");
    // SAFETY: `dup` is a freshly duplicated fd we exclusively own.
    let owned = unsafe { OwnedFd::from_raw_fd(dup) };
    std::process::Stdio::from(owned)
}
