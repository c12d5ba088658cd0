// SPDX-License-Identifier: MIT OR Apache-2.0
//! Passing open file descriptors between processes over a UNIX domain
//! socket using `SCM_RIGHTS` ancillary data.
//!
//! The supervisor accepts a client connection and hands its raw fd
//! straight to an idle worker this way, rather than proxying bytes
//! itself — the worker then owns the client socket directly and the
//! supervisor's accept loop never blocks on a single request's lifetime.
//! The client, in turn, passes its own stdin/stdout/stderr to the worker
//! in one frame so the wrapped command can be `exec`'d with them attached
//! directly, with no pipe relaying in between.

use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use nix::sys::socket::{recvmsg, sendmsg, ControlMessage, ControlMessageOwned, MsgFlags};
use nix::sys::uio::IoSlice;

use crate::error::{PcsError, Result};

/// The largest number of descriptors passed in a single frame: a client's
/// stdin, stdout and stderr.
pub const MAX_FDS: usize = 3;

/// A one-byte payload sent alongside the passed descriptors. `SCM_RIGHTS`
/// requires at least one regular byte of data; we use it to tag the frame
/// so the receiver doesn't need a second read to know what it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// A single fd: the newly accepted client connection.
    Client = 1,
    /// Three fds, in order: the client's stdin, stdout, stderr.
    Stdio = 2,
    /// No fds; tells a worker to finish its current job (if any) and exit.
    Shutdown = 3,
}

/// Send `fds` to the peer of `channel` in one ancillary-data frame,
/// tagged with `tag`.
pub fn send_fds(channel: &UnixStream, fds: &[BorrowedFd<'_>], tag: Tag) -> Result<()> {
    let tag_byte = [tag as u8];
    let iov = [IoSlice::new(&tag_byte)];
    let raw: Vec<RawFd> = fds.iter().map(|f| f.as_raw_fd()).collect();
    let cmsg = if raw.is_empty() {
        Vec::new()
    } else {
        vec![ControlMessage::ScmRights(&raw)]
    };
    sendmsg::<()>(channel.as_raw_fd(), &iov, &cmsg, MsgFlags::empty(), None)
        .map_err(PcsError::Errno)?;
    Ok(())
}

/// Receive a tagged frame previously sent with [`send_fds`]. Returns
/// `None` if the peer closed the channel instead of sending one.
pub fn recv_fds(channel: &UnixStream) -> Result<Option<(Vec<OwnedFd>, Tag)>> {
    let mut data_buf = [0u8; 1];
    let mut cmsg_buf = nix::cmsg_space!([RawFd; MAX_FDS]);
    let mut iov = [std::io::IoSliceMut::new(&mut data_buf)];

    let msg = recvmsg::<()>(
        channel.as_raw_fd(),
        &mut iov,
        Some(&mut cmsg_buf),
        MsgFlags::empty(),
    )
    .map_err(PcsError::Errno)?;

    if msg.bytes == 0 {
        return Ok(None);
    }

    let tag = match data_buf[0] {
        1 => Tag::Client,
        2 => Tag::Stdio,
        3 => Tag::Shutdown,
        other => {
            tracing::warn!(tag = other, "ignoring frame with unrecognised tag");
            return Ok(None);
        }
    };

    let mut owned = Vec::new();
    for cmsg in msg.cmsgs().map_err(PcsError::Errno)? {
        if let ControlMessageOwned::ScmRights(fds) = cmsg {
            for raw in fds {
                // SAFETY: `raw` was just handed to us by the kernel inside
                // this SCM_RIGHTS message; we are its sole owner.
                owned.push(unsafe { OwnedFd::from_raw_fd(raw) });
            }
        }
    }
    Ok(Some((owned, tag)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsFd;

    #[test]
    fn round_trips_a_single_fd_with_its_tag() {
        let (a, b) = UnixStream::pair().unwrap();
        let (payload_r, payload_w) = UnixStream::pair().unwrap();
        send_fds(&a, &[payload_w.as_fd()], Tag::Client).unwrap();
        let (received, tag) = recv_fds(&b).unwrap().expect("a frame was sent");
        assert_eq!(tag, Tag::Client);
        assert_eq!(received.len(), 1);
        drop(payload_r);
    }

    #[test]
    fn round_trips_three_stdio_fds() {
        let (a, b) = UnixStream::pair().unwrap();
        let (s0a, s0b) = UnixStream::pair().unwrap();
        let (s1a, s1b) = UnixStream::pair().unwrap();
        let (s2a, s2b) = UnixStream::pair().unwrap();
        send_fds(&a, &[s0a.as_fd(), s1a.as_fd(), s2a.as_fd()], Tag::Stdio).unwrap();
        let (received, tag) = recv_fds(&b).unwrap().expect("a frame was sent");
        assert_eq!(tag, Tag::Stdio);
        assert_eq!(received.len(), 3);
        drop((s0b, s1b, s2b));
    }

    #[test]
    fn shutdown_frame_carries_no_descriptors() {
        let (a, b) = UnixStream::pair().unwrap();
        send_fds(&a, &[], Tag::Shutdown).unwrap();
        let (received, tag) = recv_fds(&b).unwrap().expect("a frame was sent");
        assert_eq!(tag, Tag::Shutdown);
        assert!(received.is_empty());
    }
}
