// SPDX-License-Identifier: MIT OR Apache-2.0
//! The supervisor: binds the daemon socket, keeps a pool of forked worker
//! processes warm, and dispatches each accepted connection to an idle
//! one by passing its raw fd over a supervisor/worker control socket.

use std::os::fd::AsFd;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::time::Duration;

use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use tokio::net::UnixListener;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::error::{PcsError, Result};
use crate::fdpass::{send_fds, Tag};
use crate::worker::CommandRunner;

struct WorkerHandle {
    pid: Pid,
    /// Blocking control socket to this worker. `send_fds` is a single
    /// syscall, cheap enough to make from an async task without its own
    /// thread; the "wait for the worker to go idle again" side is done
    /// on a blocking task (see [`spawn_idle_watcher`]).
    control: StdUnixStream,
    idle: bool,
    /// Bumped every time this pool slot is given a freshly forked worker.
    /// A slot can be reused (see `replace_worker`) while an idle-watcher
    /// task from the *previous* occupant is still blocked reading its own
    /// (now-dead) control socket; tagging each watcher with the
    /// generation it was started for lets the stale one's eventual EOF be
    /// told apart from a real readiness signal for the current occupant.
    generation: u64,
}

/// Why [`run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Clean shutdown; the caller should just exit.
    Shutdown,
    /// Reload requested; the caller should re-`exec` itself so a newer
    /// binary picks up the listening socket's path (the socket file
    /// itself was removed, so the next invocation recreates it fresh).
    Reload,
}

/// Runs the supervisor to completion: binds the socket, forks
/// `settings.pool_size` workers, then services connections until SIGTERM,
/// a SIGUSR1 reload, or the idle timeout elapses. Each of those exits
/// this function; the caller (`ccx-cli`'s daemon entry point) decides
/// what to do next (re-exec on reload, just return on a clean shutdown).
pub async fn run(settings: Settings, runner: &'static (dyn CommandRunner + 'static)) -> Result<Outcome> {
    if settings.socket_path.exists() {
        if StdUnixStream::connect(&settings.socket_path).is_ok() {
            return Err(PcsError::StaleSocket(settings.socket_path));
        }
        std::fs::remove_file(&settings.socket_path)?;
    }
    let listener = UnixListener::bind(&settings.socket_path)?;

    let mut next_generation: u64 = 0;
    let mut workers = Vec::with_capacity(settings.pool_size);
    for _ in 0..settings.pool_size {
        workers.push(spawn_worker(runner, settings.idle_timeout, next_generation)?);
        next_generation += 1;
    }

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigusr1 = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())?;
    let mut sigchld =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::from_raw(libc::SIGCHLD))?;

    let (ready_tx, mut ready_rx) = mpsc::unbounded_channel::<(usize, u64)>();
    for (idx, worker) in workers.iter().enumerate() {
        spawn_idle_watcher(idx, worker.generation, &worker.control, ready_tx.clone());
    }

    let outcome = loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _addr) = accepted?;
                if let Err(err) = dispatch(&mut workers, stream, runner, &settings, &ready_tx, &mut next_generation) {
                    tracing::warn!(error = %err, "dropping connection, no worker available");
                }
            }
            Some((idx, generation)) = ready_rx.recv() => {
                if let Some(w) = workers.get_mut(idx) {
                    if w.generation == generation {
                        w.idle = true;
                        spawn_idle_watcher(idx, generation, &w.control, ready_tx.clone());
                    }
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, shutting down");
                break Outcome::Shutdown;
            }
            _ = sigusr1.recv() => {
                tracing::info!("SIGUSR1 received, reloading");
                break Outcome::Reload;
            }
            _ = sigchld.recv() => {
                for idx in reap_exited(&mut workers, runner, settings.idle_timeout, &mut next_generation) {
                    spawn_idle_watcher(idx, workers[idx].generation, &workers[idx].control, ready_tx.clone());
                }
            }
            () = tokio::time::sleep(settings.idle_timeout), if all_idle(&workers) => {
                tracing::info!("idle timeout elapsed, shutting down");
                break Outcome::Shutdown;
            }
        }
    };

    for worker in &workers {
        send_fds(&worker.control, &[], Tag::Shutdown).ok();
    }
    for worker in &workers {
        waitpid(worker.pid, Some(WaitPidFlag::empty())).ok();
    }
    std::fs::remove_file(&settings.socket_path).ok();
    Ok(outcome)
}

fn all_idle(workers: &[WorkerHandle]) -> bool {
    workers.iter().all(|w| w.idle)
}

fn spawn_worker(runner: &'static (dyn CommandRunner + 'static), idle_timeout: Duration, generation: u64) -> Result<WorkerHandle> {
    let (parent_sock, child_sock) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    )
    .map_err(PcsError::Errno)?;

    // SAFETY: immediately followed by either returning to the caller
    // (parent) or calling `serve`/`exit` without touching shared state
    // (child) — the two halves never run the same code path.
    match unsafe { fork() }.map_err(PcsError::Errno)? {
        ForkResult::Parent { child } => {
            drop(child_sock);
            let control: StdUnixStream = parent_sock.into();
            Ok(WorkerHandle {
                pid: child,
                control,
                idle: true,
                generation,
            })
        }
        ForkResult::Child => {
            drop(parent_sock);
            let control: StdUnixStream = child_sock.into();
            let result = crate::worker::serve(control, runner, idle_timeout);
            std::process::exit(match result {
                Ok(()) => 0,
                Err(_) => 1,
            });
        }
    }
}

/// Dispatch an accepted client to an idle worker, forking a fresh one on
/// demand if the whole pool is busy (spec.md §4.8: "otherwise `fork()` a
/// new worker"). Growth stops at `settings.max_pool_size`, if configured;
/// past that point (or on a genuine fork failure) the connection is
/// dropped, which the client reads as a short response and falls back to
/// running the command itself.
fn dispatch(
    workers: &mut Vec<WorkerHandle>,
    client: tokio::net::UnixStream,
    runner: &'static (dyn CommandRunner + 'static),
    settings: &Settings,
    ready_tx: &mpsc::UnboundedSender<(usize, u64)>,
    next_generation: &mut u64,
) -> Result<()> {
    let idx = match workers.iter().position(|w| w.idle) {
        Some(idx) => idx,
        None => {
            if settings.max_pool_size.is_some_and(|max| workers.len() >= max) {
                return Err(PcsError::PoolExhausted(workers.len()));
            }
            let generation = *next_generation;
            *next_generation += 1;
            let fresh = spawn_worker(runner, settings.idle_timeout, generation)?;
            workers.push(fresh);
            let idx = workers.len() - 1;
            spawn_idle_watcher(idx, generation, &workers[idx].control, ready_tx.clone());
            idx
        }
    };

    workers[idx].idle = false;
    let client_std: StdUnixStream = client.into_std()?;
    send_fds(&workers[idx].control, &[client_std.as_fd()], Tag::Client)?;
    Ok(())
}

/// Blocks (on a dedicated OS thread, via `spawn_blocking`) until the
/// worker at `idx` reports readiness for its next job, then notifies the
/// async select loop through `ready_tx`. `generation` identifies which
/// occupant of the slot this watcher was started for, so a watcher left
/// over from a since-replaced worker can be told apart from a live one.
fn spawn_idle_watcher(idx: usize, generation: u64, control: &StdUnixStream, ready_tx: mpsc::UnboundedSender<(usize, u64)>) {
    let control = control.try_clone().expect("dup worker control socket");
    tokio::task::spawn_blocking(move || {
        use crate::fdpass::recv_fds;
        let _ = recv_fds(&control);
        let _ = ready_tx.send((idx, generation));
    });
}

/// Drain every exited child reported by one SIGCHLD delivery — a single
/// signal can coalesce several deaths, so `WNOHANG`-polling until nothing
/// is left is the only way not to leave zombies behind — and respawn a
/// replacement for each one in its same pool slot, so the pool never
/// shrinks below `pool_size`. Returns the slot indices that were
/// replaced, so the caller can start a fresh idle watcher for each.
fn reap_exited(
    workers: &mut [WorkerHandle],
    runner: &'static (dyn CommandRunner + 'static),
    idle_timeout: Duration,
    next_generation: &mut u64,
) -> Vec<usize> {
    let mut replaced = Vec::new();
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(WaitStatus::Exited(pid, code)) => {
                tracing::warn!(%pid, code, "worker exited");
                replace_worker(workers, pid, runner, idle_timeout, next_generation, &mut replaced);
            }
            Ok(WaitStatus::Signaled(pid, signal, _)) => {
                tracing::warn!(%pid, ?signal, "worker killed by signal");
                replace_worker(workers, pid, runner, idle_timeout, next_generation, &mut replaced);
            }
            Ok(_) => continue,
        }
    }
    replaced
}

fn replace_worker(
    workers: &mut [WorkerHandle],
    pid: Pid,
    runner: &'static (dyn CommandRunner + 'static),
    idle_timeout: Duration,
    next_generation: &mut u64,
    replaced: &mut Vec<usize>,
) {
    let Some(idx) = workers.iter().position(|w| w.pid == pid) else {
        return;
    };
    let generation = *next_generation;
    match spawn_worker(runner, idle_timeout, generation) {
        Ok(fresh) => {
            workers[idx] = fresh;
            *next_generation += 1;
            replaced.push(idx);
        }
        Err(err) => tracing::error!(%err, "failed to respawn worker after exit"),
    }
}
