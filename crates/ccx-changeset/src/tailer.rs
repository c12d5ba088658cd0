// SPDX-License-Identifier: MIT OR Apache-2.0
//! Polling a stack's event list between waiter ticks and surfacing only
//! what's new since the last poll, oldest first, colour-coded by status.

use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ansi::{Colour, Paint};

/// One stack event as the underlying API reports it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StackEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub logical_id: String,
    pub resource_type: String,
    pub status: ResourceStatus,
    pub status_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceStatus {
    CreateInProgress,
    CreateComplete,
    CreateFailed,
    UpdateInProgress,
    UpdateComplete,
    UpdateFailed,
    DeleteInProgress,
    DeleteComplete,
    DeleteFailed,
    RollbackInProgress,
    RollbackComplete,
    RollbackFailed,
}

impl ResourceStatus {
    #[must_use]
    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            ResourceStatus::CreateFailed
                | ResourceStatus::UpdateFailed
                | ResourceStatus::DeleteFailed
                | ResourceStatus::RollbackFailed
        )
    }

    fn colour(self) -> Colour {
        use ResourceStatus::*;
        match self {
            CreateFailed | UpdateFailed | DeleteFailed | RollbackFailed => Colour::Red,
            RollbackInProgress | RollbackComplete => Colour::Yellow,
            CreateInProgress | UpdateInProgress | DeleteInProgress => Colour::Blue,
            CreateComplete | UpdateComplete | DeleteComplete => Colour::Green,
        }
    }
}

/// Render one event as a single colour-coded line.
#[must_use]
pub fn render_event(event: &StackEvent) -> String {
    let base = format!(
        "{:<32} {:<28} {:?}{}",
        event.logical_id,
        event.resource_type,
        event.status,
        event
            .status_reason
            .as_deref()
            .map(|r| format!(" — {r}"))
            .unwrap_or_default(),
    );
    base.paint(event.status.colour())
}

/// Tracks which events have already been surfaced across polls so the
/// same event is never printed twice, even if the underlying API's
/// pagination overlaps between calls.
#[derive(Debug, Default)]
pub struct Tailer {
    seen: BTreeSet<String>,
}

impl Tailer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one poll's worth of events, returning only the ones not yet
    /// seen, oldest first.
    pub fn ingest(&mut self, mut events: Vec<StackEvent>) -> Vec<StackEvent> {
        events.sort_by_key(|e| e.timestamp);
        events.retain(|e| self.seen.insert(e.event_id.clone()));
        events
    }
}

/// Poll `source` every `interval` until it returns an event whose status
/// is a terminal complete/failed state for `root_logical_id` (the stack
/// itself), printing each new event via `on_event` as it arrives.
pub async fn tail_until_terminal<F, Fut, E>(
    mut source: F,
    interval: Duration,
    root_logical_id: &str,
    mut on_event: impl FnMut(&StackEvent),
) -> Result<(), E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<StackEvent>, E>>,
{
    let mut tailer = Tailer::new();
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let events = source().await?;
        for event in tailer.ingest(events) {
            // Stop either when the root stack itself reaches a terminal
            // complete status, or immediately on any resource's failure
            // so the caller can surface it without waiting out the rest
            // of the rollback.
            let root_completed = event.logical_id == root_logical_id
                && matches!(
                    event.status,
                    ResourceStatus::CreateComplete
                        | ResourceStatus::UpdateComplete
                        | ResourceStatus::DeleteComplete
                        | ResourceStatus::RollbackComplete
                );
            let is_root_terminal = root_completed || event.status.is_terminal_failure();
            on_event(&event);
            if is_root_terminal {
                return Ok(());
            }
        }
    }
}
