// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! ccx-changeset
//!
//! Previewing a stack change set before it runs, gating whether it runs
//! automatically, and tailing the stack's event stream while it does.

pub mod ansi;
pub mod diff;
pub mod gate;
pub mod tailer;

pub use diff::{render_plain, render_with_filter, unified_diff, Action, ChangeDetail, Replacement, ResourceChange};
pub use gate::{enforce as enforce_execute_gate, parse as parse_execute_gate, ExecuteGate};
pub use tailer::{render_event, tail_until_terminal, ResourceStatus, StackEvent, Tailer};
