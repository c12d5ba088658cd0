// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! ccx-completion
//!
//! The tab-completion engine: decides, for a given partial command line,
//! whether it knows how to offer candidates (regions, output formats,
//! profiles, `--query` paths, enumerated flag values) and otherwise tells
//! the shell hook to delegate to the wrapped command's own completer.

pub mod completers;
pub mod context;
pub mod engine;
pub mod planner;
pub mod protocol;

pub use context::CompletionContext;
pub use engine::{complete, OperationInfo};
pub use planner::{PlannerInvoker, PlannerRequest};
pub use protocol::{decode, encode, Candidate, CompletionResult};
