// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! ccx-grabber
//!
//! The argument-discovery planner: given a key name a command is missing,
//! searches a service's read-only operations (`list_*`, `describe_*`,
//! `get_*`) for one whose output can supply it, chaining further calls to
//! satisfy that operation's own required inputs. The planner never
//! executes anything itself — [`execute::execute`] runs a plan once the
//! caller is ready to, against an [`execute::Invoker`] it supplies.

pub mod arg;
pub mod execute;
pub mod key_spec;
pub mod method;
pub mod output_path;
pub mod service;

pub use arg::{Arg, Args, CallOutput, CallState, ExcludedMethods, LazyCall, ResolvedCall, UsedKeys};
pub use execute::{execute, ExecCache, ExecuteError, Invoker};
pub use key_spec::{KeySpec, Score, NEG_INF_SCORE};
pub use method::Method;
pub use output_path::{OutputPath, PathSegment};
pub use service::{OperationDef, Service, ServiceDef};
