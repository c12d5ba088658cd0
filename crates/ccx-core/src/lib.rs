// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! ccx-core
//!
//! Shared primitives used by the rest of the command-companion workspace:
//! the [`Shape`] view over a service operation's input/output description,
//! and deterministic English-like singularisation/tokenisation of
//! identifier strings.

pub mod shape;
pub mod token;

pub use shape::{Shape, ShapeKind, StructureMember};
pub use token::{singularise, tokenise};
