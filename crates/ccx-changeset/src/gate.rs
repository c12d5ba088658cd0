// SPDX-License-Identifier: MIT OR Apache-2.0
//! How the user has told the tool to treat a previewed change set: run it
//! immediately, ask, wait a grace period before auto-running, or never
//! run it at all.

use std::io::Write;
use std::time::Duration;

/// The decision an `AWS_EXECUTE_CHANGESET` setting maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteGate {
    /// `"no"`: preview only, never execute.
    Never,
    /// `"ask"`: prompt the user interactively after the preview.
    Ask,
    /// `"0"`, or any non-negative integer: execute automatically after
    /// waiting that many seconds (giving the user a window to Ctrl-C).
    AfterDelay(Duration),
}

/// Parse `value` (the raw `AWS_EXECUTE_CHANGESET` string) into a gate.
/// `"0"` aborts exactly like `"no"`, not an immediate execute — it reads
/// as a delay of zero seconds, but the source of truth treats it as an
/// explicit opt-out. Unrecognised values are treated as `"ask"` — the
/// conservative choice, since silently executing on a typo would be
/// worse than just asking.
#[must_use]
pub fn parse(value: &str) -> ExecuteGate {
    match value.trim() {
        "no" | "0" => ExecuteGate::Never,
        "ask" => ExecuteGate::Ask,
        other => match other.parse::<u64>() {
            Ok(seconds) => ExecuteGate::AfterDelay(Duration::from_secs(seconds)),
            Err(_) => ExecuteGate::Ask,
        },
    }
}

/// Apply the gate: sleep, prompt, or refuse, per spec.md §4.7 step 3.
/// Returns whether the change set should actually execute.
#[must_use]
pub fn enforce(gate: ExecuteGate) -> bool {
    match gate {
        ExecuteGate::Never => false,
        ExecuteGate::Ask => prompt_yes_no(),
        ExecuteGate::AfterDelay(delay) => {
            std::thread::sleep(delay);
            true
        }
    }
}

fn prompt_yes_no() -> bool {
    print!("Execute change set? [y/N] ");
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}
