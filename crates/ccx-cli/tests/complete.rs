// SPDX-License-Identifier: MIT OR Apache-2.0
//! Black-box coverage of the `complete` subcommand's stdout framing.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn region_completion_emits_nul_terminated_candidates() {
    Command::cargo_bin("ccx")
        .unwrap()
        .args(["complete", "--cursor", "3", "ec2", "describe-instances", "--region", "us-w"])
        .assert()
        .success()
        .stdout(predicate::function(|out: &[u8]| {
            out.ends_with(b"\0") && out.windows(b"us-west".len()).any(|w| w == b"us-west")
        }));
}

#[test]
fn unrecognised_flag_delegates() {
    Command::cargo_bin("ccx")
        .unwrap()
        .args(["complete", "--cursor", "3", "ec2", "describe-instances", "--filters", ""])
        .assert()
        .success()
        .stdout(predicate::eq(b"delegate\n\0".as_slice()));
}
