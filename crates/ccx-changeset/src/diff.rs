// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rendering a proposed change set as a human-readable diff: one
//! colour-coded action line per resource, followed by a per-property
//! unified diff (3 lines of context) between its before/after values,
//! optionally piped through whatever colourizing filter the user has
//! configured (mirroring git's own `interactive.diffFilter`).

use std::collections::BTreeSet;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::ansi::{Colour, Paint};

/// The raw `Action` a change-set entry reports for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Add,
    Remove,
    Modify,
}

/// The `Replacement` attribute CloudFormation attaches to a `Modify`
/// action, refining it into `Replace` or `May replace`. Meaningless for
/// `Add`/`Remove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Replacement {
    True,
    False,
    Conditional,
}

/// One resource-level action a change set proposes, with its
/// property-level details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub logical_id: String,
    pub resource_type: String,
    pub action: Action,
    pub replacement: Replacement,
    pub details: Vec<ChangeDetail>,
}

/// One `ResourceTargetDefinition` from `DescribeChangeSet`'s property
/// values: a single property path changing from one value to another,
/// optionally attributed to another resource/parameter that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeDetail {
    pub path: String,
    pub causing_entity: Option<String>,
    pub before_value: String,
    pub after_value: String,
}

impl ResourceChange {
    /// The user-facing label: `Modify` refined to `Replace`/`May
    /// replace` by the `Replacement` attribute.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match (self.action, self.replacement) {
            (Action::Add, _) => "Add",
            (Action::Remove, _) => "Remove",
            (Action::Modify, Replacement::True) => "Replace",
            (Action::Modify, Replacement::Conditional) => "May replace",
            (Action::Modify, Replacement::False) => "Modify",
        }
    }

    fn colour(&self) -> Colour {
        match self.label() {
            "Add" | "Modify" => Colour::Green,
            "Remove" => Colour::Red,
            _ => Colour::Yellow,
        }
    }

    /// Details sorted by `(path, causing-entity-absent)` and deduplicated
    /// by path, keeping the first occurrence per path.
    #[must_use]
    pub fn sorted_details(&self) -> Vec<&ChangeDetail> {
        let mut details: Vec<&ChangeDetail> = self.details.iter().collect();
        details.sort_by(|a, b| (&a.path, a.causing_entity.is_none()).cmp(&(&b.path, b.causing_entity.is_none())));
        let mut seen = BTreeSet::new();
        details.retain(|d| seen.insert(d.path.clone()));
        details
    }
}

fn write_change_header(out: &mut String, change: &ResourceChange) {
    let caused_by = if change.details.is_empty() { "" } else { "\tcaused by:" };
    let line = format!("{}\t{}{}", change.label(), change.logical_id, caused_by);
    out.push_str(&line.paint(change.colour()));
    out.push('\n');
}

fn write_detail_header(out: &mut String, detail: &ChangeDetail) {
    let cause = match &detail.causing_entity {
        Some(entity) => format!("{entity} -> {}", detail.path),
        None => detail.path.clone(),
    };
    out.push_str(&format!("\t- \x1b[1m{cause}:\x1b[0m\n"));
}

/// Render `changes` as action headers plus unfiltered unified diffs, with
/// no external filter applied. Always available, used as the fallback
/// when no `diff_filter` is configured or the filter process fails.
#[must_use]
pub fn render_plain(changes: &[ResourceChange]) -> String {
    let mut out = String::new();
    for change in changes {
        write_change_header(&mut out, change);
        for detail in change.sorted_details() {
            write_detail_header(&mut out, detail);
            out.push_str(&unified_diff(&detail.before_value, &detail.after_value, 3));
        }
    }
    out
}

/// Render `changes` like [`render_plain`], but pipe each property diff
/// through `filter_command` (a shell command line, such as `delta` or
/// `colordiff`), falling back to the unfiltered diff for any detail whose
/// filter invocation fails.
pub async fn render_with_filter(changes: &[ResourceChange], filter_command: Option<&str>) -> String {
    let mut out = String::new();
    for change in changes {
        write_change_header(&mut out, change);
        for detail in change.sorted_details() {
            write_detail_header(&mut out, detail);
            let diff = unified_diff(&detail.before_value, &detail.after_value, 3);
            let body = match filter_command {
                Some(command) => match run_filter(command, &diff).await {
                    Ok(filtered) => filtered,
                    Err(e) => {
                        tracing::warn!(error = %e, filter = command, "diff filter failed, showing unfiltered diff");
                        diff
                    }
                },
                None => diff,
            };
            out.push_str(&body);
        }
    }
    out
}

async fn run_filter(command: &str, input: &str) -> std::io::Result<String> {
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).await?;
    }
    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(std::io::Error::new(std::io::ErrorKind::Other, "diff filter exited non-zero"));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DiffOp<'a> {
    Equal(&'a str),
    Remove(&'a str),
    Add(&'a str),
}

/// Longest-common-subsequence line diff, backtracked into an edit script.
fn lcs_ops<'a>(before: &[&'a str], after: &[&'a str]) -> Vec<DiffOp<'a>> {
    let n = before.len();
    let m = after.len();
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if before[i] == after[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if before[i] == after[j] {
            ops.push(DiffOp::Equal(before[i]));
            i += 1;
            j += 1;
        } else if dp[i + 1][j] >= dp[i][j + 1] {
            ops.push(DiffOp::Remove(before[i]));
            i += 1;
        } else {
            ops.push(DiffOp::Add(after[j]));
            j += 1;
        }
    }
    while i < n {
        ops.push(DiffOp::Remove(before[i]));
        i += 1;
    }
    while j < m {
        ops.push(DiffOp::Add(after[j]));
        j += 1;
    }
    ops
}

enum Group<'a> {
    Equal(Vec<&'a str>),
    Change(Vec<&'a str>, Vec<&'a str>),
}

fn group_ops(ops: Vec<DiffOp<'_>>) -> Vec<Group<'_>> {
    let mut groups: Vec<Group<'_>> = Vec::new();
    for op in ops {
        match op {
            DiffOp::Equal(l) => match groups.last_mut() {
                Some(Group::Equal(lines)) => lines.push(l),
                _ => groups.push(Group::Equal(vec![l])),
            },
            DiffOp::Remove(l) => match groups.last_mut() {
                Some(Group::Change(removed, _)) => removed.push(l),
                _ => groups.push(Group::Change(vec![l], Vec::new())),
            },
            DiffOp::Add(l) => match groups.last_mut() {
                Some(Group::Change(_, added)) => added.push(l),
                _ => groups.push(Group::Change(Vec::new(), vec![l])),
            },
        }
    }
    groups
}

/// A unified diff between `before` and `after`, with `context` lines of
/// surrounding unchanged content per hunk. File headers (`---`/`+++`) are
/// omitted, matching this port's single-value diffs having no named
/// files to label; only `@@` hunk headers and body lines are emitted.
#[must_use]
pub fn unified_diff(before: &str, after: &str, context: usize) -> String {
    let before_lines: Vec<&str> = before.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();
    let groups = group_ops(lcs_ops(&before_lines, &after_lines));

    let change_idx: Vec<usize> = groups
        .iter()
        .enumerate()
        .filter_map(|(i, g)| matches!(g, Group::Change(_, _)).then_some(i))
        .collect();
    if change_idx.is_empty() {
        return String::new();
    }

    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &ci in &change_idx {
        let merges = hunks.last().is_some_and(|&(_, last_end)| {
            ci == last_end + 1
                || (ci == last_end + 2
                    && matches!(&groups[last_end + 1], Group::Equal(lines) if lines.len() <= 2 * context))
        });
        if merges {
            hunks.last_mut().unwrap().1 = ci;
        } else {
            hunks.push((ci, ci));
        }
    }

    let mut before_start = vec![1usize; groups.len()];
    let mut after_start = vec![1usize; groups.len()];
    let (mut b, mut a) = (1usize, 1usize);
    for (idx, group) in groups.iter().enumerate() {
        before_start[idx] = b;
        after_start[idx] = a;
        match group {
            Group::Equal(lines) => {
                b += lines.len();
                a += lines.len();
            }
            Group::Change(removed, added) => {
                b += removed.len();
                a += added.len();
            }
        }
    }

    let mut out = String::new();
    for (start_idx, end_idx) in hunks {
        let (lead, lead_before_start, lead_after_start) = match start_idx.checked_sub(1).map(|i| &groups[i]) {
            Some(Group::Equal(lines)) => {
                let take = lines.len().min(context);
                let skip = lines.len() - take;
                (
                    lines[skip..].to_vec(),
                    before_start[start_idx - 1] + skip,
                    after_start[start_idx - 1] + skip,
                )
            }
            _ => (Vec::new(), before_start[start_idx], after_start[start_idx]),
        };
        let trail: Vec<&str> = match groups.get(end_idx + 1) {
            Some(Group::Equal(lines)) => lines[..lines.len().min(context)].to_vec(),
            _ => Vec::new(),
        };

        let mut before_count = lead.len();
        let mut after_count = lead.len();
        let mut body = String::new();
        for line in &lead {
            body.push(' ');
            body.push_str(line);
            body.push('\n');
        }
        for group in &groups[start_idx..=end_idx] {
            match group {
                Group::Equal(lines) => {
                    for line in lines {
                        body.push(' ');
                        body.push_str(line);
                        body.push('\n');
                    }
                    before_count += lines.len();
                    after_count += lines.len();
                }
                Group::Change(removed, added) => {
                    for line in removed {
                        body.push('-');
                        body.push_str(line);
                        body.push('\n');
                    }
                    for line in added {
                        body.push('+');
                        body.push_str(line);
                        body.push('\n');
                    }
                    before_count += removed.len();
                    after_count += added.len();
                }
            }
        }
        for line in &trail {
            body.push(' ');
            body.push_str(line);
            body.push('\n');
        }
        before_count += trail.len();
        after_count += trail.len();

        out.push_str(&format!("@@ -{lead_before_start},{before_count} +{lead_after_start},{after_count} @@\n"));
        out.push_str(&body);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(path: &str, causing_entity: Option<&str>, before: &str, after: &str) -> ChangeDetail {
        ChangeDetail {
            path: path.into(),
            causing_entity: causing_entity.map(String::from),
            before_value: before.into(),
            after_value: after.into(),
        }
    }

    fn sample_changes() -> Vec<ResourceChange> {
        vec![
            ResourceChange {
                logical_id: "WebServer".into(),
                resource_type: "AWS::EC2::Instance".into(),
                action: Action::Modify,
                replacement: Replacement::True,
                details: vec![detail("ImageId", None, "ami-old", "ami-new")],
            },
            ResourceChange {
                logical_id: "Bucket".into(),
                resource_type: "AWS::S3::Bucket".into(),
                action: Action::Add,
                replacement: Replacement::False,
                details: Vec::new(),
            },
        ]
    }

    #[test]
    fn label_refines_modify_by_replacement() {
        let mut change = sample_changes().remove(0);
        assert_eq!(change.label(), "Replace");
        change.replacement = Replacement::Conditional;
        assert_eq!(change.label(), "May replace");
        change.replacement = Replacement::False;
        assert_eq!(change.label(), "Modify");
    }

    #[test]
    fn plain_render_contains_labels_and_diff() {
        let out = render_plain(&sample_changes());
        assert!(out.contains("Replace"));
        assert!(out.contains("WebServer"));
        assert!(out.contains("-ami-old"));
        assert!(out.contains("+ami-new"));
        assert!(out.contains("Add"));
        assert!(out.contains("Bucket"));
    }

    #[test]
    fn sorted_details_dedups_by_path_preferring_causing_entity() {
        let change = ResourceChange {
            logical_id: "Subnet".into(),
            resource_type: "AWS::EC2::Subnet".into(),
            action: Action::Modify,
            replacement: Replacement::False,
            details: vec![
                detail("VpcId", None, "vpc-1", "vpc-2"),
                detail("VpcId", Some("Vpc"), "vpc-1", "vpc-2"),
                detail("CidrBlock", None, "10.0.0.0/24", "10.0.1.0/24"),
            ],
        };
        let sorted = change.sorted_details();
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].path, "CidrBlock");
        assert_eq!(sorted[1].path, "VpcId");
        assert_eq!(sorted[1].causing_entity.as_deref(), Some("Vpc"));
    }

    #[test]
    fn unified_diff_marks_single_line_change() {
        let out = unified_diff("old-value", "new-value", 3);
        assert!(out.starts_with("@@ -1,1 +1,1 @@\n"));
        assert!(out.contains("-old-value\n"));
        assert!(out.contains("+new-value\n"));
    }

    #[test]
    fn unified_diff_includes_surrounding_context() {
        let before = "a\nb\nc\nold\nd\ne\nf";
        let after = "a\nb\nc\nnew\nd\ne\nf";
        let out = unified_diff(before, after, 3);
        assert!(out.contains(" a\n"));
        assert!(out.contains(" f\n"));
        assert!(out.contains("-old\n"));
        assert!(out.contains("+new\n"));
    }

    #[test]
    fn unified_diff_of_identical_values_is_empty() {
        assert_eq!(unified_diff("same", "same", 3), "");
    }

    #[tokio::test]
    async fn missing_filter_falls_back_to_plain_render() {
        let out = render_with_filter(&sample_changes(), None).await;
        assert_eq!(out, render_plain(&sample_changes()));
    }

    #[tokio::test]
    async fn filter_command_transforms_diff_body() {
        let out = render_with_filter(&sample_changes(), Some("tr a-z A-Z")).await;
        assert!(out.contains("AMI-NEW"));
    }
}
