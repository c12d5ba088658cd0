// SPDX-License-Identifier: MIT OR Apache-2.0
//! Top-level dispatch: look at where the cursor is and decide which
//! specialized completer (if any) should answer, falling back to the
//! planner and finally to [`CompletionResult::Delegate`] when nothing
//! here applies.

use ccx_core::{Shape, ShapeKind};

use crate::completers;
use crate::context::CompletionContext;
use crate::planner::{self, PlannerRequest};
use crate::protocol::{Candidate, CompletionResult};

/// Static knowledge the engine needs about the command currently being
/// completed, supplied by the binary wiring this crate up (it knows which
/// operation's shapes are in scope; this crate never loads a service
/// model itself).
#[derive(Default)]
pub struct OperationInfo<'a> {
    /// The output shape of the operation on `ctx.command_path()`, if the
    /// path names one the caller recognises — needed to answer
    /// `--query`.
    pub output_shape: Option<Shape>,
    /// The shape of the flag named by `ctx.previous_word()`, if the
    /// caller recognises it.
    pub current_flag_shape: Option<Shape>,
    /// Profile names read out of the user's AWS config, for `--profile`.
    pub known_profiles: Vec<String>,
    /// The planner fallback (spec.md §4.6 step 5), used when no static
    /// source above answers the flag.
    pub planner: Option<PlannerRequest<'a>>,
}

/// Decide how to complete `ctx.current_word()`.
#[must_use]
pub fn complete(ctx: &CompletionContext, info: &OperationInfo<'_>) -> CompletionResult {
    let word = ctx.current_word();

    match ctx.previous_word() {
        Some("--region") => CompletionResult::Complete(completers::complete_region(word)),
        Some("--output") => CompletionResult::Complete(completers::complete_output_format(word)),
        Some("--profile") => CompletionResult::Complete(completers::complete_profile(&info.known_profiles, word)),
        Some("--query") => match &info.output_shape {
            Some(shape) => CompletionResult::Complete(completers::complete_query(shape, word)),
            None => delegate(),
        },
        Some(flag) if flag.starts_with("--") => complete_flag(ctx, info, flag, word),
        _ => delegate(),
    }
}

fn complete_flag(ctx: &CompletionContext, info: &OperationInfo<'_>, flag: &str, word: &str) -> CompletionResult {
    if let Some(shape) = &info.current_flag_shape {
        if let Some(candidates) = complete_from_shape(shape, word) {
            return CompletionResult::Complete(candidates);
        }
    }

    if let Some(request) = &info.planner {
        let key = flag.trim_start_matches('-');
        let values = planner::complete_via_planner(request, key);
        if !values.is_empty() {
            return CompletionResult::Complete(
                values
                    .into_iter()
                    .filter(|v| v.starts_with(word))
                    .map(Candidate::simple)
                    .collect(),
            );
        }
    }

    delegate()
}

/// Spec.md §4.6 step 4: answer directly from the flag's own shape when
/// one of the static-source cases applies; `None` means "try the planner
/// instead", not "empty result".
fn complete_from_shape(shape: &Shape, word: &str) -> Option<Vec<Candidate>> {
    if shape.enum_values().is_some() {
        return Some(completers::complete_enum_shape(shape, word));
    }
    match &shape.kind {
        ShapeKind::Map(_) => Some(completers::complete_map_placeholder(word)),
        ShapeKind::Structure(_) => {
            let combos = completers::complete_structure(shape, word);
            if combos.is_empty() {
                None
            } else {
                Some(combos)
            }
        }
        _ => None,
    }
}

fn delegate() -> CompletionResult {
    CompletionResult::Delegate {
        cmd: String::new(),
        args: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompletionContext;
    use ccx_core::StructureMember;

    #[test]
    fn dispatches_region_flag_to_region_completer() {
        let ctx = CompletionContext::new(
            vec!["ec2".into(), "describe-instances".into(), "--region".into(), "us-w".into()],
            3,
        );
        let result = complete(&ctx, &OperationInfo::default());
        assert_eq!(
            result,
            CompletionResult::Complete(vec![Candidate::simple("us-west-1"), Candidate::simple("us-west-2")])
        );
    }

    #[test]
    fn query_without_a_known_shape_delegates() {
        let ctx = CompletionContext::new(vec!["ec2".into(), "describe-instances".into(), "--query".into(), "".into()], 3);
        assert_eq!(complete(&ctx, &OperationInfo::default()), delegate());
    }

    #[test]
    fn unrecognised_flag_delegates() {
        let ctx = CompletionContext::new(vec!["ec2".into(), "describe-instances".into(), "--filters".into(), "".into()], 3);
        assert_eq!(complete(&ctx, &OperationInfo::default()), delegate());
    }

    #[test]
    fn map_shaped_flag_offers_placeholder() {
        let ctx = CompletionContext::new(vec!["ec2".into(), "create-tags".into(), "--tags".into(), "".into()], 3);
        let info = OperationInfo {
            current_flag_shape: Some(Shape::map(Shape::string())),
            ..Default::default()
        };
        assert_eq!(
            complete(&ctx, &info),
            CompletionResult::Complete(vec![Candidate::simple("key=value")])
        );
    }

    #[test]
    fn structure_shaped_flag_offers_combinations() {
        let ctx = CompletionContext::new(vec!["ec2".into(), "describe-instances".into(), "--filters".into(), "".into()], 3);
        let shape = Shape::structure(vec![StructureMember {
            name: "Name".into(),
            shape: Shape::string_enum(["instance-state-name"]),
            required: true,
        }]);
        let info = OperationInfo {
            current_flag_shape: Some(shape),
            ..Default::default()
        };
        assert_eq!(
            complete(&ctx, &info),
            CompletionResult::Complete(vec![Candidate::simple("Name=instance-state-name")])
        );
    }
}
