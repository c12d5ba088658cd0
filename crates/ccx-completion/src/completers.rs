// SPDX-License-Identifier: MIT OR Apache-2.0
//! Specialized completers for flag values the engine can answer without
//! consulting the planner.

use ccx_core::{Shape, ShapeKind, StructureMember};
use ccx_grabber::OutputPath;

use crate::protocol::Candidate;

/// A fixed, representative sample of region codes. A real deployment
/// would load this from the service model's region partitions; kept
/// small and static here since region enumeration isn't this crate's
/// concern.
const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
];

const OUTPUT_FORMATS: &[&str] = &["json", "text", "table", "yaml", "yaml-stream"];

/// Complete a `--region` value by prefix.
#[must_use]
pub fn complete_region(prefix: &str) -> Vec<Candidate> {
    by_prefix(KNOWN_REGIONS, prefix)
}

/// Complete a `--output` value by prefix.
#[must_use]
pub fn complete_output_format(prefix: &str) -> Vec<Candidate> {
    by_prefix(OUTPUT_FORMATS, prefix)
}

/// Complete a `--profile` value from the names the caller read out of
/// `~/.aws/config` (profile discovery itself is an I/O concern that
/// belongs to the binary wiring this crate up, not to the engine).
#[must_use]
pub fn complete_profile(known_profiles: &[String], prefix: &str) -> Vec<Candidate> {
    by_prefix(
        &known_profiles.iter().map(String::as_str).collect::<Vec<_>>(),
        prefix,
    )
}

/// Complete a `--query` value: every JMESPath-shaped path reachable from
/// `output_shape`, filtered by prefix. Offers both intermediate branch
/// paths and leaves, since a user may want to select a whole list to
/// pipe through a further `jq`-style filter rather than a single scalar.
#[must_use]
pub fn complete_query(output_shape: &Shape, prefix: &str) -> Vec<Candidate> {
    let paths: Vec<String> = OutputPath::enumerate_all(output_shape)
        .into_iter()
        .map(|(path, _, _)| path.to_jmespath())
        .filter(|p| !p.is_empty())
        .collect();
    by_prefix(&paths.iter().map(String::as_str).collect::<Vec<_>>(), prefix)
}

/// Complete a shape's own enumerated values (e.g. an instance state
/// filter). Covers both a plain string enum and a list-of-string-enum,
/// since [`Shape::enum_values`] already looks through a list's element
/// shape for this case.
#[must_use]
pub fn complete_enum_shape(shape: &Shape, prefix: &str) -> Vec<Candidate> {
    match shape.enum_values() {
        Some(values) => by_prefix(&values.iter().map(String::as_str).collect::<Vec<_>>(), prefix),
        None => Vec::new(),
    }
}

/// Complete a `map`-shaped flag with a single `key=value` placeholder,
/// since a map's keys are opaque strings with nothing to enumerate.
#[must_use]
pub fn complete_map_placeholder(prefix: &str) -> Vec<Candidate> {
    by_prefix(&["key=value"], prefix)
}

/// Complete a `structure`-shaped flag by emitting one `k=v,k2=v2,...`
/// candidate per Cartesian combination of its required members' known
/// values (drawn from an enum shape, or parsed out of the member's own
/// `<ul><li>...</li></ul>` documentation list). Members with neither
/// source are left out of the combination entirely, matching spec's
/// "values drawn from enum shapes or parsed from documentation" scope —
/// there is nothing else to offer for them.
#[must_use]
pub fn complete_structure(shape: &Shape, prefix: &str) -> Vec<Candidate> {
    let members = shape.required_members();
    let columns: Vec<(&str, Vec<String>)> = members
        .into_iter()
        .filter_map(|member| values_for_member(member).map(|values| (member.name.as_str(), values)))
        .collect();
    if columns.is_empty() {
        return Vec::new();
    }

    let mut combos: Vec<Vec<(&str, &str)>> = vec![Vec::new()];
    for (name, values) in &columns {
        let mut next = Vec::with_capacity(combos.len() * values.len());
        for combo in &combos {
            for value in values {
                let mut extended = combo.clone();
                extended.push((name, value.as_str()));
                next.push(extended);
            }
        }
        combos = next;
    }

    let rendered: Vec<String> = combos
        .into_iter()
        .map(|combo| {
            combo
                .into_iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    by_prefix(&rendered.iter().map(String::as_str).collect::<Vec<_>>(), prefix)
}

fn values_for_member(member: &StructureMember) -> Option<Vec<String>> {
    if let Some(values) = member.shape.enum_values() {
        return Some(values.to_vec());
    }
    member
        .shape
        .documentation
        .as_deref()
        .map(list_items_from_doc)
        .filter(|values| !values.is_empty())
}

/// Pull `<li>...</li>` entries out of an operation's documentation HTML.
/// Best-effort: strips any nested tags and surrounding whitespace from
/// each item, ignores malformed markup rather than erroring.
fn list_items_from_doc(doc: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut rest = doc;
    while let Some(start) = rest.find("<li>") {
        let after_open = &rest[start + "<li>".len()..];
        let Some(end) = after_open.find("</li>") else {
            break;
        };
        let inner = strip_tags(&after_open[..end]).trim().to_string();
        if !inner.is_empty() {
            items.push(inner);
        }
        rest = &after_open[end + "</li>".len()..];
    }
    items
}

fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn by_prefix(candidates: &[&str], prefix: &str) -> Vec<Candidate> {
    candidates
        .iter()
        .filter(|c| c.starts_with(prefix))
        .map(|c| Candidate::simple(*c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_completion_filters_by_prefix() {
        let matches = complete_region("us-e");
        assert!(matches.iter().all(|r| r.name.starts_with("us-e")));
        assert!(matches.iter().any(|r| r.name == "us-east-1"));
    }

    #[test]
    fn query_completion_lists_nested_paths() {
        let shape = Shape::structure(vec![StructureMember {
            name: "Reservations".into(),
            shape: Shape::list(Shape::structure(vec![StructureMember {
                name: "Instances".into(),
                shape: Shape::list(Shape::string()),
                required: false,
            }])),
            required: false,
        }]);
        let matches = complete_query(&shape, "Reservations");
        assert!(matches.iter().any(|p| p.name == "Reservations[].Instances"));
    }

    #[test]
    fn enum_shape_completion_respects_prefix() {
        let shape = Shape::string_enum(["running", "stopped", "stopping"]);
        let names: Vec<String> = complete_enum_shape(&shape, "stop").into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["stopped".to_string(), "stopping".to_string()]);
    }

    #[test]
    fn list_of_enum_shape_completes_element_values() {
        let shape = Shape::list(Shape::string_enum(["pending", "running"]));
        let names: Vec<String> = complete_enum_shape(&shape, "run").into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["running".to_string()]);
    }

    #[test]
    fn map_shape_offers_key_value_placeholder() {
        let matches = complete_map_placeholder("");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].name, "key=value");
    }

    #[test]
    fn structure_shape_combines_required_enum_members() {
        let shape = Shape::structure(vec![
            StructureMember {
                name: "Key".into(),
                shape: Shape::string_enum(["tag:Name", "instance-state-name"]),
                required: true,
            },
            StructureMember {
                name: "Values".into(),
                shape: Shape::string(),
                required: false,
            },
        ]);
        let matches = complete_structure(&shape, "");
        let names: Vec<&str> = matches.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Key=tag:Name", "Key=instance-state-name"]);
    }

    #[test]
    fn structure_shape_parses_doc_list_when_no_enum() {
        let shape = Shape::structure(vec![StructureMember {
            name: "Action".into(),
            shape: Shape::string().with_doc("<p>One of:</p><ul><li>allow</li><li>deny</li></ul>"),
            required: true,
        }]);
        let matches = complete_structure(&shape, "");
        let names: Vec<&str> = matches.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Action=allow", "Action=deny"]);
    }

    #[test]
    fn structure_shape_with_no_enumerable_members_is_empty() {
        let shape = Shape::structure(vec![StructureMember {
            name: "Value".into(),
            shape: Shape::string(),
            required: true,
        }]);
        assert!(complete_structure(&shape, "").is_empty());
    }
}
