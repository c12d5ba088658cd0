// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`OutputPath`] is a traversal address into a shape tree: a sequence of
//! field names and "iterate into a collection" markers.

use ccx_core::{tokenise, Shape, ShapeKind};

/// The recursion depth a shape walk will not exceed. Cloud API shape trees
/// can be mutually recursive (a `Filter` shape nesting another `Filter`
/// shape, say); walking without a cutoff can loop forever.
const MAX_DEPTH: u32 = 10;

/// One step of an [`OutputPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Descend into a named structure member.
    Field(String),
    /// Iterate every element of a list or every value of a map.
    Iterate,
}

/// An address into a shape tree, and the runtime equivalent: an address
/// into the JSON value an operation returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct OutputPath(Vec<PathSegment>);

impl OutputPath {
    /// The empty path (the root of the tree).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// The raw segment sequence, for callers that need to walk a runtime
    /// JSON value in lock-step (see `ccx_grabber::execute`).
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// This path with `segment` appended.
    #[must_use]
    pub fn appended(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// This path with `other`'s segments appended.
    #[must_use]
    pub fn extended(&self, other: &OutputPath) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Self(segments)
    }

    /// The field-name segments, in order, with [`PathSegment::Iterate`]
    /// markers dropped.
    #[must_use]
    pub fn non_branching(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|s| match s {
                PathSegment::Field(name) => Some(name.as_str()),
                PathSegment::Iterate => None,
            })
            .collect()
    }

    /// The tokenised form of [`non_branching`](Self::non_branching),
    /// suitable as the `items` argument to [`crate::KeySpec::score`].
    #[must_use]
    pub fn for_scoring(&self) -> Vec<String> {
        tokenise(&self.non_branching().join(" "))
    }

    /// Render as a JMESPath-like expression: `.field` for each field step,
    /// `[]` for each iterate step, with no leading dot.
    #[must_use]
    pub fn to_jmespath(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            match segment {
                PathSegment::Field(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Iterate => out.push_str("[]"),
            }
        }
        out
    }

    /// Every leaf (scalar or enumerable-string) path reachable from
    /// `shape`, paired with the leaf's own shape. Used by the planner,
    /// which only ever binds a key to a scalar value.
    #[must_use]
    pub fn from_shape(shape: &Shape) -> Vec<(OutputPath, Shape)> {
        let mut out = Vec::new();
        walk(&OutputPath::root(), shape, None, MAX_DEPTH, true, &mut out);
        out.into_iter().map(|(p, s, _)| (p, s)).collect()
    }

    /// Every path reachable from `shape`, including intermediate
    /// (structure/list/map) nodes, each paired with its shape and its
    /// immediate parent's shape. Used by the completion engine to offer
    /// `--query` suggestions at every depth, not just leaves.
    #[must_use]
    pub fn enumerate_all(shape: &Shape) -> Vec<(OutputPath, Shape, Option<Shape>)> {
        let mut out = Vec::new();
        walk(&OutputPath::root(), shape, None, MAX_DEPTH, false, &mut out);
        out
    }
}

fn walk(
    prefix: &OutputPath,
    shape: &Shape,
    parent: Option<&Shape>,
    depth_left: u32,
    only_leaves: bool,
    out: &mut Vec<(OutputPath, Shape, Option<Shape>)>,
) {
    if depth_left == 0 {
        return;
    }
    match &shape.kind {
        ShapeKind::Structure(members) => {
            if !only_leaves {
                out.push((prefix.clone(), shape.clone(), parent.cloned()));
            }
            for member in members {
                let next = prefix.appended(PathSegment::Field(member.name.clone()));
                walk(&next, &member.shape, Some(shape), depth_left - 1, only_leaves, out);
            }
        }
        ShapeKind::List(member) => {
            if !only_leaves {
                out.push((prefix.clone(), shape.clone(), parent.cloned()));
            }
            let next = prefix.appended(PathSegment::Iterate);
            walk(&next, member, Some(shape), depth_left - 1, only_leaves, out);
        }
        ShapeKind::Map(value) => {
            if !only_leaves {
                out.push((prefix.clone(), shape.clone(), parent.cloned()));
            }
            let next = prefix.appended(PathSegment::Iterate);
            walk(&next, value, Some(shape), depth_left - 1, only_leaves, out);
        }
        ShapeKind::String { .. } | ShapeKind::Scalar(_) => {
            out.push((prefix.clone(), shape.clone(), parent.cloned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccx_core::StructureMember;

    fn instance_shape() -> Shape {
        Shape::structure(vec![
            StructureMember {
                name: "Reservations".into(),
                shape: Shape::list(Shape::structure(vec![StructureMember {
                    name: "Instances".into(),
                    shape: Shape::list(Shape::structure(vec![StructureMember {
                        name: "InstanceId".into(),
                        shape: Shape::string(),
                        required: true,
                    }])),
                    required: false,
                }])),
                required: false,
            },
        ])
    }

    #[test]
    fn from_shape_finds_nested_leaf_with_iterate_markers() {
        let leaves = OutputPath::from_shape(&instance_shape());
        assert_eq!(leaves.len(), 1);
        let (path, _) = &leaves[0];
        assert_eq!(path.to_jmespath(), "Reservations[].Instances[].InstanceId");
        assert_eq!(path.for_scoring(), vec!["reservation".to_string(), "instance".to_string(), "instance".to_string(), "id".to_string()]);
    }

    #[test]
    fn depth_cutoff_stops_infinite_recursion() {
        // A self-referential shape would recurse forever without a cutoff;
        // emulate that by nesting the same structure kind past MAX_DEPTH.
        let mut shape = Shape::string();
        for _ in 0..(MAX_DEPTH + 5) {
            shape = Shape::structure(vec![StructureMember {
                name: "Next".into(),
                shape,
                required: true,
            }]);
        }
        let leaves = OutputPath::from_shape(&shape);
        assert!(leaves.is_empty(), "cutoff should prevent reaching the scalar leaf");
    }

    #[test]
    fn enumerate_all_includes_intermediate_nodes() {
        let all = OutputPath::enumerate_all(&instance_shape());
        let root_present = all.iter().any(|(p, _, _)| p.to_jmespath().is_empty());
        assert!(root_present);
        assert!(all.len() > OutputPath::from_shape(&instance_shape()).len());
    }
}
