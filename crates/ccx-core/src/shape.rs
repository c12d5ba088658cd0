// SPDX-License-Identifier: MIT OR Apache-2.0
//! A minimal view over a cloud service operation's input/output shape tree.
//!
//! Real cloud SDKs expose a much richer shape description (botocore calls
//! it a "service model"); [`Shape`] captures only what the planner and the
//! completion engine need to walk: structure members, list/map element
//! shapes, string enums, and scalar leaves.

use serde::{Deserialize, Serialize};

/// One scalar leaf kind recognised by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    /// Fixed-width signed integer.
    Integer,
    /// Wide signed integer.
    Long,
    /// Single-precision float.
    Float,
    /// Double-precision float.
    Double,
    /// Timestamp (ISO-8601 or epoch, depending on the operation).
    Timestamp,
}

/// A named member of a [`ShapeKind::Structure`], carrying whether the
/// operation marks it as required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureMember {
    /// Member name as it appears in the operation's shape (e.g. `"VpcId"`).
    pub name: String,
    /// The member's own shape.
    pub shape: Shape,
    /// Whether this operation requires the member to be supplied.
    pub required: bool,
}

/// The shape of a value: a structure, list, map, enumerable string, or
/// scalar leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// An ordered set of named members.
    Structure(Vec<StructureMember>),
    /// A homogeneous list; the element shape.
    List(Box<Shape>),
    /// A string-keyed map; the value shape (keys are opaque strings).
    Map(Box<Shape>),
    /// A string, optionally restricted to an enumerated set of values.
    String {
        /// The fixed set of values this string may take, if restricted.
        enum_values: Option<Vec<String>>,
    },
    /// A numeric or timestamp scalar.
    Scalar(ScalarKind),
}

/// A shape node: its kind plus optional documentation (used by the
/// completion engine to render help text).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// The structural kind of this shape.
    pub kind: ShapeKind,
    /// Free-text documentation, if the operation model carries any.
    pub documentation: Option<String>,
}

impl Shape {
    /// Construct a shape with no documentation.
    #[must_use]
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            documentation: None,
        }
    }

    /// Attach documentation to this shape, builder-style.
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    /// Convenience constructor for a structure shape.
    #[must_use]
    pub fn structure(members: Vec<StructureMember>) -> Self {
        Self::new(ShapeKind::Structure(members))
    }

    /// Convenience constructor for a list shape.
    #[must_use]
    pub fn list(member: Shape) -> Self {
        Self::new(ShapeKind::List(Box::new(member)))
    }

    /// Convenience constructor for a map shape.
    #[must_use]
    pub fn map(value: Shape) -> Self {
        Self::new(ShapeKind::Map(Box::new(value)))
    }

    /// Convenience constructor for an unrestricted string shape.
    #[must_use]
    pub fn string() -> Self {
        Self::new(ShapeKind::String { enum_values: None })
    }

    /// Convenience constructor for an enum-restricted string shape.
    #[must_use]
    pub fn string_enum(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(ShapeKind::String {
            enum_values: Some(values.into_iter().map(Into::into).collect()),
        })
    }

    /// Convenience constructor for a scalar shape.
    #[must_use]
    pub fn scalar(kind: ScalarKind) -> Self {
        Self::new(ShapeKind::Scalar(kind))
    }

    /// The enum values of this shape, or of a list's element shape if this
    /// is a list-of-enum (the common "one or more of these values" case).
    #[must_use]
    pub fn enum_values(&self) -> Option<&[String]> {
        match &self.kind {
            ShapeKind::String {
                enum_values: Some(v),
            } => Some(v),
            ShapeKind::List(member) => member.enum_values(),
            _ => None,
        }
    }

    /// Whether this shape (or its list element) is a string enum.
    #[must_use]
    pub fn is_enum_or_list_of_enum(&self) -> bool {
        self.enum_values().is_some()
    }

    /// The required members of a structure shape, in declaration order.
    /// Returns an empty vec for non-structure shapes.
    #[must_use]
    pub fn required_members(&self) -> Vec<&StructureMember> {
        match &self.kind {
            ShapeKind::Structure(members) => members.iter().filter(|m| m.required).collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_of_enum_reports_enum_values() {
        let shape = Shape::list(Shape::string_enum(["a", "b"]));
        assert_eq!(shape.enum_values(), Some(&["a".to_string(), "b".to_string()][..]));
        assert!(shape.is_enum_or_list_of_enum());
    }

    #[test]
    fn plain_string_has_no_enum_values() {
        assert_eq!(Shape::string().enum_values(), None);
    }

    #[test]
    fn required_members_filters_correctly() {
        let shape = Shape::structure(vec![
            StructureMember {
                name: "VpcId".into(),
                shape: Shape::string(),
                required: true,
            },
            StructureMember {
                name: "Tag".into(),
                shape: Shape::string(),
                required: false,
            },
        ]);
        let req = shape.required_members();
        assert_eq!(req.len(), 1);
        assert_eq!(req[0].name, "VpcId");
    }
}
