//! Authored literal value trees
//!
//! Free-form data such as `values.<name>.value` and
//! `resources.<name>.metadata.custom` has no declared schema, so completion
//! walks the authored data instead.

use crate::ast::{Node, NodeKind, Payload, Scalar};
use crate::path::PathSegment;

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Fields(Vec<(String, LiteralValue)>),
    Items(Vec<LiteralValue>),
    Scalar(Scalar),
    StringWithSubstitutions(String),
}

impl LiteralValue {
    /// Build a literal tree from a document subtree
    pub fn from_node(node: &Node) -> Self {
        match node.kind {
            NodeKind::Sequence => {
                LiteralValue::Items(node.children.iter().map(LiteralValue::from_node).collect())
            }
            NodeKind::Scalar => match &node.payload {
                Payload::Scalar(scalar) => LiteralValue::Scalar(scalar.clone()),
                _ => LiteralValue::Scalar(Scalar::Null),
            },
            NodeKind::StringWithSubstitutions => {
                LiteralValue::StringWithSubstitutions(node.as_str().unwrap_or_default().to_string())
            }
            NodeKind::Substitution | NodeKind::Reference | NodeKind::PathItem => {
                LiteralValue::StringWithSubstitutions(node.label.clone())
            }
            NodeKind::Document
            | NodeKind::Section
            | NodeKind::Declaration
            | NodeKind::Export
            | NodeKind::Mapping => LiteralValue::Fields(
                node.children
                    .iter()
                    .map(|child| (child.label.clone(), LiteralValue::from_node(child)))
                    .collect(),
            ),
        }
    }

    /// Terminal values never yield further suggestions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LiteralValue::Scalar(_) | LiteralValue::StringWithSubstitutions(_)
        )
    }

    pub fn field(&self, key: &str) -> Option<&LiteralValue> {
        match self {
            LiteralValue::Fields(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            LiteralValue::Fields(fields) => fields.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    /// Short type label used in completion details
    pub fn type_label(&self) -> &'static str {
        match self {
            LiteralValue::Fields(_) => "object",
            LiteralValue::Items(_) => "array",
            LiteralValue::Scalar(scalar) => scalar.type_label(),
            LiteralValue::StringWithSubstitutions(_) => "string",
        }
    }
}

/// Walk a literal tree along `segments`
pub fn navigate<'a>(root: &'a LiteralValue, segments: &[PathSegment]) -> Option<&'a LiteralValue> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::FieldName(name), LiteralValue::Fields(_)) => current.field(name)?,
            (PathSegment::ArrayIndex(index), LiteralValue::Items(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}
