//! Every place in a document that names a given element

use crate::ast::{Node, NodeKind, Payload, SourceRange};

use super::{bare_name_identity, export_field_identity, ElementIdentity};

/// Ranges of every reference to `identity` in the tree under `root`, in
/// document order. With `include_declaration` the declaring node's range
/// comes first.
pub fn find_reference_ranges(
    root: &Node,
    identity: &ElementIdentity,
    include_declaration: bool,
) -> Vec<SourceRange> {
    let mut ranges = Vec::new();
    if include_declaration {
        if let Some(declaration) = root.find_path(&identity.definition_path) {
            ranges.push(declaration.range);
        }
    }
    root.walk(&mut |node| {
        if let Some(range) = match_node(root, node, identity) {
            ranges.push(range);
        }
    });
    ranges
}

/// The range to report when `node` refers to `identity`
fn match_node(root: &Node, node: &Node, identity: &ElementIdentity) -> Option<SourceRange> {
    match &node.payload {
        Payload::Reference(reference) => {
            (reference.category == identity.category && reference.name == identity.name)
                .then_some(node.range)
        }
        Payload::Export { field: Some(field) } => export_field_identity(field)
            .ok()
            .filter(|found| found == identity)
            .map(|_| node.child("field").map_or(node.range, |field| field.range)),
        Payload::Scalar(_) if node.kind == NodeKind::Scalar => {
            let value = node.as_str().filter(|value| *value == identity.name)?;
            bare_name_identity(root, &node.path, value)
                .filter(|found| found == identity)
                .map(|_| node.range)
        }
        _ => None,
    }
}
