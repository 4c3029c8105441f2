//! Which declared element the cursor is on

use crate::ast::{Node, NodeKind, Payload};

use super::{bare_name_identity, export_field_identity, path_matches, ElementIdentity};

/// Resolve the element named at the cursor.
///
/// `stack` holds the enclosing nodes, outermost (the document root) first
/// and innermost last. Tried in order: a reference expression, a bare name
/// in a reference position, a declaration.
pub fn resolve_identity(stack: &[&Node]) -> Option<ElementIdentity> {
    let (innermost, ancestors) = stack.split_last()?;
    let root = stack.first()?;

    let reference_node = match innermost.kind {
        NodeKind::PathItem => ancestors.last().copied(),
        _ => Some(*innermost),
    };
    if let Some(reference) = reference_node.and_then(Node::as_reference) {
        return Some(ElementIdentity::new(reference.category, reference.name.clone()));
    }

    if innermost.kind == NodeKind::Scalar {
        if let Some(value) = innermost.as_str() {
            if let Some(identity) = bare_name_identity(root, &innermost.path, value) {
                return Some(identity);
            }
            if path_matches(&innermost.path, "/exports/*/field") {
                return match export_field_identity(value) {
                    Ok(identity) => Some(identity),
                    Err(err) => {
                        tracing::debug!("Export field names no element: {}", err);
                        None
                    }
                };
            }
        }
    }

    match &innermost.payload {
        Payload::Declaration(category) => Some(ElementIdentity::new(*category, innermost.label.clone())),
        _ => None,
    }
}
