//! Find references

use crate::ast::{Position, SourceRange};
use crate::resolve::{find_reference_ranges, resolve_identity};
use crate::workspace::Snapshot;

/// Ranges referencing the element at `pos`, in document order after the
/// declaration when it is included
pub fn find_references(snapshot: &Snapshot, pos: Position, include_declaration: bool) -> Vec<SourceRange> {
    let Some(root) = snapshot.tree() else {
        return Vec::new();
    };
    let stack = root.enclosing(pos);
    let Some(identity) = resolve_identity(&stack) else {
        tracing::debug!("No element at {:?}", pos);
        return Vec::new();
    };
    find_reference_ranges(root, &identity, include_declaration)
}
