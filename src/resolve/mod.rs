//! Cursor to element resolution and cross-reference search

mod identity;
mod references;

use crate::ast::{ElementCategory, Node};
use crate::error::{Error, Result};
use crate::parser::reference_from_segments;
use crate::path::parse_path;

pub use identity::resolve_identity;
pub use references::find_reference_ranges;

/// A declared element, addressed by category and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementIdentity {
    pub category: ElementCategory,
    pub name: String,
    /// Logical path of the declaring node, e.g. `/resources/ordersTable`
    pub definition_path: String,
}

impl ElementIdentity {
    pub fn new(category: ElementCategory, name: impl Into<String>) -> Self {
        let name = name.into();
        let definition_path = format!("/{}/{}", category.section(), name);
        Self {
            category,
            name,
            definition_path,
        }
    }
}

/// Positions holding a bare element name instead of a `${}` reference
const BARE_NAME_POSITIONS: [(&str, BareNameKind); 3] = [
    ("/resources/*/dependsOn/*", BareNameKind::Dependency),
    ("/include/*/dependsOn/*", BareNameKind::Dependency),
    ("/resources/*/linkSelector/exclude/*", BareNameKind::Resource),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BareNameKind {
    /// A resource or a child, whichever is declared
    Dependency,
    Resource,
}

/// Whether a slash path matches a pattern where `*` stands for one segment
pub fn path_matches(path: &str, pattern: &str) -> bool {
    let mut parts = path.split('/').filter(|p| !p.is_empty());
    let mut expected = pattern.split('/').filter(|p| !p.is_empty());
    loop {
        match (parts.next(), expected.next()) {
            (None, None) => return true,
            (Some(part), Some(want)) if want == "*" || part == want => {}
            _ => return false,
        }
    }
}

/// The element a bare name at `path` refers to, if `path` is a bare-name
/// position
fn bare_name_identity(root: &Node, path: &str, name: &str) -> Option<ElementIdentity> {
    let (_, kind) = BARE_NAME_POSITIONS
        .iter()
        .find(|(pattern, _)| path_matches(path, pattern))?;
    let category = match kind {
        BareNameKind::Resource => ElementCategory::Resource,
        BareNameKind::Dependency => dependency_category(root, name),
    };
    Some(ElementIdentity::new(category, name))
}

/// A dependency names a resource if one is declared, else a child if one
/// is declared, else a resource
fn dependency_category(root: &Node, name: &str) -> ElementCategory {
    let declared = |category: ElementCategory| {
        root.child(category.section())
            .and_then(|section| section.child(name))
            .is_some()
    };
    if declared(ElementCategory::Resource) {
        ElementCategory::Resource
    } else if declared(ElementCategory::Child) {
        ElementCategory::Child
    } else {
        ElementCategory::Resource
    }
}

/// The element an export's `field:` path starts with
pub fn export_field_identity(field: &str) -> Result<ElementIdentity> {
    let parsed = parse_path(field);
    if parsed.malformed && parsed.segments.len() < 2 {
        // The element name itself sits in an open bracket
        return Err(Error::MalformedPath(field.to_string()));
    }
    reference_from_segments(&parsed.full())
        .map(|reference| ElementIdentity::new(reference.category, reference.name))
        .ok_or_else(|| Error::UnresolvedReference(field.to_string()))
}
