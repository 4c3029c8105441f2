//! What kind of suggestion the cursor asks for
//!
//! The context is acquired from the tree when the live text parsed, and from
//! a scan of the raw text otherwise. Both produce the same
//! [`CompletionContext`], which [`classify`] turns into a
//! [`CompletionTarget`].

use crate::ast::{ElementCategory, Node, NodeKind, Position, SourceRange};
use crate::document::SyntaxVariant;
use crate::parser::LineIndex;
use crate::path::{parse_path, PathSegment};

use super::format::InsertSite;
use super::text_scan::{open_substitution, scan_site, trailing_path_start, SiteKind};

/// Where the cursor sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPosition {
    /// Inside a `${...}` substitution
    Substitution,
    /// In the path of an export's `field:`
    ExportField,
    MappingKey,
    MappingValue,
    SequenceEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionContext {
    /// Text from the start of the path or value up to the cursor
    pub typed_prefix: String,
    /// The segment being typed, used only to filter suggestions
    pub partial_segment: String,
    /// Range replaced by a suggestion
    pub insert_range: SourceRange,
    /// Like `insert_range`, but starting at the `.` before the partial
    /// segment so bracketed keys can replace it
    pub separator_range: SourceRange,
    /// Completed path segments for paths. For keys, values and entries the
    /// logical path of the enclosing mapping, key or sequence.
    pub resolved_path: Vec<PathSegment>,
    pub syntax: SyntaxVariant,
    pub position: CursorPosition,
    /// The partial segment sits in an unterminated `[`
    pub in_bracket: bool,
    pub site: InsertSite,
}

/// Work out the completion context at `pos`.
///
/// `tree` is the last good tree; `tree_is_current` says whether it was
/// built from `text`.
pub fn completion_context(
    text: &str,
    tree: Option<&Node>,
    tree_is_current: bool,
    syntax: SyntaxVariant,
    pos: Position,
) -> Option<CompletionContext> {
    let lines = LineIndex::new(text);
    let offset = lines.offset(pos);
    let stack = match tree {
        Some(root) if tree_is_current => root.enclosing(pos),
        _ => Vec::new(),
    };

    if let Some(reference) = stack.iter().rev().find(|n| n.kind == NodeKind::Reference) {
        let start = lines.offset(reference.range.start);
        if start <= offset {
            return Some(path_context(text, &lines, start, offset, CursorPosition::Substitution, syntax));
        }
    }
    let substitution_start = stack
        .iter()
        .rev()
        .find(|n| n.kind == NodeKind::Substitution)
        .map(|n| lines.offset(n.range.start) + 2)
        .filter(|start| *start <= offset)
        .or_else(|| open_substitution(text, offset));
    if let Some(content_start) = substitution_start {
        let start = content_start + trailing_path_start(&text[content_start..offset]);
        return Some(path_context(text, &lines, start, offset, CursorPosition::Substitution, syntax));
    }

    let site = scan_site(text, offset, syntax)?;
    let mut path: Vec<PathSegment> = site.path.iter().map(PathSegment::field).collect();
    if site.kind != SiteKind::Key {
        if let Some(from_tree) = tree_path(&stack, site.kind == SiteKind::Entry) {
            if field_names(&from_tree) == site.path {
                path = from_tree;
            }
        }
    }

    let keys = field_names(&path);
    let is_export_field = matches!(keys.as_slice(), [exports, _, field] if exports == "exports" && field == "field");
    if site.kind == SiteKind::Value && is_export_field {
        return Some(path_context(
            text,
            &lines,
            site.prefix_start,
            offset,
            CursorPosition::ExportField,
            syntax,
        ));
    }

    let position = match site.kind {
        SiteKind::Key => CursorPosition::MappingKey,
        SiteKind::Value => CursorPosition::MappingValue,
        SiteKind::Entry => CursorPosition::SequenceEntry,
    };
    let typed = text[site.prefix_start..offset].to_string();
    let range = SourceRange::new(lines.position(site.prefix_start), lines.position(offset));
    Some(CompletionContext {
        partial_segment: typed.clone(),
        typed_prefix: typed,
        insert_range: range,
        separator_range: range,
        resolved_path: path,
        syntax,
        position,
        in_bracket: false,
        site: InsertSite::inspect(text, site.prefix_start, offset),
    })
}

/// Context for a reference path running from `start` to the cursor
fn path_context(
    text: &str,
    lines: &LineIndex<'_>,
    start: usize,
    offset: usize,
    position: CursorPosition,
    syntax: SyntaxVariant,
) -> CompletionContext {
    let typed = &text[start..offset];
    let parsed = parse_path(typed);

    // An open bracket is replaced as a whole
    let partial_start = match parsed.open_bracket {
        Some(open) => start + open,
        None => offset - parsed.partial.len(),
    };
    let separator_start = if text[..partial_start].ends_with('.') && partial_start > start {
        partial_start - 1
    } else {
        partial_start
    };

    CompletionContext {
        typed_prefix: typed.to_string(),
        partial_segment: parsed.partial.clone(),
        insert_range: SourceRange::new(lines.position(partial_start), lines.position(offset)),
        separator_range: SourceRange::new(lines.position(separator_start), lines.position(offset)),
        resolved_path: parsed.segments,
        syntax,
        position,
        in_bracket: parsed.malformed,
        site: InsertSite::inspect(text, partial_start, offset),
    }
}

/// Logical path of the innermost scalar in `stack`, with sequence indices.
/// For entries the path of the sequence holding the scalar.
fn tree_path(stack: &[&Node], entry: bool) -> Option<Vec<PathSegment>> {
    let innermost = stack.last()?;
    if innermost.kind != NodeKind::Scalar {
        return None;
    }
    let mut segments = Vec::new();
    for pair in stack.windows(2) {
        let (parent, node) = (pair[0], pair[1]);
        let segment = match parent.kind {
            NodeKind::Sequence => PathSegment::ArrayIndex(node.label.parse().ok()?),
            _ => PathSegment::field(node.label.as_str()),
        };
        segments.push(segment);
    }
    if entry {
        match segments.pop() {
            Some(PathSegment::ArrayIndex(_)) => {}
            _ => return None,
        }
    }
    Some(segments)
}

fn field_names(segments: &[PathSegment]) -> Vec<String> {
    segments
        .iter()
        .filter_map(|s| s.as_field().map(str::to_string))
        .collect()
}

/// The kind of suggestions the context asks for
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionTarget {
    Namespaces,
    ElementNames(ElementCategory),
    /// Path below `resources.<resource>`
    ResourceProperty {
        resource: String,
        path: Vec<PathSegment>,
    },
    /// Path below `values.<value>`
    ValueField {
        value: String,
        path: Vec<PathSegment>,
    },
    DataSourceField {
        data_source: String,
    },
    ChildExport {
        child: String,
    },
    TopLevelSections,
    ResourceFields,
    MetadataFields,
    LinkSelectorFields,
    AnnotationKeys {
        resource: String,
    },
    AnnotationValues {
        resource: String,
        key: String,
    },
    /// Keys inside a resource's `spec`, `path` being relative to `spec`
    SpecFields {
        resource: String,
        path: Vec<PathSegment>,
    },
    DataSourceExportFields {
        data_source: String,
    },
    DeclarationFields(ElementCategory),
    ExportFields,
    ResourceTypes,
    DataSourceTypes,
    ScalarTypes,
    /// Resources and children, other than the declaring element
    DependencyNames {
        exclude: String,
    },
    ResourceNames {
        exclude: String,
    },
    Nothing,
}

/// Decide which suggestions to offer
pub fn classify(context: &CompletionContext) -> CompletionTarget {
    match context.position {
        CursorPosition::Substitution | CursorPosition::ExportField => {
            classify_reference(&context.resolved_path)
        }
        CursorPosition::MappingKey => classify_key(&context.resolved_path),
        CursorPosition::MappingValue => classify_value(&context.resolved_path),
        CursorPosition::SequenceEntry => classify_entry(&context.resolved_path),
    }
}

fn classify_reference(path: &[PathSegment]) -> CompletionTarget {
    let Some(first) = path.first() else {
        return CompletionTarget::Namespaces;
    };
    let Some(category) = first.as_field().and_then(ElementCategory::from_namespace) else {
        return CompletionTarget::Nothing;
    };
    let Some(name) = path.get(1).and_then(PathSegment::as_field) else {
        return match path.len() {
            1 => CompletionTarget::ElementNames(category),
            _ => CompletionTarget::Nothing,
        };
    };
    let name = name.to_string();
    let rest = path[2..].to_vec();
    match category {
        ElementCategory::Resource => CompletionTarget::ResourceProperty {
            resource: name,
            path: rest,
        },
        ElementCategory::Value => CompletionTarget::ValueField { value: name, path: rest },
        ElementCategory::DataSource if rest.is_empty() => {
            CompletionTarget::DataSourceField { data_source: name }
        }
        ElementCategory::Child if rest.is_empty() => CompletionTarget::ChildExport { child: name },
        _ => CompletionTarget::Nothing,
    }
}

fn classify_key(path: &[PathSegment]) -> CompletionTarget {
    let keys = field_names(path);
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    match keys.as_slice() {
        [] => CompletionTarget::TopLevelSections,
        ["resources", _] => CompletionTarget::ResourceFields,
        ["resources", _, "metadata"] | ["datasources", _, "metadata"] => {
            CompletionTarget::MetadataFields
        }
        ["resources", resource, "metadata", "annotations"] => CompletionTarget::AnnotationKeys {
            resource: resource.to_string(),
        },
        ["resources", _, "linkSelector"] => CompletionTarget::LinkSelectorFields,
        ["resources", resource, "spec", ..] => CompletionTarget::SpecFields {
            resource: resource.to_string(),
            path: spec_relative(path),
        },
        ["datasources", data_source, "exports"] => CompletionTarget::DataSourceExportFields {
            data_source: data_source.to_string(),
        },
        ["exports", _] => CompletionTarget::ExportFields,
        [section, _] => match ElementCategory::from_section(section) {
            Some(category) => CompletionTarget::DeclarationFields(category),
            None => CompletionTarget::Nothing,
        },
        _ => CompletionTarget::Nothing,
    }
}

/// Segments after the `spec` key of a resource path
fn spec_relative(path: &[PathSegment]) -> Vec<PathSegment> {
    path.iter()
        .position(|s| s.as_field() == Some("spec"))
        .map(|i| path[i + 1..].to_vec())
        .unwrap_or_default()
}

fn classify_value(path: &[PathSegment]) -> CompletionTarget {
    let keys = field_names(path);
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    match keys.as_slice() {
        ["resources", _, "type"] => CompletionTarget::ResourceTypes,
        ["datasources", _, "type"] => CompletionTarget::DataSourceTypes,
        ["variables" | "values" | "exports", _, "type"] => CompletionTarget::ScalarTypes,
        ["resources", resource, "metadata", "annotations", key] => {
            CompletionTarget::AnnotationValues {
                resource: resource.to_string(),
                key: key.to_string(),
            }
        }
        _ => CompletionTarget::Nothing,
    }
}

fn classify_entry(path: &[PathSegment]) -> CompletionTarget {
    let keys = field_names(path);
    let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
    match keys.as_slice() {
        ["resources" | "include", name, "dependsOn"] => CompletionTarget::DependencyNames {
            exclude: name.to_string(),
        },
        ["resources", name, "linkSelector", "exclude"] => CompletionTarget::ResourceNames {
            exclude: name.to_string(),
        },
        _ => CompletionTarget::Nothing,
    }
}
