//! Builds the document tree from a parsed value and its source text

use serde_yaml::{Mapping, Value};

use crate::ast::{
    join_path, ElementCategory, Node, NodeKind, Payload, Reference, Scalar, SourceRange,
};
use crate::path::{parse_path_spanned, PathSegment};

use super::locator::{
    container_end, find_key, indent_at, rest_of_line_is_empty, scalar_extent, skip_item_markers,
    skip_trivia, LineIndex,
};
use super::substitutions::{find_reference_spans, scan_substitutions, DecodedScalar};

pub(crate) struct TreeBuilder<'t> {
    text: &'t str,
    lines: LineIndex<'t>,
    /// Every value is in flow context (JSON)
    all_flow: bool,
}

impl<'t> TreeBuilder<'t> {
    pub fn new(text: &'t str, all_flow: bool) -> Self {
        Self {
            text,
            lines: LineIndex::new(text),
            all_flow,
        }
    }

    pub fn build(&self, value: &Value) -> Node {
        let children = match untag(value) {
            Value::Mapping(mapping) => self.entries(mapping, "", 0, self.all_flow).0,
            _ => Vec::new(),
        };
        Node::new(NodeKind::Document, "", "")
            .with_range(self.range(0, self.text.len()))
            .with_children(children)
    }

    fn range(&self, start: usize, end: usize) -> SourceRange {
        SourceRange::new(self.lines.position(start), self.lines.position(end.max(start)))
    }

    fn entries(&self, mapping: &Mapping, parent: &str, from: usize, flow: bool) -> (Vec<Node>, usize) {
        let mut pos = from;
        let mut nodes = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let Some(label) = key_label(key) else {
                continue;
            };
            let path = join_path(parent, &label);
            let (key_start, value_from) = find_key(self.text, pos, &label).unwrap_or((pos, pos));
            let (node, end) = self.value_node(value, &label, &path, key_start, value_from, flow);
            pos = end.max(value_from);
            nodes.push(node);
        }
        (nodes, pos)
    }

    fn value_node(
        &self,
        value: &Value,
        label: &str,
        path: &str,
        node_start: usize,
        value_from: usize,
        flow: bool,
    ) -> (Node, usize) {
        let value = untag(value);
        let (node, end) = match value {
            Value::Mapping(mapping) => {
                let open = skip_trivia(self.text, value_from);
                let braced = self.text[open..].starts_with('{');
                let (children, children_end) = self.entries(mapping, path, value_from, flow || braced);
                let end = if braced {
                    container_end(self.text, open).unwrap_or(children_end)
                } else {
                    children_end
                };
                let node = Node::new(NodeKind::Mapping, label, path).with_children(children);
                (node, end)
            }
            Value::Sequence(items) => {
                let open = skip_trivia(self.text, value_from);
                let bracketed = self.text[open..].starts_with('[');
                let mut pos = value_from;
                let mut children = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_start = skip_item_markers(self.text, pos);
                    let item_label = index.to_string();
                    let item_path = join_path(path, &item_label);
                    let (child, end) = self.value_node(
                        item,
                        &item_label,
                        &item_path,
                        item_start,
                        item_start,
                        flow || bracketed,
                    );
                    pos = end.max(item_start);
                    children.push(child);
                }
                let end = if bracketed {
                    container_end(self.text, open).unwrap_or(pos)
                } else {
                    pos
                };
                let node = Node::new(NodeKind::Sequence, label, path).with_children(children);
                (node, end)
            }
            scalar => self.scalar_node(scalar, label, path, node_start, value_from, flow),
        };
        let node = node.with_range(self.range(node_start, end));
        (classify_declaration(node, value), end)
    }

    fn scalar_node(
        &self,
        value: &Value,
        label: &str,
        path: &str,
        node_start: usize,
        value_from: usize,
        flow: bool,
    ) -> (Node, usize) {
        let scalar = to_scalar(value);
        if scalar == Scalar::Null && rest_of_line_is_empty(self.text, value_from) {
            let node = Node::new(NodeKind::Scalar, label, path).with_payload(Payload::Scalar(scalar));
            return (node, value_from);
        }

        let start = skip_trivia(self.text, value_from);
        let end = scalar_extent(self.text, start, flow, indent_at(self.text, node_start));

        let substitutions = match &scalar {
            Scalar::String(s) if s.contains("${") => self.substitution_nodes(start, end, path),
            _ => Vec::new(),
        };
        let kind = if substitutions.is_empty() {
            NodeKind::Scalar
        } else {
            NodeKind::StringWithSubstitutions
        };
        let node = Node::new(kind, label, path)
            .with_payload(Payload::Scalar(scalar))
            .with_children(substitutions);
        (node, end)
    }

    fn substitution_nodes(&self, start: usize, end: usize, path: &str) -> Vec<Node> {
        let decoded = DecodedScalar::new(&self.text[start..end], start);
        let value = decoded.text.as_str();
        scan_substitutions(value)
            .into_iter()
            .map(|span| {
                // Content sits between `${` and `}`
                let content_start = span.start + 2;
                let content = &value[content_start..span.end - 1];
                let references = find_reference_spans(content)
                    .into_iter()
                    .filter_map(|r| {
                        self.reference_node(&decoded, content_start + r.start, content_start + r.end, path)
                    })
                    .collect();
                Node::new(NodeKind::Substitution, &value[span.clone()], path)
                    .with_range(self.decoded_range(&decoded, span.start, span.end))
                    .with_children(references)
            })
            .collect()
    }

    fn decoded_range(&self, decoded: &DecodedScalar, start: usize, end: usize) -> SourceRange {
        self.range(decoded.source_offset(start), decoded.source_offset(end))
    }

    /// Reference node for `decoded.text[start..end]`
    fn reference_node(&self, decoded: &DecodedScalar, start: usize, end: usize, path: &str) -> Option<Node> {
        let text = &decoded.text[start..end];
        let (parsed, mut spans) = parse_path_spanned(text);
        if !parsed.partial.is_empty() {
            spans.push(text.len() - parsed.partial.len()..text.len());
        }
        let segments = parsed.full();
        let reference = reference_from_segments(&segments)?;

        let items = segments
            .iter()
            .zip(spans)
            .map(|(segment, span)| {
                Node::new(NodeKind::PathItem, segment.to_string(), path)
                    .with_range(self.decoded_range(decoded, start + span.start, start + span.end))
                    .with_payload(Payload::PathItem(segment.clone()))
            })
            .collect();

        Some(
            Node::new(NodeKind::Reference, text, path)
                .with_range(self.decoded_range(decoded, start, end))
                .with_payload(Payload::Reference(reference))
                .with_children(items),
        )
    }
}

/// Turn `[namespace, name, rest...]` into a reference
pub fn reference_from_segments(segments: &[PathSegment]) -> Option<Reference> {
    let category = ElementCategory::from_namespace(segments.first()?.as_field()?)?;
    let name = segments.get(1)?.as_field()?.to_string();
    Some(Reference {
        category,
        name,
        path: segments[2..].to_vec(),
    })
}

/// Mark sections, declarations and exports based on their logical path
fn classify_declaration(node: Node, value: &Value) -> Node {
    let parts: Vec<&str> = node.path.split('/').filter(|p| !p.is_empty()).collect();
    match parts.as_slice() {
        [section] if ElementCategory::from_section(section).is_some() || *section == "exports" => {
            if node.kind == NodeKind::Mapping {
                Node { kind: NodeKind::Section, ..node }
            } else {
                node
            }
        }
        ["exports", _] => {
            let field = value
                .get("field")
                .and_then(Value::as_str)
                .map(str::to_string);
            Node {
                kind: NodeKind::Export,
                payload: Payload::Export { field },
                ..node
            }
        }
        [section, _] => match ElementCategory::from_section(section) {
            Some(category) if matches!(node.kind, NodeKind::Mapping | NodeKind::Scalar) => Node {
                kind: NodeKind::Declaration,
                payload: Payload::Declaration(category),
                ..node
            },
            _ => node,
        },
        _ => node,
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

fn key_label(key: &Value) -> Option<String> {
    match untag(key) {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn to_scalar(value: &Value) -> Scalar {
    match value {
        Value::String(s) => Scalar::String(s.clone()),
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Scalar::Int(i),
            None => Scalar::Float(n.as_f64().unwrap_or_default()),
        },
        _ => Scalar::Null,
    }
}
