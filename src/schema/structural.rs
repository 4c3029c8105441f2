//! Provider-declared structural schemas and path navigation over them

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::path::PathSegment;

/// Shape of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Scalar,
    Object,
    Array,
    Map,
}

/// A node of a resource or data source type schema
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub kind: SchemaKind,
    /// Scalar type label (`string`, `integer`, `float`, `boolean`)
    #[serde(default)]
    pub scalar_type: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, SchemaNode>,
    #[serde(default)]
    pub items: Option<Box<SchemaNode>>,
    #[serde(default)]
    pub map_values: Option<Box<SchemaNode>>,
    #[serde(default)]
    pub description: Option<String>,
    /// Set by the provider once deployed, never authored
    #[serde(default)]
    pub computed: bool,
}

impl SchemaNode {
    fn bare(kind: SchemaKind) -> Self {
        Self {
            kind,
            scalar_type: None,
            attributes: BTreeMap::new(),
            items: None,
            map_values: None,
            description: None,
            computed: false,
        }
    }

    pub fn scalar(scalar_type: &str) -> Self {
        Self {
            scalar_type: Some(scalar_type.to_string()),
            ..Self::bare(SchemaKind::Scalar)
        }
    }

    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, SchemaNode)>,
        K: Into<String>,
    {
        Self {
            attributes: attributes.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::bare(SchemaKind::Object)
        }
    }

    pub fn array(items: SchemaNode) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::bare(SchemaKind::Array)
        }
    }

    pub fn map(values: SchemaNode) -> Self {
        Self {
            map_values: Some(Box::new(values)),
            ..Self::bare(SchemaKind::Map)
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Type label for hover and completion detail, e.g. `array[string]`
    pub fn type_label(&self) -> String {
        match self.kind {
            SchemaKind::Scalar => self
                .scalar_type
                .clone()
                .unwrap_or_else(|| "scalar".to_string()),
            SchemaKind::Object => "object".to_string(),
            SchemaKind::Array => match &self.items {
                Some(items) => format!("array[{}]", items.type_label()),
                None => "array".to_string(),
            },
            SchemaKind::Map => match &self.map_values {
                Some(values) => format!("map[{}]", values.type_label()),
                None => "map".to_string(),
            },
        }
    }
}

/// Outcome of walking a schema along a path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaLookup<'a> {
    /// The path resolved to a non-array schema node
    Node(&'a SchemaNode),
    /// The path resolved to an array; callers offer index suggestions
    AtArray(&'a SchemaNode),
    NotFound,
}

impl<'a> SchemaLookup<'a> {
    /// The schema node regardless of whether it is an array
    pub fn node(&self) -> Option<&'a SchemaNode> {
        match self {
            SchemaLookup::Node(node) | SchemaLookup::AtArray(node) => Some(node),
            SchemaLookup::NotFound => None,
        }
    }
}

/// Walk `root` along `segments`.
///
/// A leading `spec` field is skipped. A field segment directly after an
/// array or map addresses the element type.
pub fn navigate<'a>(root: &'a SchemaNode, segments: &[PathSegment]) -> SchemaLookup<'a> {
    let segments = match segments.first() {
        Some(PathSegment::FieldName(name)) if name == "spec" => &segments[1..],
        _ => segments,
    };

    let mut current = root;
    for segment in segments {
        match segment {
            PathSegment::ArrayIndex(_) => match (current.kind, current.items.as_deref()) {
                (SchemaKind::Array, Some(items)) => current = items,
                _ => return SchemaLookup::NotFound,
            },
            PathSegment::FieldName(name) => {
                current = element_schema(current);
                if !matches!(current.kind, SchemaKind::Object | SchemaKind::Map) {
                    return SchemaLookup::NotFound;
                }
                match current.attributes.get(name) {
                    Some(attribute) => current = attribute,
                    None => return SchemaLookup::NotFound,
                }
            }
        }
    }

    if current.kind == SchemaKind::Array {
        SchemaLookup::AtArray(current)
    } else {
        SchemaLookup::Node(current)
    }
}

/// Element type of a collection, or the node itself
fn element_schema(node: &SchemaNode) -> &SchemaNode {
    match node.kind {
        SchemaKind::Array => node.items.as_deref().unwrap_or(node),
        SchemaKind::Map => node.map_values.as_deref().unwrap_or(node),
        _ => node,
    }
}
