//! Schema-correlated document tree
//!
//! The tree is produced by [`crate::parser::parse_document`] and is read-only
//! for everything else in the crate. Positions are 1-indexed.

use crate::path::PathSegment;

/// A 1-indexed line/column position in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A source range. `end` points one column past the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

impl SourceRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Zero-width range at `pos`
    pub fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    /// Whether `pos` lies within the range. The end is inclusive so a cursor
    /// placed directly after a token still belongs to it.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// The kind of element a blueprint declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    Resource,
    Variable,
    Value,
    DataSource,
    Child,
}

impl ElementCategory {
    pub const ALL: [ElementCategory; 5] = [
        ElementCategory::Resource,
        ElementCategory::Variable,
        ElementCategory::Value,
        ElementCategory::DataSource,
        ElementCategory::Child,
    ];

    /// The top-level document section holding declarations of this category
    pub fn section(self) -> &'static str {
        match self {
            ElementCategory::Resource => "resources",
            ElementCategory::Variable => "variables",
            ElementCategory::Value => "values",
            ElementCategory::DataSource => "datasources",
            ElementCategory::Child => "include",
        }
    }

    /// The namespace used for this category inside reference expressions
    pub fn namespace(self) -> &'static str {
        match self {
            ElementCategory::Resource => "resources",
            ElementCategory::Variable => "variables",
            ElementCategory::Value => "values",
            ElementCategory::DataSource => "datasources",
            ElementCategory::Child => "children",
        }
    }

    pub fn from_section(section: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.section() == section)
    }

    pub fn from_namespace(namespace: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.namespace() == namespace)
    }

    /// Human readable name used in hover text
    pub fn display_name(self) -> &'static str {
        match self {
            ElementCategory::Resource => "resource",
            ElementCategory::Variable => "variable",
            ElementCategory::Value => "value",
            ElementCategory::DataSource => "data source",
            ElementCategory::Child => "child blueprint",
        }
    }
}

/// A reference expression such as `resources.ordersTable.spec.tableName`
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub category: ElementCategory,
    pub name: String,
    /// Segments following the element name
    pub path: Vec<PathSegment>,
}

/// A plain scalar value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short type label used in hover text and completion details
    pub fn type_label(&self) -> &'static str {
        match self {
            Scalar::String(_) => "string",
            Scalar::Int(_) => "integer",
            Scalar::Float(_) => "float",
            Scalar::Bool(_) => "boolean",
            Scalar::Null => "null",
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::String(s) => write!(f, "{}", s),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Null => write!(f, "null"),
        }
    }
}

/// Structural kind of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    /// A top-level section such as `resources`
    Section,
    /// A resource, variable, value, data source or child declaration
    Declaration,
    /// An entry under `exports`
    Export,
    Mapping,
    Sequence,
    Scalar,
    StringWithSubstitutions,
    /// A `${...}` span inside a string
    Substitution,
    /// A reference expression inside a substitution or export field
    Reference,
    /// One segment of a reference path
    PathItem,
}

/// Semantic value attached to a node
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Declaration(ElementCategory),
    Export { field: Option<String> },
    Reference(Reference),
    PathItem(PathSegment),
    Scalar(Scalar),
}

/// A node in the document tree
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Mapping key, sequence index, or source text for expression nodes
    pub label: String,
    pub range: SourceRange,
    /// Logical slash-delimited path, e.g. `/resources/ordersTable/spec`
    pub path: String,
    pub payload: Payload,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(kind: NodeKind, label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            range: SourceRange::default(),
            path: path.into(),
            payload: Payload::None,
            children: Vec::new(),
        }
    }

    pub fn with_range(mut self, range: SourceRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Direct child with the given label
    pub fn child(&self, label: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    /// Descend by logical path relative to this node
    pub fn find_path(&self, path: &str) -> Option<&Node> {
        let mut current = self;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            current = current.child(part)?;
        }
        Some(current)
    }

    /// The string value of a plain or substituted string node
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            Payload::Scalar(scalar) => scalar.as_str(),
            _ => None,
        }
    }

    /// The reference payload, if this node is a reference expression
    pub fn as_reference(&self) -> Option<&Reference> {
        match &self.payload {
            Payload::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// The declared category, if this node is a declaration
    pub fn declared_category(&self) -> Option<ElementCategory> {
        match &self.payload {
            Payload::Declaration(category) => Some(*category),
            _ => None,
        }
    }

    /// Child string values of a sequence node
    pub fn string_items(&self) -> Vec<&str> {
        self.children.iter().filter_map(|c| c.as_str()).collect()
    }

    /// Nodes enclosing `pos`, outermost first and innermost last.
    ///
    /// The root is always included even when `pos` is outside its range, so
    /// callers can rely on a non-empty stack.
    pub fn enclosing(&self, pos: Position) -> Vec<&Node> {
        let mut stack = vec![self];
        let mut current = self;
        while let Some(next) = current
            .children
            .iter()
            .rev()
            .find(|c| c.range.contains(pos))
        {
            stack.push(next);
            current = next;
        }
        stack
    }

    /// Depth-first pre-order traversal
    pub fn walk<'a, F>(&'a self, f: &mut F)
    where
        F: FnMut(&'a Node),
    {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }
}

/// Join a parent logical path and a key
pub fn join_path(parent: &str, key: &str) -> String {
    format!("{}/{}", parent, key)
}
