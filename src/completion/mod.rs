//! Completion suggestions
//!
//! [`completion_context`] works out where the cursor is, [`classify`] decides
//! what to offer, and [`completions`] gathers the candidates and turns them
//! into edits the client can apply.

mod context;
mod format;
mod text_scan;

use std::collections::BTreeSet;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionTextEdit, Documentation,
    MarkupContent, MarkupKind, TextEdit,
};

use crate::ast::{ElementCategory, Node, NodeKind, SourceRange};
use crate::error::{Error, Result};
use crate::links::resources_in;
use crate::literal::{self, LiteralValue};
use crate::path::{needs_bracket_notation, PathSegment};
use crate::position::range_to_lsp;
use crate::provider::cancellable;
use crate::schema::{self, SchemaKind, SchemaLookup, SchemaNode};
use crate::workspace::{Services, Snapshot};

pub use context::{classify, completion_context, CompletionContext, CompletionTarget, CursorPosition};
pub use format::{adapter_for, FormatAdapter, InsertSite, JsonFormat, YamlFormat};

pub const SECTIONS: &[&str] = &[
    "version",
    "transform",
    "variables",
    "values",
    "include",
    "resources",
    "datasources",
    "exports",
    "metadata",
];

pub const RESOURCE_FIELDS: &[&str] = &[
    "type",
    "description",
    "metadata",
    "linkSelector",
    "dependsOn",
    "condition",
    "each",
    "spec",
];

pub const METADATA_FIELDS: &[&str] = &["displayName", "labels", "annotations", "custom"];

const LINK_SELECTOR_FIELDS: &[&str] = &["byLabel", "exclude"];

const EXPORT_FIELDS: &[&str] = &["type", "field", "description"];

pub const SCALAR_TYPES: &[&str] = &["string", "integer", "float", "boolean"];

/// Properties a resource reference can start with
const RESOURCE_REFERENCE_ROOTS: &[&str] = &["spec", "metadata"];

fn declaration_fields(category: ElementCategory) -> &'static [&'static str] {
    match category {
        ElementCategory::Resource => RESOURCE_FIELDS,
        ElementCategory::Variable => &["type", "description", "default", "allowedValues", "secret"],
        ElementCategory::Value => &["type", "description", "value", "secret"],
        ElementCategory::DataSource => &["type", "description", "metadata", "filter", "exports"],
        ElementCategory::Child => &["path", "description", "variables", "metadata", "dependsOn"],
    }
}

/// A suggestion before it is turned into an edit
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub label: String,
    pub kind: CompletionItemKind,
    pub detail: Option<String>,
    pub documentation: Option<String>,
    /// Set for array index suggestions
    pub index: Option<usize>,
}

impl Candidate {
    pub fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        Self {
            label: label.into(),
            kind,
            detail: None,
            documentation: None,
            index: None,
        }
    }

    fn index(index: usize) -> Self {
        Self {
            index: Some(index),
            ..Self::new(format!("[{}]", index), CompletionItemKind::VALUE)
        }
    }

    fn with_detail(mut self, detail: Option<impl Into<String>>) -> Self {
        self.detail = detail.map(Into::into);
        self
    }

    fn with_documentation(mut self, documentation: Option<impl Into<String>>) -> Self {
        self.documentation = documentation.map(Into::into);
        self
    }

    /// Text matched against the partial segment
    fn match_text(&self) -> String {
        match self.index {
            Some(index) => index.to_string(),
            None => self.label.clone(),
        }
    }
}

fn fields(names: &[&str], kind: CompletionItemKind) -> Vec<Candidate> {
    names.iter().map(|name| Candidate::new(*name, kind)).collect()
}

/// Completion list for `context`, at most `max_items` long
pub async fn completions(
    services: &Services,
    snapshot: &Snapshot,
    context: &CompletionContext,
    max_items: usize,
) -> CompletionList {
    let target = classify(context);
    tracing::debug!("Completion target: {:?}", target);

    let found = match candidates(services, snapshot, context, &target).await {
        Ok(found) => found,
        Err(Error::SchemaUnavailable(message)) => {
            return CompletionList {
                is_incomplete: false,
                items: vec![unavailable_item(context, message)],
            };
        }
        Err(err) => {
            tracing::debug!("No completions for {:?}: {}", target, err);
            Vec::new()
        }
    };

    let partial = context.partial_segment.to_lowercase();
    let mut seen = BTreeSet::new();
    let mut matching: Vec<Candidate> = found
        .into_iter()
        .filter(|candidate| candidate.match_text().to_lowercase().starts_with(&partial))
        .filter(|candidate| seen.insert(candidate.label.clone()))
        .collect();
    let is_incomplete = matching.len() > max_items;
    matching.truncate(max_items);

    let adapter = adapter_for(context.syntax);
    let items = matching
        .into_iter()
        .enumerate()
        .map(|(order, candidate)| completion_item(candidate, order, context, adapter))
        .collect();
    CompletionList { is_incomplete, items }
}

/// Hint shown when the type schema a suggestion needs is unavailable. Its
/// edit leaves the text unchanged.
fn unavailable_item(context: &CompletionContext, message: String) -> CompletionItem {
    CompletionItem {
        label: "No completions available".to_string(),
        kind: Some(CompletionItemKind::TEXT),
        detail: Some(message),
        filter_text: Some(context.partial_segment.clone()),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: range_to_lsp(context.insert_range),
            new_text: context.partial_segment.clone(),
        })),
        ..Default::default()
    }
}

fn completion_item(
    candidate: Candidate,
    order: usize,
    context: &CompletionContext,
    adapter: &dyn FormatAdapter,
) -> CompletionItem {
    let (range, new_text, filter_text) = match context.position {
        CursorPosition::Substitution | CursorPosition::ExportField => {
            path_edit(&candidate, context, adapter)
        }
        CursorPosition::MappingKey => (
            context.insert_range,
            adapter.key_text(&candidate.label, &context.site),
            None,
        ),
        CursorPosition::MappingValue | CursorPosition::SequenceEntry => (
            context.insert_range,
            adapter.value_text(&candidate.label, &context.site),
            None,
        ),
    };
    CompletionItem {
        label: candidate.label,
        kind: Some(candidate.kind),
        detail: candidate.detail,
        documentation: candidate.documentation.map(|value| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            })
        }),
        sort_text: Some(format!("{:04}", order)),
        filter_text,
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: range_to_lsp(range),
            new_text,
        })),
        ..Default::default()
    }
}

/// Edit for a path suggestion. Indices and keys needing bracket notation
/// replace the `.` (or open `[`) before the partial segment.
fn path_edit(
    candidate: &Candidate,
    context: &CompletionContext,
    adapter: &dyn FormatAdapter,
) -> (SourceRange, String, Option<String>) {
    let lead = path_lead(context);
    if let Some(index) = candidate.index {
        return (
            context.separator_range,
            format!("[{}]", index),
            Some(format!("{}{}", lead, index)),
        );
    }
    let bracketed = !context.resolved_path.is_empty()
        && (context.in_bracket || needs_bracket_notation(&candidate.label));
    if !bracketed {
        return (context.insert_range, candidate.label.clone(), None);
    }
    let mut quote = adapter.path_key_quote(&context.site);
    if candidate.label.contains(quote) {
        quote = if quote == '"' { '\'' } else { '"' };
    }
    (
        context.separator_range,
        format!("[{q}{}{q}]", candidate.label, q = quote),
        Some(format!("{}{}", lead, candidate.label)),
    )
}

/// Typed text between the start of the separator range and the partial
/// segment, e.g. `.` or `["`
fn path_lead(context: &CompletionContext) -> &str {
    let typed = context.typed_prefix.as_str();
    let before_partial = typed
        .strip_suffix(context.partial_segment.as_str())
        .unwrap_or(typed);
    if context.in_bracket {
        before_partial
            .rfind('[')
            .map(|at| &before_partial[at..])
            .unwrap_or_default()
    } else if context.separator_range != context.insert_range {
        "."
    } else {
        ""
    }
}

/// Gather unfiltered candidates for `target`
pub async fn candidates(
    services: &Services,
    snapshot: &Snapshot,
    context: &CompletionContext,
    target: &CompletionTarget,
) -> Result<Vec<Candidate>> {
    let Some(root) = snapshot.tree() else {
        return Ok(match target {
            CompletionTarget::Namespaces => namespaces(),
            CompletionTarget::TopLevelSections => fields(SECTIONS, CompletionItemKind::MODULE),
            _ => Vec::new(),
        });
    };
    let token = &snapshot.token;

    let found = match target {
        CompletionTarget::Namespaces => namespaces(),
        CompletionTarget::ElementNames(category) => element_names(root, *category),
        CompletionTarget::ResourceProperty { resource, path } => {
            resource_property(services, snapshot, root, resource, path).await?
        }
        CompletionTarget::ValueField { value, path } => {
            let declaration = declaration(root, ElementCategory::Value, value)?;
            match declaration.child("value") {
                Some(node) => literal_candidates(&LiteralValue::from_node(node), path),
                None => Vec::new(),
            }
        }
        CompletionTarget::DataSourceField { data_source } => {
            let declaration = declaration(root, ElementCategory::DataSource, data_source)?;
            declaration
                .child("exports")
                .map(|exports| {
                    exports
                        .children
                        .iter()
                        .map(|export| {
                            Candidate::new(&export.label, CompletionItemKind::FIELD).with_detail(
                                export.child("type").and_then(Node::as_str),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
        CompletionTarget::ChildExport { child } => {
            let declaration = declaration(root, ElementCategory::Child, child)?;
            let Some(child_path) = declaration.child("path").and_then(Node::as_str) else {
                return Ok(Vec::new());
            };
            let base_dir = snapshot.base_dir();
            let exports = cancellable(
                token,
                services.children.resolve_exports(base_dir.as_deref(), child_path),
            )
            .await?;
            exports
                .unwrap_or_default()
                .into_iter()
                .map(|export| {
                    Candidate::new(export.name, CompletionItemKind::FIELD)
                        .with_detail(export.export_type)
                        .with_documentation(export.description)
                })
                .collect()
        }
        CompletionTarget::TopLevelSections => fields(SECTIONS, CompletionItemKind::MODULE),
        CompletionTarget::ResourceFields => fields(RESOURCE_FIELDS, CompletionItemKind::FIELD),
        CompletionTarget::MetadataFields => fields(METADATA_FIELDS, CompletionItemKind::FIELD),
        CompletionTarget::LinkSelectorFields => {
            fields(LINK_SELECTOR_FIELDS, CompletionItemKind::FIELD)
        }
        CompletionTarget::DeclarationFields(category) => {
            fields(declaration_fields(*category), CompletionItemKind::FIELD)
        }
        CompletionTarget::ExportFields => fields(EXPORT_FIELDS, CompletionItemKind::FIELD),
        CompletionTarget::AnnotationKeys { resource } => {
            let all = resources_in(root);
            let Some(current) = all.iter().find(|info| &info.name == resource) else {
                return Ok(Vec::new());
            };
            services
                .links
                .annotation_keys_for(current, &all, token)
                .await?
                .into_iter()
                .map(|(key, definition)| {
                    Candidate::new(key, CompletionItemKind::PROPERTY)
                        .with_detail(Some("annotation"))
                        .with_documentation(definition.description)
                })
                .collect()
        }
        CompletionTarget::AnnotationValues { resource, key } => {
            let all = resources_in(root);
            let Some(current) = all.iter().find(|info| &info.name == resource) else {
                return Ok(Vec::new());
            };
            let definitions = services.links.annotation_keys_for(current, &all, token).await?;
            match definitions.get(key) {
                Some(definition) => definition
                    .allowed_values
                    .iter()
                    .map(|value| {
                        let is_default = definition.default_value.as_deref() == Some(value.as_str());
                        Candidate::new(value, CompletionItemKind::ENUM_MEMBER)
                            .with_detail(is_default.then_some("default"))
                    })
                    .collect(),
                None => Vec::new(),
            }
        }
        CompletionTarget::SpecFields { resource, path } => {
            let declaration = declaration(root, ElementCategory::Resource, resource)?;
            let schema = services.resource_schema(declaration, token).await?;
            spec_fields(&schema, path)
        }
        CompletionTarget::DataSourceExportFields { data_source } => {
            let declaration = declaration(root, ElementCategory::DataSource, data_source)?;
            let schema = services.data_source_schema(declaration, token).await?;
            schema_attributes(&schema, true)
        }
        CompletionTarget::ResourceTypes => {
            cancellable(token, services.registry.resource_types())
                .await?
                .into_iter()
                .map(|name| Candidate::new(name, CompletionItemKind::CLASS))
                .collect()
        }
        CompletionTarget::DataSourceTypes => {
            cancellable(token, services.registry.data_source_types())
                .await?
                .into_iter()
                .map(|name| Candidate::new(name, CompletionItemKind::CLASS))
                .collect()
        }
        CompletionTarget::ScalarTypes => fields(SCALAR_TYPES, CompletionItemKind::TYPE_PARAMETER),
        CompletionTarget::DependencyNames { exclude } => {
            let mut names = element_names(root, ElementCategory::Resource);
            names.extend(element_names(root, ElementCategory::Child));
            names.retain(|candidate| &candidate.label != exclude);
            names
        }
        CompletionTarget::ResourceNames { exclude } => {
            let mut names = element_names(root, ElementCategory::Resource);
            names.retain(|candidate| &candidate.label != exclude);
            names
        }
        CompletionTarget::Nothing => Vec::new(),
    };

    Ok(without_existing(found, root, context))
}

fn namespaces() -> Vec<Candidate> {
    ElementCategory::ALL
        .into_iter()
        .map(|category| {
            Candidate::new(category.namespace(), CompletionItemKind::MODULE)
                .with_detail(Some(category.display_name()))
        })
        .collect()
}

fn declaration<'a>(root: &'a Node, category: ElementCategory, name: &str) -> Result<&'a Node> {
    root.child(category.section())
        .and_then(|section| section.child(name))
        .ok_or_else(|| Error::UnresolvedReference(format!("{}.{}", category.namespace(), name)))
}

fn element_names(root: &Node, category: ElementCategory) -> Vec<Candidate> {
    let Some(section) = root.child(category.section()) else {
        return Vec::new();
    };
    section
        .children
        .iter()
        .filter(|node| node.declared_category() == Some(category))
        .map(|node| {
            let detail = node
                .child("type")
                .and_then(Node::as_str)
                .unwrap_or(category.display_name());
            let documentation = node.child("description").and_then(Node::as_str);
            Candidate::new(&node.label, CompletionItemKind::REFERENCE)
                .with_detail(Some(detail))
                .with_documentation(documentation)
        })
        .collect()
}

async fn resource_property(
    services: &Services,
    snapshot: &Snapshot,
    root: &Node,
    resource: &str,
    path: &[PathSegment],
) -> Result<Vec<Candidate>> {
    let declaration = declaration(root, ElementCategory::Resource, resource)?;
    let Some(first) = path.first() else {
        return Ok(fields(RESOURCE_REFERENCE_ROOTS, CompletionItemKind::FIELD));
    };
    match first.as_field() {
        Some("metadata") if path.len() == 1 => Ok(fields(METADATA_FIELDS, CompletionItemKind::FIELD)),
        Some("metadata") => Ok(declaration
            .child("metadata")
            .map(|metadata| literal_candidates(&LiteralValue::from_node(metadata), &path[1..]))
            .unwrap_or_default()),
        Some("spec") => {
            let schema = services.resource_schema(declaration, &snapshot.token).await?;
            Ok(match schema::navigate(&schema, path) {
                SchemaLookup::AtArray(_) => {
                    let authored = declaration
                        .child("spec")
                        .map(LiteralValue::from_node)
                        .and_then(|spec| match literal::navigate(&spec, &path[1..]) {
                            Some(LiteralValue::Items(items)) => Some(items.len()),
                            _ => None,
                        })
                        .unwrap_or(0);
                    (0..authored.max(1)).map(Candidate::index).collect()
                }
                SchemaLookup::Node(node) if node.kind == SchemaKind::Map => declaration
                    .child("spec")
                    .map(|spec| literal_candidates(&LiteralValue::from_node(spec), &path[1..]))
                    .unwrap_or_default(),
                SchemaLookup::Node(node) => schema_attributes(node, true),
                SchemaLookup::NotFound => Vec::new(),
            })
        }
        _ => Ok(Vec::new()),
    }
}

/// Keys or indices below `path` in an authored literal tree
fn literal_candidates(root: &LiteralValue, path: &[PathSegment]) -> Vec<Candidate> {
    match literal::navigate(root, path) {
        Some(LiteralValue::Fields(entries)) => entries
            .iter()
            .map(|(key, value)| {
                Candidate::new(key, CompletionItemKind::FIELD).with_detail(Some(value.type_label()))
            })
            .collect(),
        Some(LiteralValue::Items(items)) => (0..items.len()).map(Candidate::index).collect(),
        _ => Vec::new(),
    }
}

/// Attributes of an object schema. Computed attributes are readable in
/// references but never authored.
fn schema_attributes(schema: &SchemaNode, include_computed: bool) -> Vec<Candidate> {
    schema
        .attributes
        .iter()
        .filter(|(_, attribute)| include_computed || !attribute.computed)
        .map(|(name, attribute)| {
            Candidate::new(name, CompletionItemKind::FIELD)
                .with_detail(Some(attribute.type_label()))
                .with_documentation(attribute.description.clone())
        })
        .collect()
}

/// Keys that can be authored at `path` inside a resource's `spec`
fn spec_fields(schema: &SchemaNode, path: &[PathSegment]) -> Vec<Candidate> {
    let mut full = vec![PathSegment::field("spec")];
    full.extend_from_slice(path);
    let node = match schema::navigate(schema, &full) {
        SchemaLookup::Node(node) => node,
        SchemaLookup::AtArray(array) => match array.items.as_deref() {
            Some(items) => items,
            None => return Vec::new(),
        },
        SchemaLookup::NotFound => return Vec::new(),
    };
    match node.kind {
        SchemaKind::Object => schema_attributes(node, false),
        _ => Vec::new(),
    }
}

/// Drop keys and entries already present next to the cursor
fn without_existing(found: Vec<Candidate>, root: &Node, context: &CompletionContext) -> Vec<Candidate> {
    if !matches!(
        context.position,
        CursorPosition::MappingKey | CursorPosition::SequenceEntry
    ) {
        return found;
    }
    let path: String = context
        .resolved_path
        .iter()
        .map(|segment| match segment {
            PathSegment::FieldName(name) => format!("/{}", name),
            PathSegment::ArrayIndex(index) => format!("/{}", index),
        })
        .collect();
    let Some(mut container) = root.find_path(&path) else {
        return found;
    };
    let cursor = context.insert_range.start;
    if context.position == CursorPosition::MappingKey && container.kind == NodeKind::Sequence {
        // A key typed below a `- ` line belongs to that item
        match container.children.iter().rev().find(|item| item.range.start <= cursor) {
            Some(item) => container = item,
            None => return found,
        }
    }
    // A sibling whose value merely runs on into the cursor line still counts
    let being_typed = |child: &Node| {
        child.range.contains(cursor)
            && (context.position == CursorPosition::SequenceEntry || child.range.start.line == cursor.line)
    };
    let existing: BTreeSet<String> = container
        .children
        .iter()
        .filter(|child| !being_typed(child))
        .map(|child| match context.position {
            CursorPosition::SequenceEntry => child.as_str().unwrap_or_default().to_string(),
            _ => child.label.clone(),
        })
        .collect();
    found
        .into_iter()
        .filter(|candidate| !existing.contains(&candidate.label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;
    use tower_lsp::lsp_types::Url;

    use crate::document::SyntaxVariant;
    use crate::parser::{parse_document, LineIndex};
    use crate::provider::{AnnotationDefinition, FileChildResolver, StaticRegistry};

    fn registry() -> StaticRegistry {
        StaticRegistry::new()
            .with_resource(
                "aws/dynamodb/table",
                SchemaNode::object([
                    (
                        "tableName",
                        SchemaNode::scalar("string").with_description("Name of the table"),
                    ),
                    ("arn", SchemaNode::scalar("string").computed()),
                    (
                        "items",
                        SchemaNode::array(SchemaNode::object([
                            ("id", SchemaNode::scalar("string")),
                            ("ttl", SchemaNode::scalar("integer")),
                        ])),
                    ),
                ]),
            )
            .with_resource(
                "aws/lambda/function",
                SchemaNode::object([("handler", SchemaNode::scalar("string"))]),
            )
            .with_link(
                "aws/lambda/function",
                "aws/dynamodb/table",
                [(
                    "aws.lambda.dynamodb.accessType".to_string(),
                    AnnotationDefinition {
                        applies_to: "aws/lambda/function".to_string(),
                        description: Some("Access granted to the table".to_string()),
                        allowed_values: vec!["read".to_string(), "readwrite".to_string()],
                        default_value: Some("readwrite".to_string()),
                        required: false,
                    },
                )],
            )
    }

    /// Completion list at the `|` marker
    async fn complete(text: &str, syntax: SyntaxVariant) -> CompletionList {
        complete_with(text, syntax, 100).await
    }

    async fn complete_with(text: &str, syntax: SyntaxVariant, max_items: usize) -> CompletionList {
        let offset = text.find('|').expect("fixture has a cursor");
        let text = text.replacen('|', "", 1);
        let pos = LineIndex::new(&text).position(offset);
        let parsed = parse_document(&text, syntax).ok().map(Arc::new);
        let snapshot = Snapshot {
            uri: Url::parse("file:///tmp/app.blueprint.yaml").unwrap(),
            current: parsed.is_some(),
            parsed,
            text: text.clone(),
            syntax,
            token: CancellationToken::new(),
        };
        let services = Services::new(Arc::new(registry()), Arc::new(FileChildResolver));
        let context = completion_context(&text, snapshot.tree(), snapshot.current, syntax, pos)
            .expect("completion context");
        completions(&services, &snapshot, &context, max_items).await
    }

    fn labels(list: &CompletionList) -> Vec<&str> {
        list.items.iter().map(|item| item.label.as_str()).collect()
    }

    fn new_text(item: &CompletionItem) -> &str {
        match &item.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
            _ => panic!("expected a plain text edit"),
        }
    }

    const BLUEPRINT: &str = "resources:
  ordersTable:
    type: aws/dynamodb/table
    metadata:
      labels:
        app: orders
    spec:
      tableName: orders
      items:
        - id: a
        - id: b
        - id: c
  handler:
    type: aws/lambda/function
    linkSelector:
      byLabel:
        app: orders
    spec:
      handler: index.handler
";

    #[tokio::test]
    async fn test_namespaces_and_element_names() {
        let list = complete(&format!("{}values:\n  v:\n    value: ${{|}}\n", BLUEPRINT), SyntaxVariant::Yaml).await;
        assert_eq!(
            labels(&list),
            vec!["resources", "variables", "values", "datasources", "children"]
        );

        let list = complete(&format!("{}values:\n  v:\n    value: ${{resources.ord|}}\n", BLUEPRINT), SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["ordersTable"]);
        assert_eq!(list.items[0].detail.as_deref(), Some("aws/dynamodb/table"));
    }

    #[tokio::test]
    async fn test_resource_spec_fields_include_computed() {
        let list = complete(
            &format!("{}values:\n  v:\n    value: ${{resources.ordersTable.spec.|}}\n", BLUEPRINT),
            SyntaxVariant::Yaml,
        )
        .await;
        assert_eq!(labels(&list), vec!["arn", "items", "tableName"]);
        let table_name = &list.items[2];
        assert_eq!(table_name.detail.as_deref(), Some("string"));
        assert_eq!(new_text(table_name), "tableName");
    }

    #[tokio::test]
    async fn test_index_suggestions_follow_authored_items() {
        let list = complete(
            &format!("{}values:\n  v:\n    value: ${{resources.ordersTable.spec.items.|}}\n", BLUEPRINT),
            SyntaxVariant::Yaml,
        )
        .await;
        assert_eq!(labels(&list), vec!["[0]", "[1]", "[2]"]);
        assert_eq!(new_text(&list.items[2]), "[2]");

        let list = complete(
            &format!("{}values:\n  v:\n    value: ${{resources.ordersTable.spec.items[2].|}}\n", BLUEPRINT),
            SyntaxVariant::Yaml,
        )
        .await;
        assert_eq!(labels(&list), vec!["id", "ttl"]);
    }

    #[tokio::test]
    async fn test_bracket_keys_replace_separator() {
        let text = format!(
            "{}values:\n  v:\n    value: ${{resources.ordersTable.metadata.labels.|}}\n",
            BLUEPRINT.replace("app: orders\n    spec", "app: orders\n        environment.v1: prod\n    spec")
        );
        let list = complete(&text, SyntaxVariant::Yaml).await;
        let item = list
            .items
            .iter()
            .find(|item| item.label == "environment.v1")
            .expect("bracketed key");
        assert_eq!(new_text(item), "[\"environment.v1\"]");
        assert_eq!(item.filter_text.as_deref(), Some(".environment.v1"));
    }

    #[tokio::test]
    async fn test_annotation_keys_and_values() {
        let text = BLUEPRINT.replace(
            "    linkSelector:",
            "    metadata:\n      annotations:\n        |\n    linkSelector:",
        );
        let list = complete(&text, SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["aws.lambda.dynamodb.accessType"]);

        let text = BLUEPRINT.replace(
            "    linkSelector:",
            "    metadata:\n      annotations:\n        aws.lambda.dynamodb.accessType: |\n    linkSelector:",
        );
        let list = complete(&text, SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["read", "readwrite"]);
        assert_eq!(list.items[1].detail.as_deref(), Some("default"));
    }

    #[tokio::test]
    async fn test_missing_schema_yields_hint_item() {
        let text = "resources:\n  bucket:\n    type: acme/unknown\n    spec:\n      |\n";
        let list = complete(text, SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["No completions available"]);
        assert_eq!(new_text(&list.items[0]), "");
    }

    #[tokio::test]
    async fn test_spec_keys_exclude_computed_and_existing() {
        let text = BLUEPRINT.replace(
            "      items:\n        - id: a\n        - id: b\n        - id: c\n",
            "      |\n",
        );
        let list = complete(&text, SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["items"]);
    }

    #[tokio::test]
    async fn test_spec_keys_inside_sequence_item_skip_existing() {
        let text = BLUEPRINT.replace("        - id: b\n", "        - id: b\n          |\n");
        let list = complete(&text, SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["ttl"]);
    }

    #[tokio::test]
    async fn test_resource_types_quoted_in_json() {
        let text = "{\n  \"resources\": {\n    \"orders\": {\n      \"type\": \"aws/dyn|\"\n    }\n  }\n}";
        let list = complete(text, SyntaxVariant::Json).await;
        assert_eq!(labels(&list), vec!["aws/dynamodb/table"]);
        assert_eq!(new_text(&list.items[0]), "aws/dynamodb/table");
    }

    #[tokio::test]
    async fn test_dependency_names_skip_self_and_listed() {
        let text = format!(
            "{}  queue:\n    type: aws/sqs/queue\n    dependsOn:\n      - ordersTable\n      - |\n",
            BLUEPRINT
        );
        let list = complete(&text, SyntaxVariant::Yaml).await;
        assert_eq!(labels(&list), vec!["handler"]);
    }

    #[tokio::test]
    async fn test_results_are_truncated() {
        let list = complete_with("|", SyntaxVariant::Yaml, 3).await;
        assert_eq!(list.items.len(), 3);
        assert!(list.is_incomplete);
    }
}
