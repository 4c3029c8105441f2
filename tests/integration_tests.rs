//! Integration tests for the blueprint-lsp server
//!
//! These tests drive the workspace the way the LSP backend does, from
//! document text and 0-indexed positions to completion items, hover text and
//! reference locations, using the fixtures under `tests/fixtures`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{CompletionList, CompletionTextEdit, HoverContents, Position, Url};

use blueprint_lsp::ast::ElementCategory;
use blueprint_lsp::completion::CursorPosition;
use blueprint_lsp::config::Settings;
use blueprint_lsp::document::SyntaxVariant;
use blueprint_lsp::links::{resources_in, LinkResolver};
use blueprint_lsp::literal::{self, LiteralValue};
use blueprint_lsp::parser::{parse_document, reference_from_segments};
use blueprint_lsp::path::{needs_bracket_notation, parse_path, render_path, PathSegment};
use blueprint_lsp::provider::{FileChildResolver, ProviderRegistry, StaticRegistry};
use blueprint_lsp::schema::{self, SchemaKind, SchemaLookup};
use blueprint_lsp::{ResolvedPosition, Services, Workspace};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(name)).expect("Failed to read fixture")
}

fn fixture_uri(name: &str) -> Url {
    Url::from_file_path(fixtures_dir().join(name)).expect("absolute fixture path")
}

async fn registry() -> StaticRegistry {
    StaticRegistry::load(&fixtures_dir().join("catalog.json"))
        .await
        .expect("Failed to load catalog")
}

async fn workspace() -> Workspace {
    Workspace::new(Services::new(
        Arc::new(registry().await),
        Arc::new(FileChildResolver),
    ))
}

/// 0-indexed position of byte `offset` in ASCII `text`
fn position_at(text: &str, offset: usize) -> Position {
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    Position::new(line, (offset - line_start) as u32)
}

/// Position `shift` bytes into the first occurrence of `needle`
fn position_of(text: &str, needle: &str, shift: usize) -> Position {
    let offset = text.find(needle).expect("needle in text");
    position_at(text, offset + shift)
}

fn line_of(text: &str, needle: &str) -> u32 {
    position_of(text, needle, 0).line
}

/// Remove the `|` cursor marker, returning the text and cursor position
fn with_cursor(marked: &str) -> (String, Position) {
    let offset = marked.find('|').expect("cursor marker");
    let text = marked.replacen('|', "", 1);
    let position = position_at(&text, offset);
    (text, position)
}

async fn complete(workspace: &Workspace, name: &str, marked: &str) -> CompletionList {
    let uri = fixture_uri(name);
    let (text, position) = with_cursor(marked);
    workspace.open(uri.clone(), text, 1).await;
    workspace
        .completion(&uri, position)
        .await
        .expect("completion context")
}

fn labels(list: &CompletionList) -> Vec<&str> {
    list.items.iter().map(|item| item.label.as_str()).collect()
}

fn new_text<'a>(list: &'a CompletionList, label: &str) -> &'a str {
    let item = list
        .items
        .iter()
        .find(|item| item.label == label)
        .expect("item with label");
    match &item.text_edit {
        Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
        _ => panic!("expected a plain text edit"),
    }
}

fn app_with(from: &str, to: &str) -> String {
    let text = fixture("app.blueprint.yaml");
    assert!(text.contains(from), "fixture contains {:?}", from);
    text.replacen(from, to, 1)
}

const TABLE_LINE: &str = "TABLE: ${resources.ordersTable.spec.tableName}";

#[tokio::test]
async fn test_fixtures_parse_without_diagnostics() {
    let workspace = workspace().await;
    for name in ["app.blueprint.yaml", "app.blueprint.jsonc"] {
        let diagnostics = workspace.open(fixture_uri(name), fixture(name), 1).await;
        assert!(
            diagnostics.is_empty(),
            "Expected no diagnostics for {}, got: {:?}",
            name,
            diagnostics
        );
    }
}

#[tokio::test]
async fn test_invalid_document_produces_diagnostic() {
    let workspace = workspace().await;
    let uri = fixture_uri("app.blueprint.yaml");
    let diagnostics = workspace
        .open(uri, "resources:\n  a: \"open\n".to_string(), 1)
        .await;
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].source.as_deref(), Some("blueprint-lsp"));
}

#[test]
fn test_path_round_trip() {
    for text in [
        "resources.ordersTable.spec.tableName",
        "resources.ordersTable.metadata.labels[\"environment.v1\"]",
        "values.config.value.endpoints[0].host",
        "resources.a.metadata.annotations['say \"hi\"'].x",
        "children.network[\"subnet-id\"][2]",
    ] {
        let parsed = parse_path(text);
        assert!(!parsed.malformed, "{} parses", text);
        let rendered = render_path(&parsed.full());
        assert_eq!(parse_path(&rendered).full(), parsed.full(), "{} round trips", text);
    }
}

#[test]
fn test_bare_numeral_is_a_field_name() {
    let parsed = parse_path("values.config.value.endpoints.0.host");
    assert_eq!(parsed.full()[4], PathSegment::field("0"));
    assert!(parsed
        .full()
        .iter()
        .all(|segment| matches!(segment, PathSegment::FieldName(_))));
}

#[tokio::test]
async fn test_navigators_are_idempotent() {
    let registry = registry().await;
    let table = registry
        .resource_schema("aws/dynamodb/table")
        .await
        .unwrap()
        .unwrap();
    let path = parse_path("spec.items[1].ttl").full();
    assert_eq!(schema::navigate(&table, &path), schema::navigate(&table, &path));

    let parsed = parse_document(&fixture("app.blueprint.yaml"), SyntaxVariant::Yaml).unwrap();
    let config = LiteralValue::from_node(parsed.root.find_path("/values/config/value").unwrap());
    let path = parse_path("endpoints[0]").full();
    let first = literal::navigate(&config, &path);
    assert_eq!(first, literal::navigate(&config, &path));
    assert!(first.unwrap().is_terminal());
}

#[tokio::test]
async fn test_table_name_resolves_to_declared_attribute() {
    let registry = registry().await;
    let table = registry
        .resource_schema("aws/dynamodb/table")
        .await
        .unwrap()
        .unwrap();
    let reference = reference_from_segments(&parse_path("resources.ordersTable.spec.tableName").full())
        .expect("resource reference");
    assert_eq!(reference.category, ElementCategory::Resource);

    let attribute = schema::navigate(&table, &reference.path)
        .node()
        .expect("tableName attribute");
    assert_eq!(attribute.kind, SchemaKind::Scalar);
    assert_eq!(attribute.scalar_type.as_deref(), Some("string"));
    assert_eq!(attribute.description.as_deref(), Some("Name of the table"));
}

#[tokio::test]
async fn test_indexed_path_walks_array_then_items() {
    let registry = registry().await;
    let table = registry
        .resource_schema("aws/dynamodb/table")
        .await
        .unwrap()
        .unwrap();
    let parsed = parse_path("resources.ordersTable.spec.items[2].");
    let reference = reference_from_segments(&parsed.segments).unwrap();

    assert!(matches!(
        schema::navigate(&table, &reference.path[..2]),
        SchemaLookup::AtArray(_)
    ));
    match schema::navigate(&table, &reference.path[..3]) {
        SchemaLookup::Node(items) => {
            assert_eq!(items.kind, SchemaKind::Object);
            assert!(items.attributes.contains_key("ttl"));
        }
        other => panic!("expected the item schema, got {:?}", other),
    }

    let workspace = workspace().await;
    let list = complete(
        &workspace,
        "app.blueprint.yaml",
        &app_with(TABLE_LINE, "TABLE: ${resources.ordersTable.spec.items[2].|}"),
    )
    .await;
    assert_eq!(labels(&list), vec!["id", "ttl"]);

    let list = complete(
        &workspace,
        "app.blueprint.yaml",
        &app_with(TABLE_LINE, "TABLE: ${resources.ordersTable.spec.items.|}"),
    )
    .await;
    assert_eq!(labels(&list), vec!["[0]", "[1]", "[2]"]);
}

#[tokio::test]
async fn test_dotted_keys_use_bracket_notation() {
    assert!(needs_bracket_notation("environment.v1"));
    assert!(!needs_bracket_notation("simple"));

    let workspace = workspace().await;
    let list = complete(
        &workspace,
        "app.blueprint.yaml",
        &app_with(TABLE_LINE, "TABLE: ${resources.ordersTable.metadata.labels.|}"),
    )
    .await;
    assert_eq!(labels(&list), vec!["app", "environment.v1"]);
    assert_eq!(new_text(&list, "app"), "app");
    assert_eq!(new_text(&list, "environment.v1"), "[\"environment.v1\"]");
}

#[tokio::test]
async fn test_references_with_and_without_declaration() {
    let workspace = workspace().await;
    let uri = fixture_uri("app.blueprint.yaml");
    let text = fixture("app.blueprint.yaml");
    workspace.open(uri.clone(), text.clone(), 1).await;

    let cursor = position_of(&text, "ordersTable.spec.tableName}", 2);
    let lines: Vec<u32> = workspace
        .references(&uri, cursor, false)
        .await
        .iter()
        .map(|location| location.range.start.line)
        .collect();
    assert_eq!(
        lines,
        vec![line_of(&text, TABLE_LINE), line_of(&text, "field: resources.ordersTable")]
    );

    let with_declaration = workspace.references(&uri, cursor, true).await;
    assert_eq!(with_declaration.len(), 3);
    assert_eq!(with_declaration[0].range.start.line, line_of(&text, "  ordersTable:"));
}

#[tokio::test]
async fn test_unreferenced_element_has_only_its_declaration() {
    let workspace = workspace().await;
    let uri = fixture_uri("app.blueprint.yaml");
    let text = fixture("app.blueprint.yaml");
    workspace.open(uri.clone(), text.clone(), 1).await;

    let cursor = position_of(&text, "  config:", 4);
    assert!(workspace.references(&uri, cursor, false).await.is_empty());
    let with_declaration = workspace.references(&uri, cursor, true).await;
    assert_eq!(with_declaration.len(), 1);
    assert_eq!(with_declaration[0].range.start.line, cursor.line);
}

#[tokio::test]
async fn test_same_type_selector_holder_is_side_a() {
    let registry: Arc<dyn ProviderRegistry> = Arc::new(registry().await);
    let backend = "  backend:\n    type: k8s/service\n    metadata:\n      labels:\n        app: api\n";
    let frontend = "  frontend:\n    type: k8s/service\n    linkSelector:\n      byLabel:\n        app: api\n";

    for text in [
        format!("resources:\n{}{}", backend, frontend),
        format!("resources:\n{}{}", frontend, backend),
    ] {
        let parsed = parse_document(&text, SyntaxVariant::Yaml).unwrap();
        let all = resources_in(&parsed.root);
        let resolver = LinkResolver::new(registry.clone());
        let token = CancellationToken::new();
        let find = |name: &str| all.iter().find(|info| info.name == name).unwrap();

        let from_frontend = resolver
            .linked_resources(find("frontend"), &all, &token)
            .await
            .unwrap();
        let from_backend = resolver
            .linked_resources(find("backend"), &all, &token)
            .await
            .unwrap();
        assert_eq!(from_frontend.len(), 1);
        assert!(from_frontend[0].current_is_side_a);
        assert_eq!(from_backend.len(), 1);
        assert!(!from_backend[0].current_is_side_a);
    }
}

#[tokio::test]
async fn test_link_direction_is_complementary() {
    let registry: Arc<dyn ProviderRegistry> = Arc::new(registry().await);
    let parsed = parse_document(&fixture("app.blueprint.yaml"), SyntaxVariant::Yaml).unwrap();
    let all = resources_in(&parsed.root);
    let resolver = LinkResolver::new(registry);
    let token = CancellationToken::new();

    for (current, other) in [("handler", "ordersTable"), ("ordersTable", "handler")] {
        let current_info = all.iter().find(|info| info.name == current).unwrap();
        let other_info = all.iter().find(|info| info.name == other).unwrap();
        let forward = resolver
            .linked_resources(current_info, &all, &token)
            .await
            .unwrap();
        let backward = resolver
            .linked_resources(other_info, &all, &token)
            .await
            .unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_ne!(forward[0].current_is_side_a, backward[0].current_is_side_a);
    }
}

#[tokio::test]
async fn test_annotation_key_completion() {
    let workspace = workspace().await;
    let list = complete(
        &workspace,
        "app.blueprint.yaml",
        &app_with(
            "    linkSelector:\n",
            "    metadata:\n      annotations:\n        |\n    linkSelector:\n",
        ),
    )
    .await;
    assert_eq!(labels(&list), vec!["aws.lambda.dynamodb.accessType"]);
}

#[tokio::test]
async fn test_child_export_completion() {
    let workspace = workspace().await;
    let list = complete(
        &workspace,
        "app.blueprint.yaml",
        &app_with("VPC: ${datasources.vpc.vpcId}", "VPC: ${children.network.|}"),
    )
    .await;
    assert_eq!(labels(&list), vec!["subnetId"]);
    assert_eq!(list.items[0].detail.as_deref(), Some("string"));
}

#[tokio::test]
async fn test_json_type_completion_keeps_quotes_balanced() {
    let workspace = workspace().await;
    let marked = fixture("app.blueprint.jsonc").replacen(
        "\"type\": \"aws/dynamodb/table\"",
        "\"type\": \"aws/dyn|\"",
        1,
    );
    let list = complete(&workspace, "app.blueprint.jsonc", &marked).await;
    assert_eq!(labels(&list), vec!["aws/dynamodb/table"]);
    assert_eq!(new_text(&list, "aws/dynamodb/table"), "aws/dynamodb/table");
}

#[tokio::test]
async fn test_completion_survives_parse_errors() {
    let workspace = workspace().await;
    let uri = fixture_uri("app.blueprint.yaml");
    workspace
        .open(uri.clone(), fixture("app.blueprint.yaml"), 1)
        .await;

    let marked = format!(
        "{}broken: \"open\n",
        app_with(TABLE_LINE, "TABLE: ${resources.ordersTable.spec.|}")
    );
    let (text, position) = with_cursor(&marked);
    let diagnostics = workspace.change(uri.clone(), text, 2).await;
    assert_eq!(diagnostics.len(), 1);

    let list = workspace.completion(&uri, position).await.unwrap();
    assert_eq!(labels(&list), vec!["arn", "items", "tableName"]);
}

#[tokio::test]
async fn test_resolve_position() {
    let workspace = workspace().await;
    let uri = fixture_uri("app.blueprint.yaml");
    let text = fixture("app.blueprint.yaml");
    workspace.open(uri.clone(), text.clone(), 1).await;

    let dependency = position_of(&text, "- network", 3);
    match workspace
        .resolve_position(&uri, dependency.line, dependency.character)
        .await
    {
        ResolvedPosition::Element(identity) => {
            assert_eq!(identity.category, ElementCategory::Child);
            assert_eq!(identity.name, "network");
            assert_eq!(identity.definition_path, "/include/network");
        }
        other => panic!("expected an element, got {:?}", other),
    }

    // A plain value is no element, but still a completion site
    let plain = position_of(&text, "eu-west-1", 3);
    match workspace
        .resolve_position(&uri, plain.line, plain.character)
        .await
    {
        ResolvedPosition::Completion(context) => {
            assert_eq!(context.position, CursorPosition::MappingValue);
        }
        other => panic!("expected a completion context, got {:?}", other),
    }

    let outside = fixture_uri("missing.blueprint.yaml");
    assert_eq!(
        workspace.resolve_position(&outside, 0, 0).await,
        ResolvedPosition::Nothing
    );
}

#[tokio::test]
async fn test_hover_reference_and_setting() {
    let workspace = workspace().await;
    let uri = fixture_uri("app.blueprint.yaml");
    let text = fixture("app.blueprint.yaml");
    workspace.open(uri.clone(), text.clone(), 1).await;

    let cursor = position_of(&text, "tableName}", 3);
    let hover = workspace.hover(&uri, cursor).await.expect("hover");
    let HoverContents::Markup(markup) = hover.contents else {
        panic!("expected markdown");
    };
    assert!(markup.value.starts_with("**resource** `ordersTable`"));
    assert!(markup.value.contains("Name of the table"));

    workspace
        .configure(Settings {
            hover: false,
            ..Settings::default()
        })
        .await;
    assert!(workspace.hover(&uri, cursor).await.is_none());
}
