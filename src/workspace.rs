//! Open documents and the services requests run against
//!
//! Request handlers take a [`Snapshot`] of the document under the lock and
//! release it before calling into the provider registry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::{
    CompletionList, Diagnostic, Hover, HoverContents, Location, MarkupContent, MarkupKind, Url,
};

use crate::ast::{Node, Position};
use crate::completion::{completion_context, completions, CompletionContext};
use crate::config::Settings;
use crate::diagnostics::DiagnosticCollector;
use crate::document::{Document, SyntaxVariant};
use crate::error::{Error, Result};
use crate::hover::hover_text;
use crate::links::LinkResolver;
use crate::parser::ParsedDocument;
use crate::position::{from_lsp, range_to_lsp};
use crate::provider::{cancellable, ChildExportResolver, FileChildResolver, ProviderRegistry, StaticRegistry};
use crate::references::find_references;
use crate::resolve::{resolve_identity, ElementIdentity};
use crate::schema::SchemaNode;

/// Collaborators shared by every request
pub struct Services {
    pub registry: Arc<dyn ProviderRegistry>,
    pub links: LinkResolver,
    pub children: Arc<dyn ChildExportResolver>,
}

impl Services {
    pub fn new(registry: Arc<dyn ProviderRegistry>, children: Arc<dyn ChildExportResolver>) -> Self {
        Self {
            links: LinkResolver::new(registry.clone()),
            registry,
            children,
        }
    }

    /// Schema of the type a resource declaration names
    pub async fn resource_schema(
        &self,
        declaration: &Node,
        token: &CancellationToken,
    ) -> Result<Arc<SchemaNode>> {
        let Some(resource_type) = declaration.child("type").and_then(Node::as_str) else {
            return Err(Error::SchemaUnavailable(format!(
                "Resource `{}` has no type",
                declaration.label
            )));
        };
        cancellable(token, self.registry.resource_schema(resource_type))
            .await?
            .ok_or_else(|| {
                Error::SchemaUnavailable(format!(
                    "No schema available for resource type `{}`",
                    resource_type
                ))
            })
    }

    /// Schema of the type a data source declaration names
    pub async fn data_source_schema(
        &self,
        declaration: &Node,
        token: &CancellationToken,
    ) -> Result<Arc<SchemaNode>> {
        let Some(data_source_type) = declaration.child("type").and_then(Node::as_str) else {
            return Err(Error::SchemaUnavailable(format!(
                "Data source `{}` has no type",
                declaration.label
            )));
        };
        cancellable(token, self.registry.data_source_schema(data_source_type))
            .await?
            .ok_or_else(|| {
                Error::SchemaUnavailable(format!(
                    "No schema available for data source type `{}`",
                    data_source_type
                ))
            })
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(Arc::new(StaticRegistry::new()), Arc::new(FileChildResolver))
    }
}

/// A document's state as seen by one request
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub uri: Url,
    pub text: String,
    pub syntax: SyntaxVariant,
    pub parsed: Option<Arc<ParsedDocument>>,
    /// Whether `parsed` was built from `text`
    pub current: bool,
    pub token: CancellationToken,
}

impl Snapshot {
    fn of(uri: &Url, document: &Document) -> Self {
        Self {
            uri: uri.clone(),
            text: document.text.clone(),
            syntax: document.syntax,
            parsed: document.last_good.clone(),
            current: document.is_current(),
            token: document.request_token(),
        }
    }

    pub fn tree(&self) -> Option<&Node> {
        self.parsed.as_ref().map(|parsed| &parsed.root)
    }

    /// Directory child blueprint paths are resolved against
    pub fn base_dir(&self) -> Option<PathBuf> {
        let path = self.uri.to_file_path().ok()?;
        path.parent().map(|dir| dir.to_path_buf())
    }
}

/// What sits at a cursor position
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedPosition {
    Element(ElementIdentity),
    Completion(CompletionContext),
    Nothing,
}

/// Open documents plus the services and settings requests use
pub struct Workspace {
    services: RwLock<Arc<Services>>,
    settings: RwLock<Settings>,
    documents: RwLock<HashMap<Url, Document>>,
}

impl Workspace {
    pub fn new(services: Services) -> Self {
        Self {
            services: RwLock::new(Arc::new(services)),
            settings: RwLock::new(Settings::default()),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Apply client settings, loading the provider catalog they name
    pub async fn configure(&self, settings: Settings) {
        if let Some(path) = &settings.provider_catalog {
            match StaticRegistry::load(path).await {
                Ok(registry) => {
                    let children = self.services.read().await.children.clone();
                    *self.services.write().await =
                        Arc::new(Services::new(Arc::new(registry), children));
                }
                Err(err) => {
                    tracing::warn!("Could not load provider catalog {}: {}", path.display(), err);
                }
            }
        }
        *self.settings.write().await = settings;
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Open or replace a document, returning its parse diagnostics
    pub async fn open(&self, uri: Url, text: String, version: i32) -> Vec<Diagnostic> {
        let syntax = SyntaxVariant::detect(uri.path(), &text);
        let document = Document::new(text, version, syntax);
        let diagnostics = parse_diagnostics(&document);
        let mut documents = self.documents.write().await;
        if let Some(previous) = documents.insert(uri, document) {
            previous.cancel_requests();
        }
        diagnostics
    }

    /// Update an open document's text, returning its parse diagnostics
    pub async fn change(&self, uri: Url, text: String, version: i32) -> Vec<Diagnostic> {
        {
            let mut documents = self.documents.write().await;
            if let Some(document) = documents.get_mut(&uri) {
                document.update(text, version);
                return parse_diagnostics(document);
            }
        }
        self.open(uri, text, version).await
    }

    pub async fn close(&self, uri: &Url) {
        if let Some(document) = self.documents.write().await.remove(uri) {
            document.cancel_requests();
        }
    }

    pub async fn snapshot(&self, uri: &Url) -> Option<Snapshot> {
        let documents = self.documents.read().await;
        documents.get(uri).map(|document| Snapshot::of(uri, document))
    }

    async fn request(&self, uri: &Url) -> Option<(Arc<Services>, Snapshot)> {
        let snapshot = self.snapshot(uri).await?;
        let services = self.services.read().await.clone();
        Some((services, snapshot))
    }

    /// Identify what sits at a 0-indexed position
    pub async fn resolve_position(&self, uri: &Url, line: u32, column: u32) -> ResolvedPosition {
        let Some(snapshot) = self.snapshot(uri).await else {
            return ResolvedPosition::Nothing;
        };
        let pos = from_lsp(tower_lsp::lsp_types::Position::new(line, column));
        resolve_at(&snapshot, pos)
    }

    pub async fn completion(
        &self,
        uri: &Url,
        position: tower_lsp::lsp_types::Position,
    ) -> Option<CompletionList> {
        let (services, snapshot) = self.request(uri).await?;
        let max_items = self.settings.read().await.max_completion_items;
        let pos = from_lsp(position);
        let context = completion_context(
            &snapshot.text,
            snapshot.tree(),
            snapshot.current,
            snapshot.syntax,
            pos,
        )?;
        tracing::debug!("Completion at {:?}: {:?}", pos, context.position);
        Some(completions(&services, &snapshot, &context, max_items).await)
    }

    pub async fn hover(&self, uri: &Url, position: tower_lsp::lsp_types::Position) -> Option<Hover> {
        if !self.settings.read().await.hover {
            return None;
        }
        let (services, snapshot) = self.request(uri).await?;
        let text = hover_text(&services, &snapshot, from_lsp(position)).await?;
        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: text,
            }),
            range: None,
        })
    }

    pub async fn references(
        &self,
        uri: &Url,
        position: tower_lsp::lsp_types::Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        let Some(snapshot) = self.snapshot(uri).await else {
            return Vec::new();
        };
        find_references(&snapshot, from_lsp(position), include_declaration)
            .into_iter()
            .map(|range| Location::new(uri.clone(), range_to_lsp(range)))
            .collect()
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(Services::default())
    }
}

/// Element identity first, completion context second
pub fn resolve_at(snapshot: &Snapshot, pos: Position) -> ResolvedPosition {
    if let Some(root) = snapshot.tree() {
        let stack = root.enclosing(pos);
        if let Some(identity) = resolve_identity(&stack) {
            return ResolvedPosition::Element(identity);
        }
    }
    match completion_context(
        &snapshot.text,
        snapshot.tree(),
        snapshot.current,
        snapshot.syntax,
        pos,
    ) {
        Some(context) => ResolvedPosition::Completion(context),
        None => ResolvedPosition::Nothing,
    }
}

fn parse_diagnostics(document: &Document) -> Vec<Diagnostic> {
    let mut collector = DiagnosticCollector::new();
    if let Some(failure) = &document.failure {
        collector.add_parse_error(failure.message.clone(), failure.line, failure.column);
    }
    collector.into_diagnostics()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ElementCategory;
    use crate::completion::CursorPosition;
    use assert_matches::assert_matches;

    const BLUEPRINT: &str = "resources:\n  orders:\n    type: aws/dynamodb/table\n  handler:\n    type: aws/lambda/function\n    dependsOn:\n      - orders\n";

    fn uri() -> Url {
        Url::parse("file:///tmp/app.blueprint.yaml").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_position_element() {
        let workspace = Workspace::default();
        workspace.open(uri(), BLUEPRINT.to_string(), 1).await;

        // 0-indexed: line 6 is `      - orders`
        let resolved = workspace.resolve_position(&uri(), 6, 9).await;
        assert_matches!(
            resolved,
            ResolvedPosition::Element(identity)
                if identity.category == ElementCategory::Resource && identity.name == "orders"
        );
    }

    #[tokio::test]
    async fn test_resolve_position_completion() {
        let workspace = Workspace::default();
        let text = format!("{}    spec:\n      name: ${{resources.", BLUEPRINT);
        workspace.open(uri(), text, 1).await;
        let resolved = workspace.resolve_position(&uri(), 8, 24).await;
        assert_matches!(
            resolved,
            ResolvedPosition::Completion(context) if context.position == CursorPosition::Substitution
        );
    }

    #[tokio::test]
    async fn test_unknown_document_resolves_nothing() {
        let workspace = Workspace::default();
        assert_eq!(
            workspace.resolve_position(&uri(), 0, 0).await,
            ResolvedPosition::Nothing
        );
    }

    #[tokio::test]
    async fn test_parse_failure_is_reported_and_tree_kept() {
        let workspace = Workspace::default();
        assert!(workspace.open(uri(), BLUEPRINT.to_string(), 1).await.is_empty());
        let diagnostics = workspace
            .change(uri(), format!("{}  bad: \"open\n", BLUEPRINT), 2)
            .await;
        assert_eq!(diagnostics.len(), 1);

        let snapshot = workspace.snapshot(&uri()).await.unwrap();
        assert!(!snapshot.current);
        assert!(snapshot.tree().is_some());
    }

    #[tokio::test]
    async fn test_change_cancels_running_requests() {
        let workspace = Workspace::default();
        workspace.open(uri(), BLUEPRINT.to_string(), 1).await;
        let snapshot = workspace.snapshot(&uri()).await.unwrap();
        workspace.change(uri(), BLUEPRINT.to_string(), 2).await;
        assert!(snapshot.token.is_cancelled());
    }
}
