//! LSP Backend implementation

use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::Settings;
use crate::workspace::Workspace;

/// Characters that open a new completion context
const TRIGGER_CHARACTERS: [&str; 4] = [".", "[", "\"", "{"];

/// The LSP backend that handles all language server requests
pub struct Backend {
    /// The LSP client for sending notifications
    client: Client,
    workspace: Arc<Workspace>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self::with_workspace(client, Workspace::default())
    }

    /// Backend over a workspace with preconfigured services
    pub fn with_workspace(client: Client, workspace: Workspace) -> Self {
        Self {
            client,
            workspace: Arc::new(workspace),
        }
    }

    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: i32) {
        self.client
            .publish_diagnostics(uri, diagnostics, Some(version))
            .await;
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let settings = Settings::from_initialization_options(params.initialization_options);
        tracing::debug!("Settings: {:?}", settings);
        self.workspace.configure(settings).await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        TRIGGER_CHARACTERS.iter().map(|c| c.to_string()).collect(),
                    ),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                references_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "blueprint-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("Server initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Server shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        tracing::debug!("Document opened: {}", uri);

        let diagnostics = self
            .workspace
            .open(uri.clone(), params.text_document.text, version)
            .await;
        self.publish(uri, diagnostics, version).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // FULL sync: the last change holds the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            tracing::debug!("Document changed: {}", uri);
            let diagnostics = self.workspace.change(uri.clone(), change.text, version).await;
            self.publish(uri, diagnostics, version).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::debug!("Document closed: {}", uri);

        self.workspace.close(&uri).await;
        // Clear diagnostics for this document
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position;
        let list = self
            .workspace
            .completion(&position.text_document.uri, position.position)
            .await;
        Ok(list.map(CompletionResponse::List))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params;
        Ok(self
            .workspace
            .hover(&position.text_document.uri, position.position)
            .await)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position = params.text_document_position;
        let locations = self
            .workspace
            .references(
                &position.text_document.uri,
                position.position,
                params.context.include_declaration,
            )
            .await;
        Ok(Some(locations))
    }
}
