//! Provider registry and child blueprint lookups
//!
//! Both collaborators may be slow (a plugin process, the file system), so
//! every call is async and raced against the request's cancellation token
//! with [`cancellable`].

mod catalog;
mod children;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::schema::SchemaNode;

pub use catalog::StaticRegistry;
pub use children::{exports_of, ChildExport, ChildExportResolver, FileChildResolver};

/// A link registered between two resource types, in registration order
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDeclaration {
    pub resource_type_a: String,
    pub resource_type_b: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// An annotation a link understands on one of its resources
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationDefinition {
    /// Resource type the annotation is set on
    pub applies_to: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// Read-only access to provider plugins
#[tower_lsp::async_trait]
pub trait ProviderRegistry: Send + Sync {
    async fn resource_types(&self) -> Result<Vec<String>>;

    async fn data_source_types(&self) -> Result<Vec<String>>;

    async fn resource_schema(&self, resource_type: &str) -> Result<Option<Arc<SchemaNode>>>;

    async fn data_source_schema(&self, data_source_type: &str) -> Result<Option<Arc<SchemaNode>>>;

    /// The link registered with `type_a` on the A side and `type_b` on the B
    /// side. The reverse registration is not returned.
    async fn link(&self, type_a: &str, type_b: &str) -> Result<Option<LinkDeclaration>>;

    async fn annotation_definitions(
        &self,
        link: &LinkDeclaration,
    ) -> Result<BTreeMap<String, AnnotationDefinition>>;
}

/// Run a collaborator call unless the request is cancelled first
pub async fn cancellable<T, F>(token: &CancellationToken, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::Cancelled),
        result = call => result,
    }
}
