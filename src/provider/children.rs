//! Exports of included child blueprints

use std::path::{Path, PathBuf};

use crate::ast::Node;
use crate::document::SyntaxVariant;
use crate::error::Result;
use crate::parser::parse_document;

/// One export a child blueprint offers through `children.<name>.<export>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildExport {
    pub name: String,
    pub export_type: Option<String>,
    pub description: Option<String>,
}

#[tower_lsp::async_trait]
pub trait ChildExportResolver: Send + Sync {
    /// Exports of the child at `child_path`, resolved relative to
    /// `base_dir`. `None` when the child can't be read.
    async fn resolve_exports(
        &self,
        base_dir: Option<&Path>,
        child_path: &str,
    ) -> Result<Option<Vec<ChildExport>>>;
}

/// Reads child blueprints from the local file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FileChildResolver;

#[tower_lsp::async_trait]
impl ChildExportResolver for FileChildResolver {
    async fn resolve_exports(
        &self,
        base_dir: Option<&Path>,
        child_path: &str,
    ) -> Result<Option<Vec<ChildExport>>> {
        if child_path.contains("://") || child_path.contains("${") {
            // Remote sources and computed paths are not resolved locally
            return Ok(None);
        }
        let path = match base_dir {
            Some(dir) => dir.join(child_path),
            None => PathBuf::from(child_path),
        };
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) => {
                tracing::debug!("Child blueprint {} unavailable: {}", path.display(), err);
                return Ok(None);
            }
        };
        let syntax = SyntaxVariant::detect(&path.to_string_lossy(), &text);
        let parsed = parse_document(&text, syntax)?;
        Ok(Some(exports_of(&parsed.root)))
    }
}

/// Exports declared in a parsed blueprint
pub fn exports_of(root: &Node) -> Vec<ChildExport> {
    root.child("exports")
        .map(|exports| {
            exports
                .children
                .iter()
                .map(|export| ChildExport {
                    name: export.label.clone(),
                    export_type: export.child("type").and_then(|t| t.as_str()).map(str::to_string),
                    description: export
                        .child("description")
                        .and_then(|d| d.as_str())
                        .map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default()
}
