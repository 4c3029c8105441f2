//! Document state management

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::ast::Node;
use crate::error::Error;
use crate::parser::{parse_document, ParsedDocument};

/// The two concrete syntaxes a blueprint can be written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntaxVariant {
    /// Indentation based
    #[default]
    Yaml,
    /// Braces and quotes, comments allowed
    Json,
}

impl SyntaxVariant {
    /// Pick the syntax from the file extension, then from the content
    pub fn detect(path: &str, text: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".json") || lower.ends_with(".jsonc") {
            SyntaxVariant::Json
        } else if lower.ends_with(".yaml") || lower.ends_with(".yml") {
            SyntaxVariant::Yaml
        } else if text.trim_start().starts_with('{') {
            SyntaxVariant::Json
        } else {
            SyntaxVariant::Yaml
        }
    }
}

/// Why the live text does not parse, 0-indexed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

/// Represents the state of a text document
#[derive(Debug, Clone)]
pub struct Document {
    /// The document text content
    pub text: String,
    /// The document version
    pub version: i32,
    pub syntax: SyntaxVariant,
    /// Most recent successful parse, possibly older than `text`
    pub last_good: Option<Arc<ParsedDocument>>,
    /// Set when the live text failed to parse
    pub failure: Option<ParseFailure>,
    cancel: CancellationToken,
}

impl Document {
    /// Create a new document with the given text and version
    pub fn new(text: String, version: i32, syntax: SyntaxVariant) -> Self {
        let mut document = Self {
            text: String::new(),
            version,
            syntax,
            last_good: None,
            failure: None,
            cancel: CancellationToken::new(),
        };
        document.update(text, version);
        document
    }

    /// Replace the text and reparse.
    ///
    /// Requests still running against the previous version are cancelled. A
    /// failed parse keeps the previous tree.
    pub fn update(&mut self, text: String, version: i32) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        match parse_document(&text, self.syntax) {
            Ok(parsed) => {
                self.last_good = Some(Arc::new(parsed));
                self.failure = None;
            }
            Err(Error::ParseUnavailable {
                message,
                line,
                column,
            }) => {
                tracing::debug!("Document v{} does not parse: {}", version, message);
                self.failure = Some(ParseFailure {
                    message,
                    line,
                    column,
                });
            }
            Err(err) => {
                tracing::warn!("Unexpected parse error: {}", err);
                self.failure = Some(ParseFailure {
                    message: err.to_string(),
                    line: 0,
                    column: 0,
                });
            }
        }
        self.text = text;
        self.version = version;
    }

    /// Whether the last good tree was built from the live text
    pub fn is_current(&self) -> bool {
        self.failure.is_none() && self.last_good.is_some()
    }

    /// Root of the last good tree
    pub fn tree(&self) -> Option<&Node> {
        self.last_good.as_ref().map(|parsed| &parsed.root)
    }

    /// Token for a request against this version of the document
    pub fn request_token(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    /// Cancel every request still running against this document
    pub fn cancel_requests(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_syntax() {
        assert_eq!(SyntaxVariant::detect("/a/app.blueprint.yaml", ""), SyntaxVariant::Yaml);
        assert_eq!(SyntaxVariant::detect("/a/app.jsonc", ""), SyntaxVariant::Json);
        assert_eq!(SyntaxVariant::detect("/a/app", "  {\"version\": 1}"), SyntaxVariant::Json);
        assert_eq!(SyntaxVariant::detect("/a/app", "version: 1"), SyntaxVariant::Yaml);
    }

    #[test]
    fn test_failed_parse_keeps_last_good_tree() {
        let mut document = Document::new(
            "resources:\n  orders:\n    type: t\n".to_string(),
            1,
            SyntaxVariant::Yaml,
        );
        assert!(document.is_current());

        document.update("resources:\n  orders:\n    type: t\n  bad\n".to_string(), 2);
        assert!(!document.is_current());
        assert!(document.failure.is_some());
        let tree = document.tree().expect("last good tree kept");
        assert!(tree.find_path("/resources/orders/type").is_some());
        assert_eq!(document.version, 2);
    }

    #[test]
    fn test_update_cancels_outstanding_requests() {
        let mut document = Document::new("version: 1".to_string(), 1, SyntaxVariant::Yaml);
        let token = document.request_token();
        document.update("version: 2".to_string(), 2);
        assert!(token.is_cancelled());
        assert!(!document.request_token().is_cancelled());
    }
}
