//! Error types shared across the crate
//!
//! Nothing in here reaches the editor: feature services catch every variant
//! and fall back to an empty result.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The live document text does not parse
    #[error("document does not parse: {message}")]
    ParseUnavailable {
        message: String,
        /// 0-indexed line of the error, as reported by the parser
        line: u32,
        /// 0-indexed column of the error
        column: u32,
    },
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
    #[error("schema unavailable for `{0}`")]
    SchemaUnavailable(String),
    #[error("malformed path: {0}")]
    MalformedPath(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("provider registry error: {0}")]
    Registry(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
