//! blueprint-lsp: language server library for infrastructure blueprints
//!
//! Blueprints are YAML or JSON-with-comments documents declaring resources,
//! variables, values, data sources and child blueprints, with `${...}`
//! substitutions referencing them. This library provides:
//! - A schema-correlated document tree with source ranges
//! - Reference path parsing and navigation over type schemas and authored data
//! - Cursor to element resolution and cross-reference search
//! - Link inference between resources
//! - Completion, hover and find references
//!
//! # Example
//!
//! ```
//! use blueprint_lsp::path::{parse_path, PathSegment};
//!
//! let parsed = parse_path("resources.ordersTable.spec.items[2].");
//! assert_eq!(parsed.segments[4], PathSegment::ArrayIndex(2));
//! assert_eq!(parsed.partial, "");
//! ```

pub mod ast;
pub mod completion;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod hover;
pub mod links;
pub mod literal;
pub mod parser;
pub mod path;
pub mod position;
pub mod provider;
pub mod references;
pub mod resolve;
pub mod schema;
pub mod workspace;

mod backend;

pub use backend::Backend;
pub use workspace::{ResolvedPosition, Services, Snapshot, Workspace};
