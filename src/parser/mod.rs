//! Parser module: blueprint text to document tree

mod jsonc;
mod locator;
mod substitutions;
mod tree;
mod yaml;

use crate::ast::Node;
use crate::document::SyntaxVariant;
use crate::error::Result;

pub use jsonc::blank_comments;
pub use locator::LineIndex;
pub use substitutions::{find_matching_brace, find_reference_spans, scan_substitutions};
pub use tree::reference_from_segments;

/// A successfully parsed document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub root: Node,
    /// The text the tree was built from
    pub text: String,
    pub syntax: SyntaxVariant,
}

/// Parse blueprint text into a document tree.
///
/// Fails with [`crate::error::Error::ParseUnavailable`] when the text is not
/// well formed; callers keep using their last good tree in that case.
pub fn parse_document(text: &str, syntax: SyntaxVariant) -> Result<ParsedDocument> {
    let (value, located) = yaml::parse_value(text, syntax)?;
    let root = tree::TreeBuilder::new(&located, syntax == SyntaxVariant::Json).build(&value);
    Ok(ParsedDocument {
        root,
        text: text.to_string(),
        syntax,
    })
}
