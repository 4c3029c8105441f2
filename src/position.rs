//! Conversion between LSP positions (0-indexed) and tree positions (1-indexed)
//!
//! This is the only place where the two conventions meet. Columns on both
//! sides count UTF-16 code units (the LSP default encoding); byte offsets are
//! turned into columns by [`crate::parser::LineIndex`].

use tower_lsp::lsp_types;

use crate::ast::{Position, SourceRange};

pub fn from_lsp(position: lsp_types::Position) -> Position {
    Position::new(position.line + 1, position.character + 1)
}

pub fn to_lsp(position: Position) -> lsp_types::Position {
    lsp_types::Position::new(
        position.line.saturating_sub(1),
        position.column.saturating_sub(1),
    )
}

pub fn range_to_lsp(range: SourceRange) -> lsp_types::Range {
    lsp_types::Range::new(to_lsp(range.start), to_lsp(range.end))
}
