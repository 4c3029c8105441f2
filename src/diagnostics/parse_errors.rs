//! Parse error diagnostics

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

pub const SOURCE: &str = "blueprint-lsp";

/// Collects diagnostics for one document version
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a syntax error at a 0-indexed position
    pub fn add_parse_error(&mut self, message: String, line: u32, column: u32) {
        let position = Position {
            line,
            character: column,
        };
        self.diagnostics.push(Diagnostic {
            range: Range {
                start: position,
                end: position,
            },
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE.to_string()),
            message,
            ..Default::default()
        });
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Convert into the final list of diagnostics
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_diagnostic() {
        let mut collector = DiagnosticCollector::new();
        assert!(collector.is_empty());
        collector.add_parse_error("found unexpected end of stream".to_string(), 3, 7);

        let diagnostics = collector.into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].range.start, Position::new(3, 7));
        assert_eq!(diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostics[0].source.as_deref(), Some("blueprint-lsp"));
    }
}
