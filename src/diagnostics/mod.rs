//! Diagnostics published for open documents

mod parse_errors;

pub use parse_errors::DiagnosticCollector;
