//! Structural parsing of blueprint text
//!
//! YAML goes straight through `serde_yaml`. JSON with comments is cleaned,
//! parsed with `serde_json` and converted so the tree builder only ever sees
//! a `serde_yaml::Value`. Error positions are reported 0-indexed.

use lazy_static::lazy_static;
use regex::Regex;
use serde_yaml::Value;

use crate::document::SyntaxVariant;
use crate::error::{Error, Result};

use super::jsonc::blank_comments;

/// Parse `text` into a generic value.
///
/// Returns the parsed value and the text offsets were computed against
/// (identical to `text` for YAML, comment-blanked for JSON).
pub fn parse_value(text: &str, syntax: SyntaxVariant) -> Result<(Value, String)> {
    match syntax {
        SyntaxVariant::Yaml => {
            let value = serde_yaml::from_str::<Value>(text).map_err(|err| {
                let message = err.to_string();
                let (line, column) = match err.location() {
                    Some(location) => (
                        (location.line() as u32).saturating_sub(1),
                        (location.column() as u32).saturating_sub(1),
                    ),
                    None => extract_error_position(&message),
                };
                Error::ParseUnavailable {
                    message: clean_error_message(&message),
                    line,
                    column,
                }
            })?;
            Ok((value, text.to_string()))
        }
        SyntaxVariant::Json => {
            let cleaned = blank_comments(text);
            if cleaned.trim().is_empty() {
                return Ok((Value::Null, cleaned));
            }
            let json = serde_json::from_str::<serde_json::Value>(&cleaned).map_err(|err| {
                Error::ParseUnavailable {
                    message: clean_error_message(&err.to_string()),
                    line: (err.line() as u32).saturating_sub(1),
                    column: (err.column() as u32).saturating_sub(1),
                }
            })?;
            let value = serde_yaml::to_value(json).map_err(|err| Error::ParseUnavailable {
                message: err.to_string(),
                line: 0,
                column: 0,
            })?;
            Ok((value, cleaned))
        }
    }
}

/// Extract line and column from a parser error message
///
/// Errors often look like: "... at line 5 column 10"
fn extract_error_position(message: &str) -> (u32, u32) {
    lazy_static! {
        static ref POSITION_RE: Regex = Regex::new(r"at line (\d+) column (\d+)").unwrap();
    }

    if let Some(caps) = POSITION_RE.captures(message) {
        let line: u32 = caps
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        let column: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(1);
        // Parsers report 1-indexed positions, LSP uses 0-indexed
        (line.saturating_sub(1), column.saturating_sub(1))
    } else {
        (0, 0)
    }
}

/// Remove the "at line X column Y" suffix, the position travels separately
fn clean_error_message(message: &str) -> String {
    lazy_static! {
        static ref POSITION_SUFFIX_RE: Regex = Regex::new(r"\s+at line \d+ column \d+$").unwrap();
    }

    POSITION_SUFFIX_RE.replace(message, "").to_string()
}
