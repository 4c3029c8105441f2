//! Syntax-specific insert text
//!
//! YAML quotes a scalar only when it would otherwise read as something else.
//! JSON always quotes keys and string values, and has to look at what is
//! already typed so quotes stay balanced.

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::SyntaxVariant;

/// What surrounds the text an edit replaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertSite {
    /// Quote character directly before the replaced text
    pub open_quote: Option<char>,
    /// The same quote character directly follows the cursor
    pub closing_quote_follows: bool,
    /// `: ` (colon and blank) precedes the replaced text
    pub after_colon_space: bool,
    /// A bare `:` directly precedes the replaced text
    pub after_colon: bool,
    /// The replaced text sits inside a double-quoted string
    pub in_double_quotes: bool,
}

impl InsertSite {
    /// Inspect `text` around the byte range `start..end` being replaced
    pub fn inspect(text: &str, start: usize, end: usize) -> Self {
        let before = &text[..start.min(text.len())];
        let after = &text[end.min(text.len())..];
        let open_quote = before.chars().last().filter(|c| *c == '"' || *c == '\'');
        let closing_quote_follows = match open_quote {
            Some(quote) => after.starts_with(quote),
            None => false,
        };
        let line_before = before.rsplit('\n').next().unwrap_or_default();
        let in_double_quotes = line_before.matches('"').count() % 2 == 1;
        Self {
            open_quote,
            closing_quote_follows,
            after_colon_space: before.ends_with(": ") || before.ends_with(":\t"),
            after_colon: before.ends_with(':'),
            in_double_quotes,
        }
    }
}

/// Produces syntax-correct insert text for one concrete syntax
pub trait FormatAdapter: Send + Sync {
    fn syntax(&self) -> SyntaxVariant;

    /// Text inserted for a mapping key
    fn key_text(&self, key: &str, site: &InsertSite) -> String;

    /// Text inserted for a scalar value or sequence entry
    fn value_text(&self, value: &str, site: &InsertSite) -> String;

    /// Quote used for bracketed keys inside a substitution path
    fn path_key_quote(&self, site: &InsertSite) -> char;
}

/// Adapter for the document's syntax
pub fn adapter_for(syntax: SyntaxVariant) -> &'static dyn FormatAdapter {
    match syntax {
        SyntaxVariant::Yaml => &YamlFormat,
        SyntaxVariant::Json => &JsonFormat,
    }
}

/// Finish a string whose opening quote is already typed
fn close_quoted(text: &str, quote: char, site: &InsertSite) -> String {
    if site.closing_quote_follows {
        text.to_string()
    } else {
        format!("{}{}", text, quote)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

lazy_static! {
    static ref YAML_RESERVED_RE: Regex =
        Regex::new(r"(?i)^(true|false|yes|no|on|off|y|n|null|~)$").unwrap();
    static ref YAML_NUMBER_RE: Regex =
        Regex::new(r"^[-+]?(\.inf|\.nan|0x[0-9a-fA-F]+|0o[0-7]+|[0-9][0-9_]*(\.[0-9]*)?([eE][-+]?[0-9]+)?|\.[0-9]+([eE][-+]?[0-9]+)?)$")
            .unwrap();
}

/// Whether a plain YAML scalar would be read as something other than the
/// string `value`
pub fn yaml_needs_quotes(value: &str) -> bool {
    const SPECIAL_START: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ];
    value.is_empty()
        || value.trim() != value
        || YAML_RESERVED_RE.is_match(value)
        || YAML_NUMBER_RE.is_match(value)
        || value.starts_with(SPECIAL_START)
        || value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
}

fn yaml_scalar(value: &str) -> String {
    if yaml_needs_quotes(value) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

impl FormatAdapter for YamlFormat {
    fn syntax(&self) -> SyntaxVariant {
        SyntaxVariant::Yaml
    }

    fn key_text(&self, key: &str, site: &InsertSite) -> String {
        match site.open_quote {
            Some(quote) => close_quoted(key, quote, site),
            None => yaml_scalar(key),
        }
    }

    fn value_text(&self, value: &str, site: &InsertSite) -> String {
        match site.open_quote {
            Some(quote) => close_quoted(value, quote, site),
            None if site.after_colon => format!(" {}", yaml_scalar(value)),
            None => yaml_scalar(value),
        }
    }

    fn path_key_quote(&self, site: &InsertSite) -> char {
        if site.in_double_quotes {
            '\''
        } else {
            '"'
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Contents of a JSON string without its surrounding quotes
fn json_string_body(value: &str) -> String {
    let quoted = json_string(value);
    quoted[1..quoted.len() - 1].to_string()
}

impl FormatAdapter for JsonFormat {
    fn syntax(&self) -> SyntaxVariant {
        SyntaxVariant::Json
    }

    fn key_text(&self, key: &str, site: &InsertSite) -> String {
        match site.open_quote {
            Some(quote) => close_quoted(&json_string_body(key), quote, site),
            None => json_string(key),
        }
    }

    fn value_text(&self, value: &str, site: &InsertSite) -> String {
        if let Some(quote) = site.open_quote {
            // Already past the opening quote
            close_quoted(&json_string_body(value), quote, site)
        } else if site.after_colon_space || !site.after_colon {
            json_string(value)
        } else {
            // Directly after the colon
            format!(" {}", json_string(value))
        }
    }

    fn path_key_quote(&self, _site: &InsertSite) -> char {
        // Paths always live inside a double-quoted JSON string
        '\''
    }
}
