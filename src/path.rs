//! Reference path tokenizing
//!
//! Turns text like `resources["orders.v1"].spec.items[0].name` into ordered
//! [`PathSegment`]s. Only `[N]` produces an array index: a bare numeral after
//! a dot (`a.0.b`) is always a field name.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

/// One step of a reference path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    FieldName(String),
    ArrayIndex(usize),
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::FieldName(name.into())
    }

    pub fn as_field(&self) -> Option<&str> {
        match self {
            PathSegment::FieldName(name) => Some(name),
            PathSegment::ArrayIndex(_) => None,
        }
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::FieldName(name) => write!(f, "{}", name),
            PathSegment::ArrayIndex(index) => write!(f, "[{}]", index),
        }
    }
}

/// Result of tokenizing a path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPath {
    /// Fully delimited segments
    pub segments: Vec<PathSegment>,
    /// Trailing text the user is still typing (may be empty)
    pub partial: String,
    /// Set when a bracket or quote was left open
    pub malformed: bool,
    /// Byte offset of the `[` that was left open
    pub open_bracket: Option<usize>,
}

impl ParsedPath {
    /// Segments plus the partial segment as a field name
    pub fn full(&self) -> Vec<PathSegment> {
        let mut segments = self.segments.clone();
        if !self.partial.is_empty() {
            segments.push(PathSegment::FieldName(self.partial.clone()));
        }
        segments
    }
}

/// Tokenize a reference path.
///
/// Never fails: unbalanced brackets or quotes leave the remaining text in
/// [`ParsedPath::partial`] and set [`ParsedPath::malformed`].
pub fn parse_path(text: &str) -> ParsedPath {
    parse_path_spanned(text).0
}

/// Tokenize a reference path, also returning the byte span of each
/// completed segment within `text`.
pub fn parse_path_spanned(text: &str) -> (ParsedPath, Vec<Range<usize>>) {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let offset_of = |i: usize| chars.get(i).map(|(o, _)| *o).unwrap_or(text.len());

    let mut parsed = ParsedPath::default();
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut current_start = 0;
    let mut i = 0;

    while i < chars.len() {
        match chars[i].1 {
            '.' => {
                flush_field(&mut current, current_start..offset_of(i), &mut parsed, &mut spans);
                i += 1;
            }
            '[' => {
                flush_field(&mut current, current_start..offset_of(i), &mut parsed, &mut spans);
                let open = offset_of(i);
                i += 1;
                match chars.get(i).map(|(_, c)| *c) {
                    Some(quote) if quote == '"' || quote == '\'' => {
                        i += 1;
                        let start = i;
                        while i < chars.len() && chars[i].1 != quote {
                            i += 1;
                        }
                        let key = text[offset_of(start)..offset_of(i)].to_string();
                        if i >= chars.len() {
                            // Unterminated quote: the user is mid-key
                            parsed.partial = key;
                            parsed.malformed = true;
                            parsed.open_bracket = Some(open);
                            return (parsed, spans);
                        }
                        // Skip the closing quote and anything up to `]`
                        i += 1;
                        while i < chars.len() && chars[i].1 != ']' {
                            i += 1;
                        }
                        if i >= chars.len() {
                            parsed.malformed = true;
                            parsed.open_bracket = Some(open);
                        }
                        i += 1;
                        parsed.segments.push(PathSegment::FieldName(key));
                        spans.push(open..offset_of(i));
                    }
                    _ => {
                        let start = i;
                        while i < chars.len() && chars[i].1 != ']' {
                            i += 1;
                        }
                        let inner = &text[offset_of(start)..offset_of(i)];
                        if i >= chars.len() {
                            parsed.partial = inner.to_string();
                            parsed.malformed = true;
                            parsed.open_bracket = Some(open);
                            return (parsed, spans);
                        }
                        let inner = inner.trim();
                        let segment = match inner.parse::<usize>() {
                            Ok(index) => PathSegment::ArrayIndex(index),
                            Err(_) => PathSegment::FieldName(inner.to_string()),
                        };
                        i += 1;
                        parsed.segments.push(segment);
                        spans.push(open..offset_of(i));
                    }
                }
                current_start = offset_of(i);
            }
            c => {
                if current.is_empty() {
                    current_start = offset_of(i);
                }
                current.push(c);
                i += 1;
            }
        }
    }

    parsed.partial = current;
    (parsed, spans)
}

fn flush_field(
    current: &mut String,
    span: Range<usize>,
    parsed: &mut ParsedPath,
    spans: &mut Vec<Range<usize>>,
) {
    if !current.is_empty() {
        parsed
            .segments
            .push(PathSegment::FieldName(std::mem::take(current)));
        spans.push(span);
    }
}

lazy_static! {
    static ref PLAIN_KEY_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Whether a key has to be written as `["key"]` in a path
pub fn needs_bracket_notation(key: &str) -> bool {
    !PLAIN_KEY_RE.is_match(key)
}

/// Render a single field key for use after a path prefix
pub fn render_field(key: &str, first: bool) -> String {
    if needs_bracket_notation(key) {
        let quote = if key.contains('"') { '\'' } else { '"' };
        format!("[{quote}{key}{quote}]")
    } else if first {
        key.to_string()
    } else {
        format!(".{}", key)
    }
}

/// Serialize segments back to path text
pub fn render_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::FieldName(name) => out.push_str(&render_field(name, i == 0)),
            PathSegment::ArrayIndex(index) => out.push_str(&format!("[{}]", index)),
        }
    }
    out
}

/// Whether `c` can appear in a path outside of brackets
pub fn is_path_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Byte offset where the path expression starting at `start` ends.
///
/// Bracketed keys may contain any character except their closing quote.
pub fn path_extent(text: &str, start: usize) -> usize {
    let mut chars = text[start..].char_indices();
    let mut end = start;
    while let Some((offset, c)) = chars.next() {
        if is_path_char(c) {
            end = start + offset + c.len_utf8();
            continue;
        }
        if c != '[' {
            break;
        }
        let mut quote: Option<char> = None;
        let mut closed = false;
        for (inner_offset, inner) in chars.by_ref() {
            match quote {
                Some(q) if inner == q => quote = None,
                Some(_) => {}
                None if inner == '"' || inner == '\'' => quote = Some(inner),
                None if inner == ']' => {
                    end = start + inner_offset + 1;
                    closed = true;
                    break;
                }
                None => {}
            }
        }
        if !closed {
            end = text.len();
            break;
        }
    }
    end
}
