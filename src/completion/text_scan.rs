//! Reading the completion site from raw text
//!
//! Used when the tree can't describe the cursor: the live text does not
//! parse, or the cursor sits somewhere the tree has no node for (a blank
//! line, a key being typed).

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::SyntaxVariant;
use crate::parser::{blank_comments, find_matching_brace};
use crate::path::path_extent;

/// Content start of the `${` substitution left open before `offset`
pub(crate) fn open_substitution(text: &str, offset: usize) -> Option<usize> {
    let offset = offset.min(text.len());
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..offset];

    let mut search_end = line.len();
    while let Some(found) = line[..search_end].rfind("${") {
        let open = line_start + found;
        let escaped = found > 0 && line.as_bytes()[found - 1] == b'$';
        if !escaped {
            return match find_matching_brace(text, open + 1) {
                Some(close) if close <= offset => None,
                _ => Some(open + 2),
            };
        }
        search_end = found;
    }
    None
}

/// Start of the path expression that runs up to the end of `text`, or
/// `text.len()` when the text ends outside of one
pub(crate) fn trailing_path_start(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' || b == b'\'' {
            i += 1;
            while i < bytes.len() && bytes[i] != b {
                i += 1;
            }
            i += 1;
            continue;
        }
        let boundary = i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
        if boundary && (b.is_ascii_alphabetic() || b == b'_') {
            let end = path_extent(text, i);
            if end >= text.len() {
                return i;
            }
            i = end.max(i + 1);
            continue;
        }
        i += 1;
    }
    text.len()
}

/// What the cursor is positioned to type
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SiteKind {
    Key,
    /// Value of the last key in the path
    Value,
    /// Entry of the sequence at the path
    Entry,
}

/// A completion site found by scanning text
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextSite {
    pub kind: SiteKind,
    /// Keys from the document root down to the mapping holding a key site,
    /// the key holding a value site, or the sequence holding an entry site
    pub path: Vec<String>,
    /// Offset where the typed text starts, after any opening quote
    pub prefix_start: usize,
}

pub(crate) fn scan_site(text: &str, offset: usize, syntax: SyntaxVariant) -> Option<TextSite> {
    let offset = offset.min(text.len());
    match syntax {
        SyntaxVariant::Yaml => yaml_site(text, offset),
        SyntaxVariant::Json => json_site(text, offset),
    }
}

lazy_static! {
    /// A mapping key at the start of a line, after its indentation
    static ref KEY_RE: Regex =
        Regex::new(r#"^(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)'|(?P<plain>[^\s:#"'\-\[{][^:#]*?|-[^\s:#][^:#]*?))[ \t]*:(?:[ \t]+|$)"#)
            .unwrap();
}

fn key_of(content: &str) -> Option<(String, usize)> {
    let caps = KEY_RE.captures(content)?;
    let key = caps
        .name("dq")
        .or_else(|| caps.name("sq"))
        .or_else(|| caps.name("plain"))?
        .as_str()
        .to_string();
    Some((key, caps.get(0)?.end()))
}

fn yaml_site(text: &str, offset: usize) -> Option<TextSite> {
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..offset];
    if line.trim_start().starts_with('#') {
        return None;
    }
    let indent = line.len() - line.trim_start_matches(' ').len();
    let mut content = &line[indent..];
    let mut content_start = line_start + indent;
    let mut threshold = indent;

    let in_item = content == "-" || content.starts_with("- ");
    if in_item {
        let rest = content[1..].trim_start_matches(' ');
        content_start += content.len() - rest.len();
        content = rest;
        // Block sequences may sit at their parent key's indentation
        threshold = indent + 1;
    }
    let mut parents = yaml_parents(&text[..line_start], threshold);

    if let Some((key, value_offset)) = key_of(content) {
        let value = &content[value_offset..];
        let value_start = content_start + value_offset;
        if value_offset == content.len() && !content.ends_with(|c: char| c == ' ' || c == '\t') {
            // Cursor directly after the colon
            return None;
        }
        parents.push(key);
        return Some(match value.chars().next() {
            Some('[') => TextSite {
                kind: SiteKind::Entry,
                path: parents,
                prefix_start: flow_entry_start(value, value_start),
            },
            Some('{') => return None,
            _ => TextSite {
                kind: SiteKind::Value,
                path: parents,
                prefix_start: after_quote(value, value_start),
            },
        });
    }

    if content.contains(": ") {
        return None;
    }
    let kind = if in_item { SiteKind::Entry } else { SiteKind::Key };
    Some(TextSite {
        kind,
        path: parents,
        prefix_start: after_quote(content, content_start),
    })
}

/// Keys of the mappings enclosing a line indented by `threshold`, read from
/// the lines above it
fn yaml_parents(above: &str, mut threshold: usize) -> Vec<String> {
    let mut keys = Vec::new();
    for line in above.lines().rev() {
        if threshold == 0 {
            break;
        }
        let trimmed = line.trim_start_matches(' ');
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let indent = line.len() - trimmed.len();
        let (content, key_indent) = match trimmed.strip_prefix("- ") {
            Some(rest) => (rest.trim_start_matches(' '), indent + (trimmed.len() - rest.trim_start_matches(' ').len())),
            None => (trimmed, indent),
        };
        if key_indent >= threshold {
            if indent < threshold {
                // A sibling key of the mapping inside a sequence item
                threshold = indent;
            }
            continue;
        }
        if let Some((key, _)) = key_of(content) {
            keys.push(key);
        }
        threshold = indent;
    }
    keys.reverse();
    keys
}

fn after_quote(value: &str, value_start: usize) -> usize {
    match value.chars().next() {
        Some('"') | Some('\'') => value_start + 1,
        _ => value_start,
    }
}

/// Start of the entry being typed in a flow sequence such as `[a, b`
fn flow_entry_start(value: &str, value_start: usize) -> usize {
    let last = value.rfind(|c| c == '[' || c == ',').unwrap_or(0);
    let rest = &value[last + 1..];
    let trimmed = rest.trim_start();
    after_quote(trimmed, value_start + last + 1 + (rest.len() - trimmed.len()))
}

#[derive(Debug)]
struct Container {
    is_array: bool,
    /// Key that opened the container
    key: Option<String>,
}

fn json_site(text: &str, offset: usize) -> Option<TextSite> {
    let cleaned = blank_comments(&text[..offset]);
    let bytes = cleaned.as_bytes();
    let mut stack: Vec<Container> = Vec::new();
    let mut pending_key: Option<String> = None;
    let mut open_string: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let start = i + 1;
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                if i >= bytes.len() {
                    open_string = Some(start);
                    break;
                }
                let value = &cleaned[start..i];
                let mut j = i + 1;
                while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                    j += 1;
                }
                if bytes.get(j) == Some(&b':') {
                    pending_key = Some(value.to_string());
                }
            }
            b'{' | b'[' => stack.push(Container {
                is_array: bytes[i] == b'[',
                key: pending_key.take(),
            }),
            b'}' | b']' => {
                stack.pop();
                pending_key = None;
            }
            b',' => pending_key = None,
            _ => {}
        }
        i += 1;
    }

    let top = stack.last()?;
    let mut path: Vec<String> = stack.iter().filter_map(|c| c.key.clone()).collect();
    let prefix_start = match open_string {
        Some(start) => start,
        None => {
            // Outside a string only a bare word may be in progress
            let word = cleaned
                .trim_end_matches(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '/');
            word.len()
        }
    };

    let kind = if top.is_array {
        SiteKind::Entry
    } else if let Some(key) = pending_key.filter(|_| after_colon(&cleaned, prefix_start, open_string.is_some())) {
        path.push(key);
        SiteKind::Value
    } else {
        SiteKind::Key
    };
    Some(TextSite {
        kind,
        path,
        prefix_start,
    })
}

/// Whether the typed text is preceded by `:` (past an opening quote and
/// blanks)
fn after_colon(cleaned: &str, prefix_start: usize, quoted: bool) -> bool {
    let before = if quoted {
        &cleaned[..prefix_start.saturating_sub(1)]
    } else {
        &cleaned[..prefix_start]
    };
    before.trim_end().ends_with(':')
}
