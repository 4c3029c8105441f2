//! `${...}` substitution scanning
//!
//! Uses brace matching so nested calls like
//! `${join(",", [resources.a.spec.id, "x}"])}` are taken as a single span.
//! `$${` is an escaped literal and never opens a substitution.
//!
//! Quoted scalars are scanned after their escapes are decoded, so
//! `"${trimprefix(values.prefix, \"p\")}"` in JSON sees the same
//! `"p"` literal as the plain YAML form. [`DecodedScalar`] maps decoded
//! offsets back to the source.

use std::ops::Range;

use crate::ast::ElementCategory;
use crate::path::path_extent;

/// Byte ranges of every substitution in `text`, each covering `${` through `}`
pub fn scan_substitutions(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut i = 0;

    while i < len {
        if i + 2 < len && bytes[i] == b'$' && bytes[i + 1] == b'$' && bytes[i + 2] == b'{' {
            // Escaped, skip past the brace
            i += 3;
            continue;
        }
        if i + 1 < len && bytes[i] == b'$' && bytes[i + 1] == b'{' {
            if let Some(end) = find_matching_brace(text, i + 1) {
                spans.push(i..end);
                i = end;
                continue;
            }
        }
        i += 1;
    }

    spans
}

/// Find the matching closing brace for an opening brace at `open_pos`.
/// Returns the end position (exclusive).
/// Handles nested braces and string literals with escaped quotes.
pub fn find_matching_brace(text: &str, open_pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open_pos) != Some(&b'{') {
        return None;
    }

    let mut depth = 0;
    let mut i = open_pos;
    let len = bytes.len();

    while i < len {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < len {
                    match bytes[i] {
                        b'\\' => i += 2,
                        b if b == quote => break,
                        _ => i += 1,
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Byte ranges of reference expressions inside substitution content.
///
/// A reference starts with a namespace identifier (`resources`, `variables`,
/// `values`, `datasources`, `children`) directly followed by `.` or `[`.
/// String literals are skipped.
pub fn find_reference_spans(content: &str) -> Vec<Range<usize>> {
    let bytes = content.as_bytes();
    let len = bytes.len();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        if b == b'"' {
            i += 1;
            while i < len && bytes[i] != b'"' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            continue;
        }
        let boundary = i == 0 || !is_ident_byte(bytes[i - 1]) && bytes[i - 1] != b'.';
        if boundary && (b.is_ascii_alphabetic() || b == b'_') {
            let start = i;
            while i < len && is_ident_byte(bytes[i]) {
                i += 1;
            }
            let word = &content[start..i];
            let opens_path = matches!(bytes.get(i), Some(b'.') | Some(b'['));
            if opens_path && ElementCategory::from_namespace(word).is_some() {
                let end = path_extent(content, start);
                spans.push(start..end);
                i = end.max(i);
            }
            continue;
        }
        i += 1;
    }

    spans
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// A scalar's value with quotes and escapes removed, plus the source offset
/// of every byte of it
#[derive(Debug, Clone)]
pub struct DecodedScalar {
    pub text: String,
    /// One entry per byte of `text` and one for its end
    offsets: Vec<usize>,
}

impl DecodedScalar {
    /// Decode the scalar written as `raw`, which starts at byte `base` of
    /// the source.
    ///
    /// Double-quoted scalars lose their backslash escapes (JSON and YAML
    /// share the common ones), single-quoted scalars their doubled `''`.
    /// Plain scalars are taken as written.
    pub fn new(raw: &str, base: usize) -> Self {
        let quote = match raw.as_bytes().first() {
            Some(b'"') => Some('"'),
            Some(b'\'') => Some('\''),
            _ => None,
        };
        let Some(quote) = quote else {
            return Self {
                text: raw.to_string(),
                offsets: (0..=raw.len()).map(|i| base + i).collect(),
            };
        };

        let body = &raw[1..];
        let body = if !body.is_empty() && body.ends_with(quote) && !ends_escaped(body, quote) {
            &body[..body.len() - 1]
        } else {
            body
        };
        let body_base = base + 1;

        let mut decoded = Self {
            text: String::with_capacity(body.len()),
            offsets: Vec::with_capacity(body.len() + 1),
        };
        let mut chars = body.char_indices().peekable();
        while let Some((at, c)) = chars.next() {
            let c = match (quote, c) {
                ('"', '\\') => match chars.next() {
                    Some((_, escape)) => unescape(escape, &mut chars),
                    None => c,
                },
                ('\'', '\'') if chars.peek().map(|(_, next)| *next) == Some('\'') => {
                    chars.next();
                    '\''
                }
                _ => c,
            };
            decoded.push(c, body_base + at);
        }
        decoded.offsets.push(body_base + body.len());
        decoded
    }

    fn push(&mut self, c: char, source: usize) {
        self.text.push(c);
        self.offsets.extend(std::iter::repeat(source).take(c.len_utf8()));
    }

    /// Source offset of byte `at` of the decoded text
    pub fn source_offset(&self, at: usize) -> usize {
        self.offsets
            .get(at)
            .or(self.offsets.last())
            .copied()
            .unwrap_or_default()
    }
}

/// Whether the closing quote of `body` is itself escaped (`"\"` unterminated)
fn ends_escaped(body: &str, quote: char) -> bool {
    if quote != '"' {
        return false;
    }
    let backslashes = body[..body.len() - 1]
        .bytes()
        .rev()
        .take_while(|b| *b == b'\\')
        .count();
    backslashes % 2 == 1
}

fn unescape<I>(escape: char, chars: &mut std::iter::Peekable<I>) -> char
where
    I: Iterator<Item = (usize, char)>,
{
    let digits = match escape {
        'n' => return '\n',
        't' => return '\t',
        'r' => return '\r',
        '0' => return '\0',
        'b' => return '\u{8}',
        'f' => return '\u{c}',
        'x' => 2,
        'u' => 4,
        'U' => 8,
        other => return other,
    };
    let mut hex = String::with_capacity(digits);
    while hex.len() < digits {
        match chars.peek() {
            Some((_, c)) if c.is_ascii_hexdigit() => {
                hex.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
}
