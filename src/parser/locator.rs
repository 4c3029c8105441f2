//! Source positions for parsed values
//!
//! `serde_yaml` and `serde_json` don't expose spans, so the tree builder walks
//! the raw text in document order alongside the parsed value and locates
//! each key and scalar with the helpers below.

use lazy_static::lazy_static;
use regex::Regex;

use crate::ast::Position;

use super::substitutions::find_matching_brace;

/// Line start offsets for converting between byte offsets and positions
#[derive(Debug, Clone)]
pub struct LineIndex<'t> {
    text: &'t str,
    line_starts: Vec<usize>,
}

impl<'t> LineIndex<'t> {
    pub fn new(text: &'t str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { text, line_starts }
    }

    /// 1-indexed position of a byte offset. Columns count UTF-16 code
    /// units, as LSP positions do.
    pub fn position(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = self.text[start..offset].encode_utf16().count();
        Position::new(line as u32 + 1, column as u32 + 1)
    }

    /// Byte offset of a 1-indexed position, clamped to the line and text
    pub fn offset(&self, pos: Position) -> usize {
        let line = (pos.line.max(1) - 1) as usize;
        let Some(&start) = self.line_starts.get(line) else {
            return self.text.len();
        };
        let line_end = self.line_end(start);
        let column = (pos.column.max(1) - 1) as usize;
        let mut units = 0;
        for (i, c) in self.text[start..line_end].char_indices() {
            // A column inside a surrogate pair lands on the char holding it
            if units + c.len_utf16() > column {
                return start + i;
            }
            units += c.len_utf16();
        }
        line_end
    }

    fn line_end(&self, start: usize) -> usize {
        self.text[start..]
            .find('\n')
            .map(|i| start + i)
            .unwrap_or(self.text.len())
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Find the next occurrence of `key` written as a mapping key at or after
/// `from`. Returns the key start and the offset just past its colon.
pub fn find_key(text: &str, from: usize, key: &str) -> Option<(usize, usize)> {
    let escaped = regex::escape(key);
    let pattern = format!(
        r#"(?m)(?:^|[\s{{,])(?P<key>"{k}"[ \t]*:|'{k}'[ \t]*:|{k}[ \t]*:(?:\s|$))"#,
        k = escaped
    );
    let re = Regex::new(&pattern).ok()?;
    // Start one byte early so the separator before a key sitting exactly
    // at `from` can still match
    let caps = re.captures_at(text, from.saturating_sub(1))?;
    let start = caps.name("key")?.start();
    let key_len = match text.as_bytes()[start] {
        b'"' | b'\'' => key.len() + 2,
        _ => key.len(),
    };
    let colon = text[start + key_len..].find(':')? + start + key_len;
    Some((start, colon + 1))
}

/// Skip spaces, tabs, newlines and `#` comments
pub fn skip_trivia(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            b'#' if i == 0 || bytes[i - 1].is_ascii_whitespace() => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            _ => break,
        }
    }
    i
}

/// Skip trivia plus sequence punctuation (`[`, `,`, and block `- ` markers)
pub fn skip_item_markers(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = skip_trivia(text, from);
    while i < bytes.len() {
        let dash_marker = bytes[i] == b'-'
            && bytes.get(i + 1).map_or(true, |b| b.is_ascii_whitespace());
        if bytes[i] == b'[' || bytes[i] == b',' || dash_marker {
            i = skip_trivia(text, i + 1);
        } else {
            break;
        }
    }
    i
}

/// Whether only blanks or a comment follow `from` on its line
pub fn rest_of_line_is_empty(text: &str, from: usize) -> bool {
    let rest = &text[from.min(text.len())..];
    let line = rest.split('\n').next().unwrap_or_default().trim();
    line.is_empty() || line.starts_with('#')
}

/// Number of leading spaces on the line containing `offset`
pub fn indent_at(text: &str, offset: usize) -> usize {
    let start = text[..offset.min(text.len())]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    text[start..].bytes().take_while(|b| *b == b' ').count()
}

/// End offset of the container opened by `{` or `[` at `open`
pub fn container_end(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let (opener, closer) = match bytes.get(open)? {
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };
    if opener == b'{' {
        return find_matching_brace(text, open);
    }
    let mut depth = 0;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let quote = bytes[i];
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b if b == opener => depth += 1,
            b if b == closer => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

lazy_static! {
    static ref BLOCK_SCALAR_RE: Regex = Regex::new(r"^[|>][-+0-9]*[ \t]*(?:#.*)?$").unwrap();
}

/// End offset of the scalar starting at `start`.
///
/// `flow` is set inside `{}`/`[]` collections (and for every JSON value),
/// where `,`, `]` and `}` terminate plain scalars. `parent_indent` bounds
/// YAML block scalars (`|`, `>`).
pub fn scalar_extent(text: &str, start: usize, flow: bool, parent_indent: usize) -> usize {
    let bytes = text.as_bytes();
    if start >= bytes.len() {
        return start;
    }
    match bytes[start] {
        b'"' => {
            let mut i = start + 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'"' => return i + 1,
                    _ => i += 1,
                }
            }
            bytes.len()
        }
        b'\'' => {
            let mut i = start + 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    return i + 1;
                }
                i += 1;
            }
            bytes.len()
        }
        b'|' | b'>' if !flow && is_block_scalar_header(text, start) => {
            block_scalar_end(text, start, parent_indent)
        }
        _ => plain_scalar_end(text, start, flow),
    }
}

fn is_block_scalar_header(text: &str, start: usize) -> bool {
    let line = text[start..].split('\n').next().unwrap_or_default();
    BLOCK_SCALAR_RE.is_match(line.trim_end())
}

fn block_scalar_end(text: &str, start: usize, parent_indent: usize) -> usize {
    let mut end = text[start..]
        .find('\n')
        .map(|i| start + i)
        .unwrap_or(text.len());
    let mut line_start = end + 1;
    while line_start < text.len() {
        let line_end = text[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(text.len());
        let line = &text[line_start..line_end];
        if !line.trim().is_empty() {
            let indent = line.bytes().take_while(|b| *b == b' ').count();
            if indent <= parent_indent {
                break;
            }
            end = line_end;
        }
        line_start = line_end + 1;
    }
    end
}

fn plain_scalar_end(text: &str, start: usize, flow: bool) -> usize {
    let bytes = text.as_bytes();
    let mut i = start;
    let mut end = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' | b'\r' => break,
            b'#' if i > start && bytes[i - 1].is_ascii_whitespace() => break,
            b',' | b']' | b'}' if flow => break,
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                match find_matching_brace(text, i + 1) {
                    Some(close) => {
                        i = close;
                        end = i;
                    }
                    None => {
                        i += 1;
                        end = i;
                    }
                }
                continue;
            }
            b' ' | b'\t' => {}
            _ => end = i + 1,
        }
        i += 1;
    }
    // Land on a char boundary when the last byte belongs to a multi-byte char
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    end
}
