//! JSON with comments
//!
//! Comments and trailing commas are blanked out with spaces so byte offsets
//! in the cleaned text line up with the original.

/// Replace `//` and `/* */` comments and trailing commas with spaces.
/// Newlines are kept.
pub fn blank_comments(text: &str) -> String {
    let mut out: Vec<u8> = text.as_bytes().to_vec();
    let len = out.len();
    let mut i = 0;

    while i < len {
        match out[i] {
            b'"' => {
                i += 1;
                while i < len && out[i] != b'"' {
                    if out[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' if i + 1 < len && out[i + 1] == b'/' => {
                while i < len && out[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'/' if i + 1 < len && out[i + 1] == b'*' => {
                let mut j = i;
                while j < len && !(out[j] == b'*' && j + 1 < len && out[j + 1] == b'/' && j > i + 1)
                {
                    j += 1;
                }
                let end = (j + 2).min(len);
                blank_range(&mut out, i, end);
                i = end;
            }
            b',' => {
                let mut j = i + 1;
                while j < len && out[j].is_ascii_whitespace() {
                    j += 1;
                }
                // A comment after the comma has already been blanked only if
                // it came first, so look past any that follow too
                while j + 1 < len && out[j] == b'/' && (out[j + 1] == b'/' || out[j + 1] == b'*') {
                    let block = out[j + 1] == b'*';
                    let mut k = j + 2;
                    if block {
                        while k + 1 < len && !(out[k] == b'*' && out[k + 1] == b'/') {
                            k += 1;
                        }
                        k = (k + 2).min(len);
                    } else {
                        while k < len && out[k] != b'\n' {
                            k += 1;
                        }
                    }
                    j = k;
                    while j < len && out[j].is_ascii_whitespace() {
                        j += 1;
                    }
                }
                if j < len && (out[j] == b'}' || out[j] == b']') {
                    out[i] = b' ';
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    // Only ASCII bytes outside strings were replaced with ASCII spaces, but a
    // block comment may have covered multi-byte characters
    String::from_utf8(out).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

fn blank_range(out: &mut [u8], start: usize, end: usize) {
    for byte in &mut out[start..end] {
        if *byte != b'\n' {
            *byte = b' ';
        }
    }
}
