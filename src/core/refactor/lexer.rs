//! Source classifier: split JS/TS text into code, string, and comment segments.
//!
//! This is not a parser. It tracks just enough state to know whether a byte
//! sits in executable code, inside a literal, or inside a comment:
//! - `'...'` and `"..."` strings (escape-aware, end at an unescaped newline)
//! - template literals, with `${ ... }` substitutions classified as code
//!   (nested braces and nested templates are tracked on a stack)
//! - `// line` and `/* block */` comments
//! - regex literals in expression position, classified as strings
//!
//! All delimiters are ASCII, so every segment boundary is a char boundary.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Code,
    String,
    Comment,
}

/// A contiguous byte range of the source with a single classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }

    /// Inner text of a complete quoted literal (`'x'`, `"x"`, or a template
    /// without substitutions). Returns `None` for regex literals, template
    /// pieces, unterminated strings, and non-string segments.
    pub fn literal_content<'a>(&self, source: &'a str) -> Option<&'a str> {
        if self.kind != SegmentKind::String {
            return None;
        }
        let text = self.text(source);
        let bytes = text.as_bytes();
        if bytes.len() < 2 {
            return None;
        }
        let open = bytes[0];
        let close = bytes[bytes.len() - 1];
        if !matches!(open, b'\'' | b'"' | b'`') || open != close {
            return None;
        }
        // A lone escaped quote (`"abc\"`) is unterminated, not closed.
        if bytes.len() > 2 && bytes[bytes.len() - 2] == b'\\' {
            let backslashes = bytes[1..bytes.len() - 1]
                .iter()
                .rev()
                .take_while(|b| **b == b'\\')
                .count();
            if backslashes % 2 == 1 {
                return None;
            }
        }
        Some(&text[1..text.len() - 1])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Block,
    Substitution,
}

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "of", "new", "delete", "void", "throw",
    "instanceof", "yield", "await",
];

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Classify `source` into segments that cover it contiguously, in order.
pub fn segment(source: &str) -> Vec<Segment> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut segments = Vec::new();
    let mut stack: Vec<Brace> = Vec::new();
    let mut code_start = 0;
    let mut last_significant: Option<usize> = None;
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        match b {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = bytes[i..]
                    .iter()
                    .position(|c| *c == b'\n')
                    .map(|p| i + p)
                    .unwrap_or(len);
                flush_code(&mut segments, code_start, i);
                segments.push(Segment { kind: SegmentKind::Comment, start: i, end });
                i = end;
                code_start = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .unwrap_or(len);
                flush_code(&mut segments, code_start, i);
                segments.push(Segment { kind: SegmentKind::Comment, start: i, end });
                i = end;
                code_start = i;
            }
            b'/' if regex_allowed(bytes, i, last_significant) => match scan_regex(bytes, i) {
                Some(end) => {
                    flush_code(&mut segments, code_start, i);
                    segments.push(Segment { kind: SegmentKind::String, start: i, end });
                    last_significant = Some(end - 1);
                    i = end;
                    code_start = i;
                }
                None => {
                    last_significant = Some(i);
                    i += 1;
                }
            },
            b'\'' | b'"' => {
                let end = scan_quoted(bytes, i, b);
                flush_code(&mut segments, code_start, i);
                segments.push(Segment { kind: SegmentKind::String, start: i, end });
                last_significant = Some(i);
                i = end;
                code_start = i;
            }
            b'`' => {
                let (end, substitution) = scan_template(bytes, i + 1);
                flush_code(&mut segments, code_start, i);
                segments.push(Segment { kind: SegmentKind::String, start: i, end });
                if substitution {
                    stack.push(Brace::Substitution);
                    last_significant = None;
                } else {
                    last_significant = Some(i);
                }
                i = end;
                code_start = i;
            }
            b'{' => {
                stack.push(Brace::Block);
                last_significant = Some(i);
                i += 1;
            }
            b'}' => match stack.pop() {
                Some(Brace::Substitution) => {
                    let (end, substitution) = scan_template(bytes, i + 1);
                    flush_code(&mut segments, code_start, i);
                    segments.push(Segment { kind: SegmentKind::String, start: i, end });
                    if substitution {
                        stack.push(Brace::Substitution);
                        last_significant = None;
                    } else {
                        last_significant = Some(i);
                    }
                    i = end;
                    code_start = i;
                }
                _ => {
                    last_significant = Some(i);
                    i += 1;
                }
            },
            _ => {
                if !b.is_ascii_whitespace() {
                    last_significant = Some(i);
                }
                i += 1;
            }
        }
    }

    flush_code(&mut segments, code_start, len);
    segments
}

fn flush_code(segments: &mut Vec<Segment>, start: usize, end: usize) {
    if end > start {
        segments.push(Segment { kind: SegmentKind::Code, start, end });
    }
}

/// End offset (exclusive) of a `'` or `"` string starting at `start`.
fn scan_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Scan template text from `from` (just after a backtick or a closing `}`).
/// Returns the end offset and whether the piece ended at a `${` substitution.
fn scan_template(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, false),
            b'$' if bytes.get(i + 1) == Some(&b'{') => return (i + 2, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Decide whether a `/` at `pos` opens a regex literal.
fn regex_allowed(bytes: &[u8], pos: usize, last_significant: Option<usize>) -> bool {
    // `</div>` closing tags in JSX.
    if pos > 0 && bytes[pos - 1] == b'<' {
        return false;
    }
    let Some(prev) = last_significant else {
        return true;
    };
    let prev_byte = bytes[prev];
    if is_ident_byte(prev_byte) {
        let start = bytes[..=prev]
            .iter()
            .rposition(|b| !is_ident_byte(*b))
            .map(|p| p + 1)
            .unwrap_or(0);
        let word = std::str::from_utf8(&bytes[start..=prev]).unwrap_or("");
        return REGEX_PRECEDING_KEYWORDS.contains(&word);
    }
    matches!(
        prev_byte,
        b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b';' | b'+'
            | b'-' | b'*' | b'%' | b'<' | b'>' | b'~' | b'^'
    )
}

/// End offset of a regex literal (including flags), or `None` when the line
/// ends before the closing slash.
fn scan_regex(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => {
                let mut end = i + 1;
                while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
                    end += 1;
                }
                return Some(end);
            }
            _ => i += 1,
        }
    }
    None
}
