//! Recognizer for `assert_value!` call lines.
//!
//! A single-line tokenizer that knows just enough Rust lexing (string, raw
//! string, byte string and char literals, lifetimes, comments, bracket depth)
//! to find the call's arguments without being fooled by quoted parentheses or
//! commas.

use once_cell::sync::Lazy;
use regex::Regex;

/// Name of the inline comparison macro.
pub const MACRO_NAME: &str = "assert_value";

static CLOSING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*"(#+)\s*\)"#).expect("closing line pattern is valid")
});

/// Layout of the first call on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    /// The call's closing parenthesis is on this line at byte `close`.
    Closed {
        args: usize,
        close: usize,
        trailing_comma: bool,
    },
    /// The line ends with a raw string opener (`r#"`) starting a new
    /// argument at byte `start`, after `args_before` complete arguments.
    OpenRaw {
        args_before: usize,
        start: usize,
        hashes: usize,
    },
    /// The call continues past this line in some other way.
    Unsupported,
}

struct CallState {
    depth: usize,
    commas: usize,
    has_content: bool,
    after_comma: bool,
}

impl CallState {
    fn token(&mut self) {
        self.has_content = true;
        self.after_comma = false;
    }
}

/// Find the first `name!(…)` call on `line` and describe its shape.
///
/// Returns `None` when the line contains no such call outside of literals
/// and comments.
#[must_use]
pub fn scan_call(line: &str, name: &str) -> Option<CallShape> {
    let bytes = line.as_bytes();
    let mut call: Option<CallState> = None;
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b'/' if bytes.get(pos + 1) == Some(&b'/') => break,
            b'/' if bytes.get(pos + 1) == Some(&b'*') => {
                match line[pos + 2..].find("*/") {
                    Some(end) => pos += 2 + end + 2,
                    None => break,
                }
                continue;
            }
            b'"' => {
                let Some(end) = skip_string(bytes, pos + 1) else {
                    return call.map(|_| CallShape::Unsupported);
                };
                if let Some(state) = call.as_mut() {
                    state.token();
                }
                pos = end;
                continue;
            }
            b'\'' => {
                pos = skip_char_or_lifetime(line, pos);
                if let Some(state) = call.as_mut() {
                    state.token();
                }
                continue;
            }
            _ if is_ident_start(b) => {
                if let Some(raw) = raw_string_at(bytes, pos) {
                    let Some(state) = call.as_mut() else {
                        match raw.end {
                            Some(end) => {
                                pos = end;
                                continue;
                            }
                            None => return None,
                        }
                    };
                    if let Some(end) = raw.end {
                        state.token();
                        pos = end;
                        continue;
                    }
                    let opener_ends_line = raw.body_start == bytes.len();
                    let new_argument = state.depth == 1 && (state.after_comma || !state.has_content);
                    if opener_ends_line && new_argument && !raw.byte_string {
                        return Some(CallShape::OpenRaw {
                            args_before: state.commas,
                            start: pos,
                            hashes: raw.hashes,
                        });
                    }
                    return Some(CallShape::Unsupported);
                }
                if b == b'b' && bytes.get(pos + 1) == Some(&b'\'') {
                    pos = skip_char_or_lifetime(line, pos + 1);
                    if let Some(state) = call.as_mut() {
                        state.token();
                    }
                    continue;
                }

                let start = pos;
                while pos < bytes.len() && is_ident_continue(bytes[pos]) {
                    pos += 1;
                }
                match call.as_mut() {
                    Some(state) => state.token(),
                    None if &line[start..pos] == name
                        && (start == 0 || !is_ident_continue(bytes[start - 1])) =>
                    {
                        if let Some(open) = macro_open_paren(bytes, pos) {
                            call = Some(CallState {
                                depth: 1,
                                commas: 0,
                                has_content: false,
                                after_comma: false,
                            });
                            pos = open + 1;
                        }
                    }
                    None => {}
                }
                continue;
            }
            _ => {}
        }

        if let Some(state) = call.as_mut() {
            match b {
                b'(' | b'[' | b'{' => {
                    state.token();
                    state.depth += 1;
                }
                b')' | b']' | b'}' => {
                    state.depth -= 1;
                    if state.depth == 0 {
                        let args = if state.has_content {
                            state.commas + 1 - usize::from(state.after_comma)
                        } else {
                            0
                        };
                        return Some(CallShape::Closed {
                            args,
                            close: pos,
                            trailing_comma: state.after_comma,
                        });
                    }
                    state.token();
                }
                b',' if state.depth == 1 => {
                    state.commas += 1;
                    state.has_content = true;
                    state.after_comma = true;
                }
                _ if b.is_ascii_whitespace() => {}
                _ => state.token(),
            }
        }
        pos += 1;
    }

    call.map(|_| CallShape::Unsupported)
}

/// Number of `#` in the closing delimiter line `<ws>"#…)`, if `line` has
/// that shape.
#[must_use]
pub fn closing_hashes(line: &str) -> Option<usize> {
    CLOSING_LINE.captures(line).map(|caps| caps[1].len())
}

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

const fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Position of `(` in `!(` following a macro name ending at `pos`.
fn macro_open_paren(bytes: &[u8], mut pos: usize) -> Option<usize> {
    pos = skip_whitespace(bytes, pos);
    if bytes.get(pos) != Some(&b'!') {
        return None;
    }
    pos = skip_whitespace(bytes, pos + 1);
    (bytes.get(pos) == Some(&b'(')).then_some(pos)
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    pos
}

/// Skip a `"…"` body starting after the opening quote; returns the byte
/// after the closing quote.
fn skip_string(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' => pos += 2,
            b'"' => return Some(pos + 1),
            _ => pos += 1,
        }
    }
    None
}

/// Skip a char literal or a lifetime/label starting at the quote at `pos`.
fn skip_char_or_lifetime(line: &str, pos: usize) -> usize {
    let rest = &line[pos + 1..];
    if let Some(escaped) = rest.strip_prefix('\\') {
        // '\n', '\'', '\u{1F600}'
        let mut chars = escaped.char_indices();
        chars.next();
        return chars
            .find(|&(_, c)| c == '\'')
            .map_or(line.len(), |(i, _)| pos + 2 + i + 1);
    }
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some(c), Some('\'')) => pos + 1 + c.len_utf8() + 1,
        _ => pos + 1,
    }
}

struct RawString {
    hashes: usize,
    body_start: usize,
    end: Option<usize>,
    byte_string: bool,
}

/// Recognize `r"`, `r#"`, `br"`… at `pos` (an identifier start).
fn raw_string_at(bytes: &[u8], pos: usize) -> Option<RawString> {
    if pos > 0 && is_ident_continue(bytes[pos - 1]) {
        return None;
    }
    let byte_string = bytes[pos] == b'b';
    let r = if byte_string { pos + 1 } else { pos };
    if bytes.get(r) != Some(&b'r') {
        return None;
    }
    let mut cursor = r + 1;
    while bytes.get(cursor) == Some(&b'#') {
        cursor += 1;
    }
    if bytes.get(cursor) != Some(&b'"') {
        return None;
    }
    let hashes = cursor - r - 1;
    let body_start = cursor + 1;

    let mut closer = Vec::with_capacity(hashes + 1);
    closer.push(b'"');
    closer.resize(hashes + 1, b'#');
    let end = bytes[body_start..]
        .windows(closer.len())
        .position(|w| w == closer.as_slice())
        .map(|i| body_start + i + closer.len());

    Some(RawString {
        hashes,
        body_start,
        end,
        byte_string,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(line: &str) -> Option<CallShape> {
        scan_call(line, MACRO_NAME)
    }

    #[test]
    fn test_single_argument_call() {
        let line = "    assert_value!(render(&doc));";
        assert_eq!(
            scan(line),
            Some(CallShape::Closed {
                args: 1,
                close: 30,
                trailing_comma: false
            })
        );
        assert_eq!(&line[30..], ");");
    }

    #[test]
    fn test_quoted_delimiters_are_ignored() {
        let line = r#"assert_value!(format!("a), (b, {}", ')'));"#;
        let Some(CallShape::Closed { args, close, .. }) = scan(line) else {
            panic!("expected closed call");
        };
        assert_eq!(args, 1);
        assert_eq!(&line[close..], ");");
    }

    #[test]
    fn test_trailing_comma() {
        assert_eq!(
            scan("assert_value!(x,);"),
            Some(CallShape::Closed {
                args: 1,
                close: 16,
                trailing_comma: true
            })
        );
    }

    #[test]
    fn test_argument_counts() {
        let args = |line| match scan(line) {
            Some(CallShape::Closed { args, .. }) => args,
            other => panic!("unexpected shape {other:?}"),
        };
        assert_eq!(args("assert_value!();"), 0);
        assert_eq!(args("assert_value!(a, \"b\");"), 2);
        assert_eq!(args("assert_value!(f(a, b), [1, 2], c);"), 3);
        assert_eq!(args("assert_value!(x, r#\"done\"#);"), 2);
    }

    #[test]
    fn test_open_raw_string() {
        let line = "        assert_value!(out, r#\"";
        assert_eq!(
            scan(line),
            Some(CallShape::OpenRaw {
                args_before: 1,
                start: 27,
                hashes: 1
            })
        );
        assert_eq!(
            scan("assert_value!(out, r###\""),
            Some(CallShape::OpenRaw {
                args_before: 1,
                start: 19,
                hashes: 3
            })
        );
    }

    #[test]
    fn test_open_raw_with_trailing_text_is_unsupported() {
        assert_eq!(
            scan("assert_value!(out, r#\"first line"),
            Some(CallShape::Unsupported)
        );
        assert_eq!(scan("assert_value!(out, br#\""), Some(CallShape::Unsupported));
    }

    #[test]
    fn test_multiline_call_is_unsupported() {
        assert_eq!(scan("assert_value!("), Some(CallShape::Unsupported));
        assert_eq!(scan("assert_value!(out, \"abc"), Some(CallShape::Unsupported));
    }

    #[test]
    fn test_no_call() {
        assert_eq!(scan("let x = 1;"), None);
        assert_eq!(scan("// assert_value!(x);"), None);
        assert_eq!(scan("let s = \"assert_value!(x)\";"), None);
        assert_eq!(scan("my_assert_value!(x);"), None);
        assert_eq!(scan("assert_value(x);"), None);
    }

    #[test]
    fn test_qualified_macro_path() {
        let line = "assert_value::assert_value!(x);";
        assert!(matches!(
            scan(line),
            Some(CallShape::Closed { args: 1, .. })
        ));
    }

    #[test]
    fn test_lifetimes_and_chars() {
        let line = "assert_value!(parse::<'static>(b'x', '\\''));";
        let Some(CallShape::Closed { args, close, .. }) = scan(line) else {
            panic!("expected closed call");
        };
        assert_eq!(args, 1);
        assert_eq!(&line[close..], ");");
    }

    #[test]
    fn test_closing_hashes() {
        assert_eq!(closing_hashes("    \"#);"), Some(1));
        assert_eq!(closing_hashes("\"###)"), Some(3));
        assert_eq!(closing_hashes("    \"#, extra);"), None);
        assert_eq!(closing_hashes("    x\"#);"), None);
    }
}
