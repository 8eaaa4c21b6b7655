//! Encoding of expected values into inline raw string blocks.
//!
//! An expectation block is the second argument of an `assert_value!` call:
//!
//! ```text
//!     assert_value!(actual, r#"
//!         first line
//!         second line
//!     "#);
//! ```
//!
//! Interior lines carry the closing line's indentation plus [`INDENT_UNIT`].
//! Block literals always end with a line break, so values without a trailing
//! newline are stored with a [`SENTINEL`] in front of a synthetic one.

use crate::error::{AssertValueError, Result};

/// Marker for "the value had no trailing newline".
pub const SENTINEL: &str = "<NOEOL>";

/// Extra indentation applied to interior lines of a block.
pub const INDENT_UNIT: &str = "    ";

/// Bring a raw value into the line-terminated form stored in blocks.
///
/// A run of sentinels already at the end of the value is doubled so the
/// marker stays unambiguous: an even run before the final newline is literal
/// content, an odd run means one sentinel was added by this function.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let (body, has_newline) = match raw.strip_suffix('\n') {
        Some(body) => (body, true),
        None => (raw, false),
    };
    let run = trailing_sentinels(body);

    let mut out = String::with_capacity(raw.len() + SENTINEL.len() * (run + 1) + 1);
    out.push_str(body);
    out.push_str(&SENTINEL.repeat(run));
    if !has_newline {
        out.push_str(SENTINEL);
    }
    out.push('\n');
    out
}

/// Invert [`normalize`].
///
/// Returns `None` when `text` is not in normalized form, i.e. it does not end
/// with a newline.
#[must_use]
pub fn denormalize(text: &str) -> Option<String> {
    let body = text.strip_suffix('\n')?;
    let run = trailing_sentinels(body);
    let content = &body[..body.len() - run * SENTINEL.len()];

    let mut out = String::with_capacity(body.len() + 1);
    out.push_str(content);
    if run % 2 == 0 {
        out.push_str(&SENTINEL.repeat(run / 2));
        out.push('\n');
    } else {
        out.push_str(&SENTINEL.repeat(run / 2));
    }
    Some(out)
}

fn trailing_sentinels(mut s: &str) -> usize {
    let mut run = 0;
    while let Some(rest) = s.strip_suffix(SENTINEL) {
        s = rest;
        run += 1;
    }
    run
}

/// Leading whitespace of a source line.
#[must_use]
pub fn indentation(line: &str) -> &str {
    let end = line.len() - line.trim_start().len();
    &line[..end]
}

/// An expected value laid out as an inline raw string block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectationBlock {
    /// Indentation of the closing delimiter line.
    indent: String,
    /// Content lines, without indentation.
    lines: Vec<String>,
    /// Number of `#` in the raw string delimiters.
    hashes: usize,
}

impl ExpectationBlock {
    /// Encode `raw` for a call whose closing delimiter sits at `indent`.
    ///
    /// `min_hashes` keeps an existing delimiter when rewriting in place; the
    /// count only grows when the content would otherwise end the literal.
    ///
    /// # Errors
    ///
    /// Returns `UnencodableValue` for values containing a carriage return,
    /// which raw string literals cannot hold.
    pub fn encode(raw: &str, indent: &str, min_hashes: usize) -> Result<Self> {
        if raw.contains('\r') {
            return Err(AssertValueError::UnencodableValue {
                reason: "value contains a carriage return".to_string(),
            });
        }
        let normalized = normalize(raw);
        let lines = normalized[..normalized.len() - 1]
            .split('\n')
            .map(str::to_string)
            .collect();
        let mut block = Self {
            indent: indent.to_string(),
            lines,
            hashes: min_hashes.max(1),
        };
        while block.interior_lines().iter().any(|l| l.contains(&block.closer())) {
            block.hashes += 1;
        }
        Ok(block)
    }

    /// Parse the runtime value of a block literal.
    ///
    /// Returns `None` if the literal does not have the block layout (a
    /// leading newline and a whitespace-only last line).
    #[must_use]
    pub fn parse(literal: &str) -> Option<Self> {
        let rest = literal.strip_prefix('\n')?;
        let (interior, indent) = match rest.rfind('\n') {
            Some(pos) => (Some(&rest[..pos]), &rest[pos + 1..]),
            None => (None, rest),
        };
        if !indent.chars().all(char::is_whitespace) {
            return None;
        }
        let prefix = format!("{indent}{INDENT_UNIT}");
        let lines = interior
            .map(|interior| {
                interior
                    .split('\n')
                    .map(|line| {
                        line.strip_prefix(prefix.as_str())
                            .or_else(|| line.strip_prefix(indent))
                            .unwrap_or_else(|| line.trim_start())
                            .to_string()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some(Self {
            indent: indent.to_string(),
            lines,
            hashes: 1,
        })
    }

    /// The block content in normalized (newline-terminated) form.
    #[must_use]
    pub fn text(&self) -> String {
        self.lines.iter().fold(String::new(), |mut acc, line| {
            acc.push_str(line);
            acc.push('\n');
            acc
        })
    }

    /// Recover the raw value held by this block.
    #[must_use]
    pub fn decode(&self) -> Option<String> {
        denormalize(&self.text())
    }

    /// Source lines between the opening and closing delimiters.
    #[must_use]
    pub fn interior_lines(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{INDENT_UNIT}{line}", self.indent)
                }
            })
            .collect()
    }

    /// The value the compiler produces for this block.
    #[must_use]
    pub fn to_literal(&self) -> String {
        format!("\n{}\n{}", self.interior_lines().join("\n"), self.indent)
    }

    /// Raw string opener, e.g. `r#"`.
    #[must_use]
    pub fn opener(&self) -> String {
        format!("r{}\"", "#".repeat(self.hashes))
    }

    /// Raw string terminator, e.g. `"#`.
    #[must_use]
    pub fn closer(&self) -> String {
        format!("\"{}", "#".repeat(self.hashes))
    }

    #[must_use]
    pub fn indent(&self) -> &str {
        &self.indent
    }

    #[must_use]
    pub const fn hashes(&self) -> usize {
        self.hashes
    }
}

/// The comparable text of an expected literal.
///
/// Block literals are dedented into normalized form; anything else is
/// compared verbatim.
#[must_use]
pub fn expected_text(literal: &str) -> String {
    ExpectationBlock::parse(literal).map_or_else(|| literal.to_string(), |block| block.text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_sentinel() {
        assert_eq!(normalize("hi"), "hi<NOEOL>\n");
        assert_eq!(normalize(""), "<NOEOL>\n");
        assert_eq!(normalize("hello\n"), "hello\n");
        assert_eq!(normalize("\n"), "\n");
    }

    #[test]
    fn test_sentinel_in_content_stays_unambiguous() {
        assert_eq!(normalize("a<NOEOL>\n"), "a<NOEOL><NOEOL>\n");
        assert_eq!(normalize("a<NOEOL>"), "a<NOEOL><NOEOL><NOEOL>\n");
        assert_eq!(normalize("x<NOEOL>y"), "x<NOEOL>y<NOEOL>\n");
        for raw in ["a", "a<NOEOL>", "a<NOEOL>\n", "<NOEOL><NOEOL>", ""] {
            assert_eq!(denormalize(&normalize(raw)).as_deref(), Some(raw));
        }
    }

    #[test]
    fn test_denormalize_rejects_unterminated() {
        assert_eq!(denormalize("abc"), None);
    }

    #[test]
    fn test_encode_layout() {
        let block = ExpectationBlock::encode("hello\n\nworld", "    ", 0).unwrap();
        assert_eq!(
            block.interior_lines(),
            vec!["        hello", "", "        world<NOEOL>"]
        );
        assert_eq!(block.opener(), "r#\"");
        assert_eq!(block.closer(), "\"#");
        assert_eq!(
            block.to_literal(),
            "\n        hello\n\n        world<NOEOL>\n    "
        );
    }

    #[test]
    fn test_encode_raises_hashes_for_nested_quotes() {
        let block = ExpectationBlock::encode("say \"#hi\"\n", "", 1).unwrap();
        assert_eq!(block.hashes(), 2);
        assert_eq!(block.opener(), "r##\"");

        let kept = ExpectationBlock::encode("plain\n", "", 3).unwrap();
        assert_eq!(kept.hashes(), 3);
    }

    #[test]
    fn test_encode_rejects_carriage_return() {
        let err = ExpectationBlock::encode("a\r\nb\r\n", "", 1).unwrap_err();
        assert!(matches!(err, AssertValueError::UnencodableValue { .. }));
    }

    #[test]
    fn test_parse_round_trip() {
        for raw in ["hello\n", "", "  indented\n\ttab\n", "no newline", "\n\n"] {
            let block = ExpectationBlock::encode(raw, "        ", 1).unwrap();
            let parsed = ExpectationBlock::parse(&block.to_literal()).unwrap();
            assert_eq!(parsed.decode().as_deref(), Some(raw));
            assert_eq!(parsed.interior_lines(), block.interior_lines());
        }
    }

    #[test]
    fn test_expected_text_for_plain_literal() {
        assert_eq!(expected_text("hi\n"), "hi\n");
        assert_eq!(expected_text("\n    hi\n"), "hi\n");
    }

    #[test]
    fn test_indentation() {
        assert_eq!(indentation("    let x;"), "    ");
        assert_eq!(indentation("\t x"), "\t ");
        assert_eq!(indentation("x"), "");
    }
}
