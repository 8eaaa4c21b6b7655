//! Splicing expectation blocks into test sources.
//!
//! Two call shapes can be rewritten:
//!
//! ```text
//! assert_value!(actual);                // insert a block
//!
//! assert_value!(actual, r#"             // replace the block interior
//!     old value
//! "#);
//! ```
//!
//! Any other shape at the resolved line is an error: splicing into code we
//! do not understand could corrupt unrelated source.

pub mod recognizer;
pub mod source;

pub use recognizer::{CallShape, MACRO_NAME, closing_hashes, scan_call};
pub use source::{SourceFile, write_atomic};

use crate::codec::{ExpectationBlock, indentation};
use crate::error::{AssertValueError, Result};
use std::path::Path;
use tracing::trace;

const INSERT_SHAPE: &str = "a single-argument assert_value!(…) call";
const REPLACE_SHAPE: &str = "an assert_value!(…, r#\" line";
const CLOSING_SHAPE: &str = "a closing \"#) line";

/// New file content plus the change in line count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub lines: Vec<String>,
    pub delta: isize,
}

/// Rewrites `assert_value!` call sites.
#[derive(Debug, Clone)]
pub struct SourceEditor {
    macro_name: String,
}

impl Default for SourceEditor {
    fn default() -> Self {
        Self::new(MACRO_NAME)
    }
}

impl SourceEditor {
    #[must_use]
    pub fn new(macro_name: impl Into<String>) -> Self {
        Self {
            macro_name: macro_name.into(),
        }
    }

    /// Does `line` open an expectation block?
    ///
    /// A call compiled without a block may already have one on disk when it
    /// runs more than once per session.
    #[must_use]
    pub fn opens_block(&self, line: &str) -> bool {
        matches!(
            scan_call(line, &self.macro_name),
            Some(CallShape::OpenRaw { args_before: 1, .. })
        )
    }

    /// Add `raw` as a new second argument to the call on `line_no`.
    ///
    /// # Errors
    ///
    /// Returns `PatternMismatch` if the line is not a single-argument call
    /// closing on the same line, `LineOutOfRange` for a bad line number, and
    /// `UnencodableValue` if `raw` cannot be embedded.
    pub fn insert(&self, path: &Path, lines: &[String], line_no: usize, raw: &str) -> Result<Edit> {
        let idx = line_index(path, lines, line_no)?;
        let line = lines[idx].as_str();
        let Some(CallShape::Closed {
            args: 1,
            close,
            trailing_comma,
        }) = scan_call(line, &self.macro_name)
        else {
            return Err(AssertValueError::pattern_mismatch(
                path,
                line_no,
                line,
                INSERT_SHAPE,
            ));
        };

        let indent = indentation(line);
        let block = ExpectationBlock::encode(raw, indent, 1)?;
        let mut head = line[..close].trim_end();
        if trailing_comma {
            head = head.strip_suffix(',').unwrap_or(head).trim_end();
        }
        let interior = block.interior_lines();
        let added = interior.len() + 1;

        let mut out = Vec::with_capacity(lines.len() + added);
        out.extend_from_slice(&lines[..idx]);
        out.push(format!("{head}, {}", block.opener()));
        out.extend(interior);
        out.push(format!("{indent}{}{}", block.closer(), &line[close..]));
        out.extend_from_slice(&lines[idx + 1..]);

        trace!(line = line_no, added, "Inserted expectation block");
        Ok(Edit {
            lines: out,
            delta: line_delta(added, 0),
        })
    }

    /// Replace the interior of the block opened on `line_no` with `raw`.
    ///
    /// # Errors
    ///
    /// Returns `PatternMismatch` if the opening or closing line does not
    /// have the expected shape, `LineOutOfRange` for a bad line number, and
    /// `UnencodableValue` if `raw` cannot be embedded.
    pub fn replace(&self, path: &Path, lines: &[String], line_no: usize, raw: &str) -> Result<Edit> {
        let idx = line_index(path, lines, line_no)?;
        let line = lines[idx].as_str();
        let Some(CallShape::OpenRaw {
            args_before: 1,
            start,
            hashes,
        }) = scan_call(line, &self.macro_name)
        else {
            return Err(AssertValueError::pattern_mismatch(
                path,
                line_no,
                line,
                REPLACE_SHAPE,
            ));
        };

        // A raw string ends at the first terminator, whatever follows it.
        let terminator = format!("\"{}", "#".repeat(hashes));
        let close_idx = lines[idx + 1..]
            .iter()
            .position(|l| l.contains(&terminator))
            .map(|offset| idx + 1 + offset)
            .ok_or_else(|| {
                AssertValueError::pattern_mismatch(path, line_no, line, CLOSING_SHAPE)
            })?;
        let close_line = lines[close_idx].as_str();
        if closing_hashes(close_line) != Some(hashes) {
            return Err(AssertValueError::pattern_mismatch(
                path,
                close_idx + 1,
                close_line,
                CLOSING_SHAPE,
            ));
        }

        let indent = indentation(close_line);
        let block = ExpectationBlock::encode(raw, indent, hashes)?;
        let (opener_line, closing_line) = if block.hashes() == hashes {
            (line.to_string(), close_line.to_string())
        } else {
            let rest = &close_line[indent.len() + terminator.len()..];
            (
                format!("{}{}", &line[..start], block.opener()),
                format!("{indent}{}{rest}", block.closer()),
            )
        };
        let interior = block.interior_lines();
        let removed = close_idx - idx - 1;
        let added = interior.len();

        let mut out = Vec::with_capacity(lines.len() + added);
        out.extend_from_slice(&lines[..idx]);
        out.push(opener_line);
        out.extend(interior);
        out.push(closing_line);
        out.extend_from_slice(&lines[close_idx + 1..]);

        trace!(line = line_no, added, removed, "Replaced expectation block");
        Ok(Edit {
            lines: out,
            delta: line_delta(added, removed),
        })
    }
}

fn line_index(path: &Path, lines: &[String], line_no: usize) -> Result<usize> {
    if line_no == 0 || line_no > lines.len() {
        return Err(AssertValueError::LineOutOfRange {
            path: path.to_path_buf(),
            line: line_no,
            len: lines.len(),
        });
    }
    Ok(line_no - 1)
}

#[allow(clippy::cast_possible_wrap)]
const fn line_delta(added: usize, removed: usize) -> isize {
    added as isize - removed as isize
}
