//! Error types and handling for `assert_value`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Separates local failures (fail the current test) from fatal ones
//!   (abort the whole run before more source gets rewritten)
//! - Provides recovery hints for user-facing errors

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `assert_value` operations.
#[derive(Error, Debug)]
pub enum AssertValueError {
    // === Local Errors ===
    /// A comparison was called with the wrong number of arguments.
    #[error(
        "Invalid assert_value! call with {given} argument(s)\n\n\
         Supported forms:\n\n    \
         assert_value!(actual);\n\n    \
         assert_value!(actual, r#\"\n        ..expected value..\n    \"#);"
    )]
    Usage { given: usize },

    /// The value cannot be embedded as a raw string literal.
    #[error("Value cannot be recorded inline: {reason}")]
    UnencodableValue { reason: String },

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    // === Fatal Errors ===
    /// The call-site line does not have a shape the editor can rewrite.
    #[error("Cannot rewrite {path}:{line}: expected {expected}, found `{found}`")]
    PatternMismatch {
        path: PathBuf,
        line: usize,
        found: String,
        expected: &'static str,
    },

    /// The resolved call-site line is past the end of the file.
    #[error("Line {line} is out of range for {path} ({len} lines)")]
    LineOutOfRange {
        path: PathBuf,
        line: usize,
        len: usize,
    },

    /// The source file reported by `file!()` could not be found.
    #[error("Test source not found: {file}")]
    SourceNotFound { file: PathBuf },

    /// The terminal device could not be opened or read.
    #[error("Can't read answer from {device}: {source}")]
    Terminal {
        device: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File system I/O error on a known path.
    #[error("I/O error on '{path}': {source}")]
    WithPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AssertValueError {
    /// Does this error require aborting the whole test run?
    ///
    /// Source files may have been partially rewritten, so anything that
    /// happens during a rewrite stops the process instead of failing a
    /// single test.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Usage { .. } | Self::UnencodableValue { .. } | Self::Config(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Usage { .. } => Some("Pass the actual value and, optionally, one raw string"),
            Self::UnencodableValue { .. } => {
                Some("Strip carriage returns or compare against a file with assert_value_file!")
            }
            Self::PatternMismatch { .. } => {
                Some("Keep assert_value!( and the raw string opener on the same line")
            }
            Self::SourceNotFound { .. } => Some("Run tests from the package or workspace root"),
            Self::Terminal { .. } => {
                Some("Set ASSERT_VALUE_NONINTERACTIVE=1 or script answers with ASSERT_VALUE_PROMPTS")
            }
            _ => None,
        }
    }

    /// Get the exit code used when this error aborts the run.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }

    /// Attach a path to an I/O error.
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WithPath {
            path: path.into(),
            source,
        }
    }

    /// Create a pattern-mismatch error for a source line.
    #[must_use]
    pub fn pattern_mismatch(
        path: impl Into<PathBuf>,
        line: usize,
        found: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::PatternMismatch {
            path: path.into(),
            line,
            found: found.into(),
            expected,
        }
    }

    /// Render the error with its suggestion, for stderr.
    #[must_use]
    pub fn to_human(&self) -> String {
        match self.suggestion() {
            Some(hint) => format!("assert_value: {self}\n  hint: {hint}"),
            None => format!("assert_value: {self}"),
        }
    }
}

/// Result type using `AssertValueError`.
pub type Result<T> = std::result::Result<T, AssertValueError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssertValueError::pattern_mismatch(
            "tests/foo.rs",
            12,
            "let x = 1;",
            "an assert_value! call",
        );
        assert_eq!(
            err.to_string(),
            "Cannot rewrite tests/foo.rs:12: expected an assert_value! call, found `let x = 1;`"
        );
    }

    #[test]
    fn test_usage_message_lists_forms() {
        let err = AssertValueError::Usage { given: 3 };
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid assert_value! call with 3 argument(s)"));
        assert!(msg.contains("assert_value!(actual);"));
        assert!(msg.contains("r#\""));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!AssertValueError::Usage { given: 0 }.is_fatal());
        assert!(
            !AssertValueError::UnencodableValue {
                reason: "carriage return".to_string()
            }
            .is_fatal()
        );
        assert!(AssertValueError::Io(std::io::Error::other("boom")).is_fatal());
        assert!(
            AssertValueError::LineOutOfRange {
                path: PathBuf::from("a.rs"),
                line: 9,
                len: 3
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_to_human_includes_hint() {
        let err = AssertValueError::SourceNotFound {
            file: PathBuf::from("tests/missing.rs"),
        };
        assert_eq!(
            err.to_human(),
            "assert_value: Test source not found: tests/missing.rs\n  \
             hint: Run tests from the package or workspace root"
        );
        assert_eq!(err.exit_code(), 1);
    }
}
