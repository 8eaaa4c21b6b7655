//! Unified diff rendering for mismatch reports.
//!
//! Diffs are only shown to the user; whether two values match is decided by
//! exact string comparison elsewhere.

use crossterm::style::Stylize;
use similar::TextDiff;
use std::io::IsTerminal;

/// Lines of context around each hunk.
pub const CONTEXT_LINES: usize = 3;

/// Renders line-oriented unified diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffEngine {
    context: usize,
    color: bool,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::plain()
    }
}

impl DiffEngine {
    /// Plain text diffs, no ANSI codes.
    #[must_use]
    pub const fn plain() -> Self {
        Self {
            context: CONTEXT_LINES,
            color: false,
        }
    }

    /// Color when stdout is a terminal and `NO_COLOR` is unset.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            context: CONTEXT_LINES,
            color: std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal(),
        }
    }

    #[must_use]
    pub const fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Render the diff from `expected` to `actual`.
    ///
    /// `headers` labels the two sides in `---`/`+++` lines when given.
    #[must_use]
    pub fn render(&self, expected: &str, actual: &str, headers: Option<(&str, &str)>) -> String {
        let diff = TextDiff::from_lines(expected, actual);
        let mut unified = diff.unified_diff();
        unified.context_radius(self.context);
        if let Some((from, to)) = headers {
            unified.header(from, to);
        }
        let text = unified.to_string();
        if self.color {
            colorize(&text)
        } else {
            text
        }
    }
}

fn colorize(text: &str) -> String {
    text.split_inclusive('\n')
        .map(|line| {
            let (body, eol) = match line.strip_suffix('\n') {
                Some(body) => (body, "\n"),
                None => (line, ""),
            };
            let styled = if body.starts_with("+++") || body.starts_with("---") {
                body.bold().to_string()
            } else if body.starts_with("@@") {
                body.cyan().to_string()
            } else if body.starts_with('+') {
                body.green().to_string()
            } else if body.starts_with('-') {
                body.red().to_string()
            } else {
                body.to_string()
            };
            styled + eol
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_diff_against_empty() {
        let diff = DiffEngine::plain().render("", "hello\n", None);
        assert_snapshot!(diff, @r"
        @@ -0,0 +1 @@
        +hello
        ");
    }

    #[test]
    fn test_diff_with_headers() {
        let diff = DiffEngine::plain().render("a\nb\n", "a\nc\n", Some(("file: out.txt", "actual")));
        assert_snapshot!(diff, @r"
        --- file: out.txt
        +++ actual
        @@ -1,2 +1,2 @@
         a
        -b
        +c
        ");
    }

    #[test]
    fn test_diff_limits_context() {
        let expected: String = (1..=10).map(|n| format!("{n}\n")).collect();
        let actual = expected.replace("5\n", "five\n");
        let diff = DiffEngine::plain().render(&expected, &actual, None);
        assert!(diff.contains("@@ -2,7 +2,7 @@"));
        assert!(!diff.contains(" 1\n"));
        assert!(!diff.contains(" 9\n"));
    }

    #[test]
    fn test_equal_values_render_empty() {
        assert_eq!(DiffEngine::plain().render("same\n", "same\n", None), "");
    }

    #[test]
    fn test_color_keeps_line_structure() {
        let diff = DiffEngine::plain()
            .with_color(true)
            .render("old\n", "new\n", None);
        assert_eq!(diff.lines().count(), 3);
        assert!(diff.contains("-old"));
        assert!(diff.contains("+new"));
    }
}
