//! Comparison sessions.
//!
//! A [`Session`] owns the state that must persist between comparisons in one
//! test run: line offsets of rewritten files and the acceptance policy with
//! its scripted queue and sticky answer. The macros share one process-wide
//! session, see [`global`].

use crate::codec::{self, ExpectationBlock};
use crate::config::SessionConfig;
use crate::diff::DiffEngine;
use crate::editor::{SourceEditor, SourceFile, write_atomic};
use crate::error::{AssertValueError, Result};
use crate::locator::{CallSite, Locator};
use crate::policy::{AcceptancePolicy, AnswerSource};
use once_cell::sync::Lazy;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, warn};

/// Result of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOutcome {
    /// Actual matched the expectation.
    Equal,
    /// A new expectation was recorded. The test still fails for this run;
    /// the next run compares against the recorded value.
    AcceptedUpdate,
    /// The new value was rejected.
    RejectedFailure,
}

impl ComparisonOutcome {
    /// Should the current test be failed?
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::Equal)
    }
}

/// State shared by all comparisons of one test run.
pub struct Session {
    policy: AcceptancePolicy,
    locator: Locator,
    editor: SourceEditor,
    diff: DiffEngine,
    out: Box<dyn Write + Send>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("policy", &self.policy)
            .field("locator", &self.locator)
            .field("editor", &self.editor)
            .field("diff", &self.diff)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session writing diffs and prompts to stdout.
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            policy: AcceptancePolicy::new(
                config.interactive,
                config.accept_all,
                config.prompts.as_deref(),
            ),
            locator: Locator::new(),
            editor: SourceEditor::default(),
            diff: DiffEngine::detect(),
            out: Box::new(io::stdout()),
        }
    }

    /// Read interactive answers from `source` instead of the terminal.
    #[must_use]
    pub fn with_answer_source(mut self, source: impl AnswerSource + 'static) -> Self {
        self.policy = self.policy.with_source(source);
        self
    }

    /// Write diffs and prompts to `out`.
    #[must_use]
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    #[must_use]
    pub const fn with_diff_engine(mut self, diff: DiffEngine) -> Self {
        self.diff = diff;
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &AcceptancePolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut AcceptancePolicy {
        &mut self.policy
    }

    #[must_use]
    pub const fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Compare `args[0]` against the inline expectation `args[1]`, if any.
    ///
    /// On an accepted mismatch the call site in the test source is
    /// rewritten to hold the new value.
    ///
    /// # Errors
    ///
    /// Returns `Usage` unless one or two arguments are given. Errors from
    /// reading the answer or rewriting the source are returned as is; see
    /// [`AssertValueError::is_fatal`].
    pub fn compare_inline(&mut self, site: &CallSite, args: &[&str]) -> Result<ComparisonOutcome> {
        let (actual, literal) = match *args {
            [actual] => (actual, None),
            [actual, literal] => (actual, Some(literal)),
            _ => return Err(AssertValueError::Usage { given: args.len() }),
        };

        let normalized = codec::normalize(actual);
        let expected = literal.map(codec::expected_text).unwrap_or_default();
        if normalized == expected {
            debug!(%site, "Inline value matches");
            return Ok(ComparisonOutcome::Equal);
        }

        let diff = self.diff.render(&expected, &normalized, None);
        if !self.policy.decide(&diff, &mut *self.out)? {
            warn!(%site, "New inline value rejected");
            return Ok(ComparisonOutcome::RejectedFailure);
        }

        self.rewrite_inline(site, actual, literal.is_some())?;
        Ok(ComparisonOutcome::AcceptedUpdate)
    }

    /// Compare `actual` against the content of the file at `path`.
    ///
    /// A missing file counts as empty. On an accepted mismatch the file is
    /// replaced with `actual`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written, or the
    /// answer cannot be read.
    pub fn compare_file(
        &mut self,
        site: &CallSite,
        actual: &str,
        path: &Path,
    ) -> Result<ComparisonOutcome> {
        let expected = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(AssertValueError::with_path(path, e)),
        };
        if actual == expected {
            debug!(%site, file = %path.display(), "File value matches");
            return Ok(ComparisonOutcome::Equal);
        }

        let from = format!("file: {}", path.display());
        let diff = self.diff.render(&expected, actual, Some((from.as_str(), "actual")));
        if !self.policy.decide(&diff, &mut *self.out)? {
            warn!(%site, file = %path.display(), "New file value rejected");
            return Ok(ComparisonOutcome::RejectedFailure);
        }

        write_atomic(path, actual)?;
        info!(file = %path.display(), "Recorded new file value");
        Ok(ComparisonOutcome::AcceptedUpdate)
    }

    fn rewrite_inline(&mut self, site: &CallSite, actual: &str, has_block: bool) -> Result<()> {
        // Fail before touching the file if the value cannot be embedded.
        ExpectationBlock::encode(actual, "", 1)?;

        let location = self.locator.locate(site)?;
        let mut source = SourceFile::read(&location.path)?;
        let block_on_disk = source
            .lines()
            .get(location.current_line.wrapping_sub(1))
            .is_some_and(|line| self.editor.opens_block(line));
        let edit = if has_block || block_on_disk {
            self.editor
                .replace(&location.path, source.lines(), location.current_line, actual)?
        } else {
            self.editor
                .insert(&location.path, source.lines(), location.current_line, actual)?
        };
        source.set_lines(edit.lines);
        source.write()?;
        self.locator.record(&location, edit.delta);

        info!(
            file = %location.path.display(),
            line = location.current_line,
            delta = edit.delta,
            "Recorded new inline value"
        );
        Ok(())
    }
}

static GLOBAL: Lazy<Mutex<Session>> = Lazy::new(|| {
    if std::env::var_os(crate::logging::LOG_ENV).is_some() {
        let _ = crate::logging::init_logging(0, false);
    }
    let config = SessionConfig::from_process().unwrap_or_else(|err| {
        eprintln!("{}", err.to_human());
        warn!(error = %err, "Falling back to default assert_value configuration");
        SessionConfig::default()
    });
    Mutex::new(Session::new(&config))
});

/// The session used by the `assert_value!` macros, built from the process
/// arguments and environment on first use.
pub fn global() -> &'static Mutex<Session> {
    &GLOBAL
}

#[doc(hidden)]
pub fn check_inline(site: CallSite, args: &[&str]) {
    let result = global()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .compare_inline(&site, args);
    conclude(&site, result);
}

#[doc(hidden)]
pub fn check_file(site: CallSite, actual: &str, path: &Path) {
    let result = global()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .compare_file(&site, actual, path);
    conclude(&site, result);
}

/// Turn an outcome into a test verdict.
///
/// Fatal errors end the process: other call sites in the same run could
/// otherwise be rewritten against inconsistent line numbers.
fn conclude(site: &CallSite, result: Result<ComparisonOutcome>) {
    match result {
        Ok(ComparisonOutcome::Equal) => {}
        Ok(ComparisonOutcome::AcceptedUpdate) => {
            panic!("assert_value: recorded new value at {site}; run the test again to verify")
        }
        Ok(ComparisonOutcome::RejectedFailure) => {
            panic!("assert_value: value mismatch at {site}")
        }
        Err(err) if err.is_fatal() => {
            error!(%site, error = %err, "Aborting test run");
            eprintln!("{}", err.to_human());
            std::process::exit(err.exit_code());
        }
        Err(err) => panic!("{}", err.to_human()),
    }
}
