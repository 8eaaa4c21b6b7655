//! Call-site resolution and line drift tracking.
//!
//! `line!()` is fixed when the test binary is compiled, but every accepted
//! inline value can add or remove lines above later call sites in the same
//! file. The [`OffsetTracker`] keeps the deltas of rewrites done in this
//! session so an original line can be mapped to where it is now.

use crate::error::{AssertValueError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Where a comparison was invoked, as captured by `file!()` and `line!()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Source path as reported by the compiler.
    pub file: PathBuf,
    /// 1-based line of the macro invocation.
    pub line: usize,
    /// `CARGO_MANIFEST_DIR` of the crate containing the call.
    pub manifest_dir: Option<PathBuf>,
}

impl CallSite {
    #[must_use]
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: file.into(),
            line: line as usize,
            manifest_dir: None,
        }
    }

    #[must_use]
    pub fn with_manifest_dir(mut self, dir: Option<&str>) -> Self {
        self.manifest_dir = dir.map(PathBuf::from);
        self
    }
}

impl std::fmt::Display for CallSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// One recorded rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetEntry {
    /// Line of the rewritten call site, as compiled.
    pub original_line: usize,
    /// Net number of lines added (negative when removed).
    pub delta: isize,
}

/// Ledger of line deltas per source file.
#[derive(Debug, Default, Clone)]
pub struct OffsetTracker {
    files: HashMap<PathBuf, Vec<OffsetEntry>>,
}

impl OffsetTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the rewrite at `original_line` changed the line count by
    /// `delta`.
    ///
    /// Entries accumulate; rewriting the same call site twice records two
    /// entries.
    pub fn record(&mut self, file: &Path, original_line: usize, delta: isize) {
        trace!(file = %file.display(), original_line, delta, "Recording line offset");
        self.files
            .entry(file.to_path_buf())
            .or_default()
            .push(OffsetEntry {
                original_line,
                delta,
            });
    }

    /// Map an original line to its current position.
    ///
    /// Only rewrites strictly above `original_line` move it.
    #[must_use]
    pub fn resolve(&self, file: &Path, original_line: usize) -> usize {
        let shift: isize = self
            .files
            .get(file)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.original_line < original_line)
                    .map(|e| e.delta)
                    .sum()
            })
            .unwrap_or(0);
        original_line.saturating_add_signed(shift)
    }

    /// Entries recorded for `file`, in recording order.
    #[must_use]
    pub fn entries(&self, file: &Path) -> &[OffsetEntry] {
        self.files.get(file).map(Vec::as_slice).unwrap_or_default()
    }
}

/// A call site mapped onto the current state of its source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub original_line: usize,
    pub current_line: usize,
}

/// Finds call-site files on disk and tracks their line drift.
#[derive(Debug, Default)]
pub struct Locator {
    tracker: OffsetTracker,
}

impl Locator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn tracker(&self) -> &OffsetTracker {
        &self.tracker
    }

    /// Find the file behind `site.file`.
    ///
    /// `file!()` is relative to the directory cargo was invoked from, which
    /// for workspace members is an ancestor of the member's manifest dir.
    ///
    /// # Errors
    ///
    /// Returns `SourceNotFound` if no candidate exists.
    pub fn source_path(&self, site: &CallSite) -> Result<PathBuf> {
        let direct = site.file.is_absolute() || site.file.is_file();
        let found = if direct {
            Some(site.file.clone())
        } else {
            site.manifest_dir.as_deref().and_then(|dir| {
                dir.ancestors()
                    .map(|ancestor| ancestor.join(&site.file))
                    .find(|candidate| candidate.is_file())
            })
        };
        let path = found.ok_or_else(|| AssertValueError::SourceNotFound {
            file: site.file.clone(),
        })?;
        Ok(path.canonicalize().unwrap_or(path))
    }

    /// Resolve `site` to its file and current line.
    ///
    /// # Errors
    ///
    /// Returns `SourceNotFound` if the file cannot be located.
    pub fn locate(&self, site: &CallSite) -> Result<Location> {
        let path = self.source_path(site)?;
        let current_line = self.tracker.resolve(&path, site.line);
        debug!(
            file = %path.display(),
            original_line = site.line,
            current_line,
            "Resolved call site"
        );
        Ok(Location {
            path,
            original_line: site.line,
            current_line,
        })
    }

    /// Record the delta of a rewrite at `location`.
    pub fn record(&mut self, location: &Location, delta: isize) {
        if delta != 0 {
            self.tracker
                .record(&location.path, location.original_line, delta);
        }
    }
}
