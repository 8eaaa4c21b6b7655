//! Whole-file reads and writes of test sources.

use crate::error::{AssertValueError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A source file held in memory as lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    path: PathBuf,
    lines: Vec<String>,
    trailing_newline: bool,
    crlf: bool,
}

impl SourceFile {
    /// Read the whole file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read as UTF-8.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| AssertValueError::with_path(path, e))?;
        Ok(Self::from_text(path, &text))
    }

    /// Split `text` into lines, remembering the line ending style.
    #[must_use]
    pub fn from_text(path: &Path, text: &str) -> Self {
        let crlf = text.contains("\r\n");
        let (body, trailing_newline) = match text.strip_suffix('\n') {
            Some(body) => (body, true),
            None => (text, false),
        };
        let lines = if text.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| {
                    if crlf {
                        line.strip_suffix('\r').unwrap_or(line)
                    } else {
                        line
                    }
                })
                .map(str::to_string)
                .collect()
        };
        Self {
            path: path.to_path_buf(),
            lines,
            trailing_newline,
            crlf,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn set_lines(&mut self, lines: Vec<String>) {
        self.lines = lines;
    }

    /// Join the lines back with the original line ending.
    #[must_use]
    pub fn to_text(&self) -> String {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        let mut text = self.lines.join(eol);
        if self.trailing_newline {
            text.push_str(eol);
        }
        text
    }

    /// Replace the file on disk with the in-memory lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self) -> Result<()> {
        write_atomic(&self.path, &self.to_text())
    }
}

/// Write `contents` to a temp file next to `path`, then rename it over
/// `path`.
///
/// # Errors
///
/// Returns an error if any step of the write fails.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let io_err = |e| AssertValueError::with_path(path, e);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut temp_name = path
        .file_name()
        .map_or_else(|| OsString::from("assert_value"), ToOwned::to_owned);
    temp_name.push(".assert_value.tmp");
    let temp_path = path.with_file_name(temp_name);

    let temp_file = File::create(&temp_path).map_err(io_err)?;
    let mut writer = BufWriter::new(temp_file);
    writer.write_all(contents.as_bytes()).map_err(io_err)?;
    writer
        .into_inner()
        .map_err(|e| io_err(e.into_error()))?
        .sync_all()
        .map_err(io_err)?;

    if let Ok(metadata) = fs::metadata(path) {
        let _ = fs::set_permissions(&temp_path, metadata.permissions());
    }

    tracing::debug!(
        temp_path = %temp_path.display(),
        target_path = %path.display(),
        "Replacing file"
    );
    fs::rename(&temp_path, path).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_preserves_endings() {
        for text in ["a\nb\n", "a\nb", "a\r\nb\r\n", "", "\n", "x\n\n"] {
            let file = SourceFile::from_text(Path::new("t.rs"), text);
            assert_eq!(file.to_text(), text, "text {text:?}");
        }
    }

    #[test]
    fn test_lines_strip_crlf() {
        let file = SourceFile::from_text(Path::new("t.rs"), "one\r\ntwo\r\n");
        assert_eq!(file.lines(), ["one", "two"]);
    }

    #[test]
    fn test_write_replaces_content() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("lib.rs");
        fs::write(&path, "old\n").expect("write");

        let mut file = SourceFile::read(&path).expect("read");
        file.set_lines(vec!["new".to_string(), "lines".to_string()]);
        file.write().expect("write back");

        assert_eq!(fs::read_to_string(&path).expect("read"), "new\nlines\n");
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .expect("read dir")
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_atomic_creates_parents() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("nested").join("dir").join("out.txt");
        write_atomic(&path, "content").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "content");
    }

    #[test]
    fn test_read_missing_file() {
        let err = SourceFile::read(Path::new("/nonexistent/assert_value.rs")).unwrap_err();
        assert!(matches!(err, AssertValueError::WithPath { .. }));
        assert!(err.is_fatal());
    }
}
