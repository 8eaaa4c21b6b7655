#![allow(dead_code)]

use assert_value::{AnswerSource, CallSite, DiffEngine, Session, SessionConfig};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Instant;
use tempfile::TempDir;
use tracing::info;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        assert_value::logging::init_test_logging();
    });
}

pub struct TestLogGuard {
    name: String,
    start: Instant,
}

impl TestLogGuard {
    fn new(name: &str) -> Self {
        init_test_logging();
        info!("{name}: starting");
        Self {
            name: name.to_string(),
            start: Instant::now(),
        }
    }
}

impl Drop for TestLogGuard {
    fn drop(&mut self) {
        info!(
            "{}: assertions passed (elapsed {:?})",
            self.name,
            self.start.elapsed()
        );
    }
}

pub fn test_log(name: &str) -> TestLogGuard {
    TestLogGuard::new(name)
}

/// Output sink whose contents can be inspected after the session wrote to it.
#[derive(Clone, Default)]
pub struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("output lock")).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("output lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Stand-in for the terminal that counts how often it was read.
#[derive(Clone, Default)]
pub struct FakeTerminal {
    answers: Arc<Mutex<Vec<String>>>,
    reads: Arc<AtomicUsize>,
}

impl FakeTerminal {
    pub fn answering(answers: &[&str]) -> Self {
        Self {
            answers: Arc::new(Mutex::new(
                answers.iter().rev().map(ToString::to_string).collect(),
            )),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl AnswerSource for FakeTerminal {
    fn read_answer(&mut self) -> assert_value::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .answers
            .lock()
            .expect("answers lock")
            .pop()
            .unwrap_or_default())
    }
}

/// A session wired to in-memory output and a fake terminal.
pub struct Harness {
    pub session: Session,
    pub output: SharedOutput,
    pub terminal: FakeTerminal,
}

impl Harness {
    pub fn new(config: &SessionConfig, terminal: FakeTerminal) -> Self {
        let output = SharedOutput::default();
        let session = Session::new(config)
            .with_output(output.clone())
            .with_diff_engine(DiffEngine::plain())
            .with_answer_source(terminal.clone());
        Self {
            session,
            output,
            terminal,
        }
    }

    pub fn with_config(config: &SessionConfig) -> Self {
        Self::new(config, FakeTerminal::default())
    }
}

/// A test source file in a temp directory.
pub struct Fixture {
    root: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    pub fn new(name: &str, content: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write fixture");
        Self { root: dir, path }
    }

    pub fn dir(&self) -> &Path {
        self.root.path()
    }

    pub fn read(&self) -> String {
        fs::read_to_string(&self.path).expect("read fixture")
    }

    pub fn site(&self, line: u32) -> CallSite {
        CallSite::new(&self.path, line)
    }

    /// The value the compiler would produce for the `n`th raw string block.
    pub fn literal(&self, n: usize) -> String {
        let text = self.read();
        let start = text
            .match_indices("r#\"")
            .nth(n)
            .map(|(i, _)| i + 3)
            .expect("block opener");
        let end = text[start..].find("\"#").expect("block closer");
        text[start..start + end].to_string()
    }
}
