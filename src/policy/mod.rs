//! Accept/reject decisions for mismatching values.
//!
//! Decision order:
//! 1. A sticky answer (`Y` or `N` given earlier)
//! 2. The next scripted answer, if any remain
//! 3. Batch accept
//! 4. An interactive prompt on the terminal device
//! 5. Reject

use crate::error::{AssertValueError, Result};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::{debug, info};

const PROMPT: &str = "Accept new value? [y,n,Y,N] ";

#[cfg(unix)]
const TERMINAL_DEVICE: &str = "/dev/tty";
#[cfg(windows)]
const TERMINAL_DEVICE: &str = "CONIN$";
#[cfg(not(any(unix, windows)))]
const TERMINAL_DEVICE: &str = "/dev/tty";

/// A single answer to the accept prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    /// `y`: accept this value.
    Yes,
    /// `n`: reject this value.
    No,
    /// `Y`: accept this and every later value.
    AlwaysYes,
    /// `N`: reject this and every later value.
    AlwaysNo,
    /// Anything else rejects once.
    Other(char),
}

impl Answer {
    #[must_use]
    pub const fn from_char(c: char) -> Self {
        match c {
            'y' => Self::Yes,
            'n' => Self::No,
            'Y' => Self::AlwaysYes,
            'N' => Self::AlwaysNo,
            other => Self::Other(other),
        }
    }

    /// Parse the first non-blank character of a typed line.
    #[must_use]
    pub fn from_line(line: &str) -> Self {
        line.trim()
            .chars()
            .next()
            .map_or(Self::Other('\n'), Self::from_char)
    }

    #[must_use]
    pub const fn accepts(self) -> bool {
        matches!(self, Self::Yes | Self::AlwaysYes)
    }

    #[must_use]
    pub const fn is_sticky(self) -> bool {
        matches!(self, Self::AlwaysYes | Self::AlwaysNo)
    }
}

/// Blocking source of typed answers.
pub trait AnswerSource: Send {
    /// Block until the user answers and return the typed line.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read.
    fn read_answer(&mut self) -> Result<String>;
}

/// Reads answers from the controlling terminal rather than stdin, which the
/// test harness may have redirected.
#[derive(Debug, Clone)]
pub struct TerminalAnswers {
    device: PathBuf,
}

impl Default for TerminalAnswers {
    fn default() -> Self {
        Self {
            device: PathBuf::from(TERMINAL_DEVICE),
        }
    }
}

impl TerminalAnswers {
    #[must_use]
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl AnswerSource for TerminalAnswers {
    fn read_answer(&mut self) -> Result<String> {
        let terminal_error = |source| AssertValueError::Terminal {
            device: self.device.clone(),
            source,
        };
        let mut tty = File::open(&self.device).map_err(terminal_error)?;

        // Byte at a time: nothing past the newline may be consumed.
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = tty.read(&mut byte).map_err(terminal_error)?;
            if n == 0 || byte[0] == b'\n' {
                break;
            }
            line.push(byte[0]);
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

/// Per-session accept/reject state.
pub struct AcceptancePolicy {
    interactive: bool,
    accept_all: bool,
    scripted: VecDeque<char>,
    sticky: Option<Answer>,
    source: Box<dyn AnswerSource>,
}

impl std::fmt::Debug for AcceptancePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcceptancePolicy")
            .field("interactive", &self.interactive)
            .field("accept_all", &self.accept_all)
            .field("scripted", &self.scripted)
            .field("sticky", &self.sticky)
            .finish_non_exhaustive()
    }
}

impl AcceptancePolicy {
    /// Create a policy reading interactive answers from the terminal.
    #[must_use]
    pub fn new(interactive: bool, accept_all: bool, scripted: Option<&str>) -> Self {
        Self {
            interactive,
            accept_all,
            scripted: scripted.unwrap_or_default().chars().collect(),
            sticky: None,
            source: Box::new(TerminalAnswers::default()),
        }
    }

    /// Replace the interactive answer source.
    #[must_use]
    pub fn with_source(mut self, source: impl AnswerSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// The remembered answer, if one was given in uppercase.
    #[must_use]
    pub const fn sticky(&self) -> Option<Answer> {
        self.sticky
    }

    /// Replace or clear the remembered answer.
    pub fn override_sticky(&mut self, answer: Option<Answer>) {
        self.sticky = answer.filter(|a| a.is_sticky());
    }

    /// Number of scripted answers not yet consumed.
    #[must_use]
    pub fn scripted_remaining(&self) -> usize {
        self.scripted.len()
    }

    /// Show `diff` on `out` and decide whether to accept the new value.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` or reading the terminal fails.
    pub fn decide(&mut self, diff: &str, out: &mut dyn Write) -> Result<bool> {
        writeln!(out, "{diff}")?;

        if let Some(answer) = self.sticky {
            debug!(?answer, "Reusing sticky answer");
            return Ok(answer.accepts());
        }

        let answer = if let Some(c) = self.scripted.pop_front() {
            writeln!(out, "{PROMPT}{c}")?;
            Answer::from_char(c)
        } else if self.accept_all {
            info!("Accepting new value (batch mode)");
            return Ok(true);
        } else if self.interactive {
            write!(out, "{PROMPT}")?;
            out.flush()?;
            Answer::from_line(&self.source.read_answer()?)
        } else {
            debug!("Rejecting new value (non-interactive)");
            return Ok(false);
        };

        if answer.is_sticky() {
            debug!(?answer, "Remembering answer for the rest of the session");
            self.sticky = Some(answer);
        }
        Ok(answer.accepts())
    }
}
