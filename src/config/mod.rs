//! Configuration for a comparison session.
//!
//! Sources and precedence (highest wins):
//! 1. Process arguments (`--nointeractive`, `--accept`, `--prompts <CHARS>`)
//! 2. Environment variables (`ASSERT_VALUE_NONINTERACTIVE`,
//!    `ASSERT_VALUE_ACCEPT`, `ASSERT_VALUE_PROMPTS`)
//! 3. Defaults
//!
//! The test harness owns the rest of the command line, so only the switches
//! above are picked out of it before parsing. Single-dash spellings
//! (`-accept`, `-prompts=yn`) are accepted as well.

use crate::error::{AssertValueError, Result};
use clap::Parser;
use clap::builder::BoolishValueParser;
use std::io::IsTerminal;

const FLAG_NONINTERACTIVE: &str = "nointeractive";
const FLAG_ACCEPT: &str = "accept";
const FLAG_PROMPTS: &str = "prompts";

/// Switches recognized on the command line or in the environment.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "assert_value",
    about = "Inline snapshot assertion settings",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct ConfigArgs {
    /// Never prompt; mismatches are rejected unless --accept is set
    #[arg(
        long = FLAG_NONINTERACTIVE,
        env = "ASSERT_VALUE_NONINTERACTIVE",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub no_interactive: bool,

    /// Accept every new value without prompting
    #[arg(
        long = FLAG_ACCEPT,
        env = "ASSERT_VALUE_ACCEPT",
        action = clap::ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub accept: bool,

    /// Scripted answers, one character per decision (e.g. "yynY")
    #[arg(long = FLAG_PROMPTS, env = "ASSERT_VALUE_PROMPTS", value_name = "CHARS")]
    pub prompts: Option<String>,
}

impl ConfigArgs {
    /// Parse the recognized switches out of a full argument list.
    ///
    /// The first item is the program name and is skipped.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a recognized switch has an invalid value.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = filter_known_args(args.into_iter().skip(1).map(Into::into));
        Self::try_parse_from(std::iter::once("assert_value".to_string()).chain(known))
            .map_err(|e| AssertValueError::Config(e.to_string().trim_end().to_string()))
    }

    /// Resolve into session settings.
    ///
    /// Prompting additionally needs a terminal on stdin; without one the
    /// session behaves as if `--nointeractive` was given.
    #[must_use]
    pub fn resolve(self, has_terminal: bool) -> SessionConfig {
        SessionConfig {
            interactive: !self.no_interactive && has_terminal,
            accept_all: self.accept,
            prompts: self.prompts.filter(|p| !p.is_empty()),
        }
    }
}

/// Settings a `Session` is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Prompt on the terminal for mismatches.
    pub interactive: bool,
    /// Accept every mismatch without prompting.
    pub accept_all: bool,
    /// Scripted answers consumed before prompting.
    pub prompts: Option<String>,
}

impl SessionConfig {
    /// Build from this process's arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a recognized switch has an invalid value.
    pub fn from_process() -> Result<Self> {
        let args = ConfigArgs::from_args(std::env::args())?;
        let config = args.resolve(std::io::stdin().is_terminal());
        tracing::debug!(?config, "Loaded assert_value configuration");
        Ok(config)
    }

    /// Non-interactive, rejecting every mismatch.
    #[must_use]
    pub fn reject_all() -> Self {
        Self::default()
    }

    /// Non-interactive, accepting every mismatch.
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            accept_all: true,
            ..Self::default()
        }
    }

    /// Answer decisions from `prompts`, then reject.
    #[must_use]
    pub fn scripted(prompts: &str) -> Self {
        Self {
            prompts: Some(prompts.to_string()),
            ..Self::default()
        }
    }
}

/// Keep only our switches, normalized to `--name` / `--name=value`.
fn filter_known_args(args: impl Iterator<Item = String>) -> Vec<String> {
    let mut known = Vec::new();
    let mut args = args.peekable();
    while let Some(arg) = args.next() {
        let Some(stripped) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            continue;
        };
        let (name, value) = match stripped.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (stripped, None),
        };
        match (name, value) {
            (FLAG_NONINTERACTIVE | FLAG_ACCEPT, None) => known.push(format!("--{name}")),
            (FLAG_PROMPTS, Some(value)) => known.push(format!("--{FLAG_PROMPTS}={value}")),
            (FLAG_PROMPTS, None) => {
                if let Some(value) = args.next_if(|next| !next.starts_with('-')) {
                    known.push(format!("--{FLAG_PROMPTS}={value}"));
                }
            }
            _ => {}
        }
    }
    known
}
