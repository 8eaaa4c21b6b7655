//! Snapshot assertions that keep their expected values in the test source.
//!
//! ```ignore
//! #[test]
//! fn renders_greeting() {
//!     assert_value!(greet("world"));
//! }
//! ```
//!
//! On the first run the value mismatches the (empty) expectation. Once the
//! new value is accepted the call is rewritten in place:
//!
//! ```ignore
//! #[test]
//! fn renders_greeting() {
//!     assert_value!(greet("world"), r#"
//!         Hello, world!<NOEOL>
//!     "#);
//! }
//! ```
//!
//! Accepted updates still fail the current run; the next run compares
//! against the recorded value.
//!
//! Mismatches are accepted or rejected according to the session settings in
//! [`config`]: an interactive prompt on the terminal, a scripted answer queue,
//! batch accept, or reject.

pub mod codec;
pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
pub mod locator;
pub mod logging;
pub mod policy;
pub mod session;

pub use codec::{ExpectationBlock, SENTINEL};
pub use config::{ConfigArgs, SessionConfig};
pub use diff::DiffEngine;
pub use editor::{Edit, SourceEditor};
pub use error::{AssertValueError, Result};
pub use locator::{CallSite, Locator, OffsetTracker};
pub use policy::{AcceptancePolicy, Answer, AnswerSource, TerminalAnswers};
pub use session::{ComparisonOutcome, Session};

/// Capture the [`CallSite`] of the macro invocation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new(file!(), line!())
            .with_manifest_dir(option_env!("CARGO_MANIFEST_DIR"))
    };
}

/// Compare a value against the raw string block that follows it.
///
/// With no block, the first accepted value is inserted as one. Any other
/// number of arguments fails the test with a usage message.
#[macro_export]
macro_rules! assert_value {
    ($actual:expr $(,)?) => {
        $crate::session::check_inline(
            $crate::call_site!(),
            &[::core::convert::AsRef::<str>::as_ref(&$actual)],
        )
    };
    ($actual:expr, $expected:expr $(,)?) => {
        $crate::session::check_inline(
            $crate::call_site!(),
            &[
                ::core::convert::AsRef::<str>::as_ref(&$actual),
                ::core::convert::AsRef::<str>::as_ref(&$expected),
            ],
        )
    };
    ($($arg:expr),* $(,)?) => {
        $crate::session::check_inline(
            $crate::call_site!(),
            &[$(::core::convert::AsRef::<str>::as_ref(&$arg)),*],
        )
    };
}

/// Compare a value against the content of a file.
///
/// A missing file is treated as empty; an accepted value replaces the file.
#[macro_export]
macro_rules! assert_value_file {
    ($actual:expr, $path:expr $(,)?) => {
        $crate::session::check_file(
            $crate::call_site!(),
            ::core::convert::AsRef::<str>::as_ref(&$actual),
            ::core::convert::AsRef::<::std::path::Path>::as_ref(&$path),
        )
    };
}
