//! Logging setup.
//!
//! Events go to stderr so they never mix with diffs and prompts on stdout.
//! `ASSERT_VALUE_LOG` takes an `EnvFilter` directive and overrides the
//! verbosity-derived level.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "ASSERT_VALUE_LOG";

type InitResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Install a stderr subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> InitResult {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("assert_value={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init()
}

/// Install a subscriber that writes through the test harness capture.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("assert_value=debug"))
        .with_test_writer()
        .try_init();
}
