//! Tracing setup for the CLI.

use std::io;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level options for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    /// Show all logs (trace level)
    Trace,
    /// Show debug and above
    Debug,
    /// Show info and above (default)
    Info,
    /// Show warnings and above
    Warn,
    /// Show errors only
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Filter directive for our own crates at `level`.
#[must_use]
pub fn default_directive(level: LogLevel) -> String {
    let level = Level::from(level).as_str().to_lowercase();
    format!("qlrun={level},qlrun_core={level},qlrun_codeql={level},qlrun_tools_bundle={level}")
}

/// Install a stderr subscriber. `RUST_LOG` takes precedence over `level`.
///
/// # Errors
///
/// Returns an error if the filter directive is invalid.
pub fn init_tracing(level: LogLevel) -> miette::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))
        .map_err(|e| miette::miette!("Failed to create tracing filter: {e}"))?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
    Ok(())
}
