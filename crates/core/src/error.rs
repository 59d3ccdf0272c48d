//! Error types for qlrun operations

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Main error type for qlrun operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The bundle URL carries no usable version token
    #[error("Malformed bundle URL '{url}': {reason}")]
    #[diagnostic(
        code(qlrun::version::malformed_url),
        help("Bundle URLs must contain a 'bundle-<version>/' segment")
    )]
    MalformedUrl {
        /// The offending URL
        url: String,
        /// Why no version could be extracted
        reason: String,
    },

    /// None of the candidate download URLs was reachable
    #[error("CodeQL bundle not found at any of {} candidate URLs", tried.len())]
    #[diagnostic(
        code(qlrun::bundle::unavailable),
        help("Pass an explicit bundle URL with --tools, or check that the token can read the release")
    )]
    BundleUnavailable {
        /// Every URL that was tried, in order
        tried: Vec<String>,
    },

    /// The host operating system has no CodeQL distribution
    #[error("Unsupported platform: {os}")]
    #[diagnostic(
        code(qlrun::platform::unsupported),
        help("CodeQL bundles are only published for Windows, Linux and macOS")
    )]
    UnsupportedPlatform {
        /// The operating system name that was rejected
        os: String,
    },

    /// Anything that went wrong while obtaining the CLI
    #[error("Failed to set up the CodeQL tools")]
    #[diagnostic(code(qlrun::acquire::failed))]
    ToolAcquisitionFailed {
        /// The underlying cause
        #[source]
        source: Box<Error>,
    },

    /// The CLI (or a script it ships) exited unsuccessfully
    #[error("{program} exited with {}", code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    #[diagnostic(code(qlrun::process::failed))]
    ExternalProcessFailed {
        /// Program that was run
        program: String,
        /// Arguments it was given
        args: Vec<String>,
        /// Exit code, if the process exited normally
        code: Option<i32>,
    },

    /// Structured CLI output did not have the expected shape
    #[error("Could not parse output of {context}: {message}")]
    #[diagnostic(code(qlrun::output::parse))]
    OutputParse {
        /// Which invocation produced the output
        context: String,
        /// Parser message
        message: String,
    },

    /// A later stage ran without an acquisition in the same job
    #[error("No CodeQL command path recorded for this job ({variable} is not set)")]
    #[diagnostic(
        code(qlrun::state::missing),
        help("Run `qlrun setup` before any other stage, or pass --codeql")
    )]
    MissingPersistedState {
        /// Environment variable the path is normally exported under
        variable: String,
    },

    /// Invalid user-supplied configuration
    #[error("Configuration error: {0}")]
    #[diagnostic(code(qlrun::config))]
    Configuration(String),

    /// HTTP transport or status failure
    #[error("HTTP request to {url} failed: {message}")]
    #[diagnostic(code(qlrun::http))]
    Http {
        /// The requested URL
        url: String,
        /// Error message
        message: String,
    },

    /// I/O error with operation context
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(qlrun::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "extract", "spawn")
        operation: String,
    },
}

impl Error {
    /// Create a malformed URL error
    #[must_use]
    pub fn malformed_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported platform error
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>) -> Self {
        Self::UnsupportedPlatform { os: os.into() }
    }

    /// Wrap a failure as an acquisition failure
    #[must_use]
    pub fn acquisition_failed(source: Self) -> Self {
        Self::ToolAcquisitionFailed {
            source: Box::new(source),
        }
    }

    /// Create an external process failure
    #[must_use]
    pub fn process_failed(
        program: impl Into<String>,
        args: Vec<String>,
        code: Option<i32>,
    ) -> Self {
        Self::ExternalProcessFailed {
            program: program.into(),
            args,
            code,
        }
    }

    /// Create an output parse error
    #[must_use]
    pub fn output_parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutputParse {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an HTTP error
    #[must_use]
    pub fn http(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Http {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an I/O error without path context
    #[must_use]
    pub fn io_no_path(source: std::io::Error, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: None,
            operation: operation.into(),
        }
    }
}

/// Result type alias for qlrun operations
pub type Result<T> = std::result::Result<T, Error>;
