use crate::logging::LogLevel;
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use qlrun_tools_bundle::GITHUB_DOTCOM_URL;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI, configuration or missing-state error exit code
pub const EXIT_CLI: i32 = 2;
/// Acquisition or CodeQL failure exit code
pub const EXIT_EVAL: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(qlrun::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A pipeline stage failed (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(qlrun::cli::stage))]
    Stage {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new stage error
    #[must_use]
    pub fn stage(message: impl Into<String>) -> Self {
        Self::Stage {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new stage error with optional help text
    #[must_use]
    pub fn stage_with_help(message: impl Into<String>, help: Option<String>) -> Self {
        Self::Stage {
            message: message.into(),
            help,
        }
    }
}

/// Convert `qlrun_core::Error` to the matching `CliError` variant.
///
/// Configuration and missing-state errors are the user's to fix (exit code 2).
/// Everything else is a failed stage (exit code 3).
impl From<qlrun_core::Error> for CliError {
    fn from(err: qlrun_core::Error) -> Self {
        use qlrun_core::Error;

        let help = Diagnostic::help(&err).map(|h| h.to_string());
        match err {
            Error::Configuration(message) => Self::Config { message, help },
            Error::MissingPersistedState { .. } => Self::Config {
                message: err.to_string(),
                help,
            },
            Error::ToolAcquisitionFailed { ref source } => {
                let help = Diagnostic::help(source.as_ref()).map(|h| h.to_string());
                Self::stage_with_help(format!("{err}: {source}"), help)
            }
            _ => Self::stage_with_help(err.to_string(), help),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Stage { .. } => EXIT_EVAL,
    }
}

/// Render an error to stderr with miette.
pub fn render_error(err: &CliError) {
    let report = Report::new(err.clone());
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

/// Acquire the CodeQL bundle and drive its analysis pipeline.
#[derive(Parser, Debug)]
#[command(name = "qlrun", version, about)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        default_value = "info",
        value_enum,
        help = "Set logging level"
    )]
    pub level: LogLevel,

    /// Path of the CodeQL executable. Defaults to the path `setup` exported
    /// as `CODEQL_ACTION_CMD`.
    #[arg(long, global = true)]
    pub codeql: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Download (or reuse) the CodeQL bundle and export its command path.
    Setup {
        /// Token for the GitHub servers hosting the bundle.
        #[arg(long, env = "INPUT_TOKEN", hide_env_values = true)]
        token: String,
        /// Explicit bundle URL, skipping release lookup.
        #[arg(long, env = "INPUT_TOOLS")]
        tools: Option<String>,
        /// The GitHub server this job runs against.
        #[arg(long, env = "GITHUB_SERVER_URL", default_value = GITHUB_DOTCOM_URL)]
        server_url: String,
        /// Repository of the running action (`owner/repo`).
        #[arg(long, env = "GITHUB_ACTION_REPOSITORY")]
        action_repository: Option<String>,
        /// Runner temp directory, used to infer the action repository.
        #[arg(long, env = "RUNNER_TEMP")]
        runner_temp: Option<PathBuf>,
        /// Root of the tool cache.
        #[arg(long, env = "RUNNER_TOOL_CACHE")]
        tool_cache: Option<PathBuf>,
    },
    /// Print the CodeQL CLI version.
    Version,
    /// Print, as JSON, the environment a traced build needs.
    TracerEnv {
        /// Database directory.
        #[arg(long)]
        database: PathBuf,
        /// Compiler specification file for the tracer.
        #[arg(long)]
        compiler_spec: Option<String>,
    },
    /// Create an empty database.
    Init {
        /// Database directory.
        #[arg(long)]
        database: PathBuf,
        /// Language to extract.
        #[arg(long)]
        language: String,
        /// Root of the source tree.
        #[arg(long)]
        source_root: PathBuf,
    },
    /// Run the language's autobuild script.
    Autobuild {
        /// Language to build.
        #[arg(long)]
        language: String,
    },
    /// Extract a language that needs no build step.
    Extract {
        /// Database directory.
        #[arg(long)]
        database: PathBuf,
        /// Language to extract.
        #[arg(long)]
        language: String,
    },
    /// Finalize a populated database.
    Finalize {
        /// Database directory.
        #[arg(long)]
        database: PathBuf,
    },
    /// Print, as JSON, the given queries grouped by language.
    ResolveQueries {
        /// Query files, directories or suites.
        #[arg(required = true)]
        queries: Vec<String>,
    },
    /// Run a query suite and write SARIF.
    Analyze {
        /// Database directory.
        #[arg(long)]
        database: PathBuf,
        /// Output SARIF file.
        #[arg(long)]
        sarif: PathBuf,
        /// Query suite to run.
        #[arg(long)]
        suite: String,
        /// Memory limit in MB.
        #[arg(long, env = "INPUT_RAM")]
        ram: Option<String>,
        /// Thread count; zero or negative is relative to the core count.
        #[arg(long, env = "INPUT_THREADS", allow_hyphen_values = true)]
        threads: Option<String>,
    },
    /// Export the Python version and pip import path for the Python extractor.
    PythonSetup {
        /// Python interpreter to inspect.
        #[arg(default_value = "python3")]
        python: PathBuf,
    },
    /// Write the current environment to a file as JSON.
    #[command(hide = true)]
    DumpEnv {
        /// Output file.
        file: PathBuf,
    },
}

/// Parse command-line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
