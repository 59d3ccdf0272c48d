//! External process execution.
//!
//! Every pipeline stage boils down to running one program with a fixed argv.
//! [`ProcessRunner`] is the seam that lets argument construction and output
//! parsing be tested without spawning the real CLI.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::{Error, Result};

/// What to do with a child's standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdoutMode {
    /// Stream to our own stdout.
    #[default]
    Inherit,
    /// Collect into [`ProcessOutput::stdout`].
    Capture,
}

/// A single process invocation.
///
/// Standard error is always passed through to the caller's stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Program to run.
    pub program: PathBuf,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Environment overrides layered over the inherited environment.
    pub env: Vec<(String, String)>,
    /// Stdout handling.
    pub stdout: StdoutMode,
}

impl ProcessSpec {
    /// Create a spec for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            stdout: StdoutMode::Inherit,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child only.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Capture stdout instead of streaming it.
    #[must_use]
    pub fn capture_stdout(mut self) -> Self {
        self.stdout = StdoutMode::Capture;
        self
    }

    /// Program name for messages.
    #[must_use]
    pub fn display_program(&self) -> String {
        self.program.display().to_string()
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    /// Captured stdout (empty unless [`StdoutMode::Capture`]).
    pub stdout: String,
}

impl ProcessOutput {
    /// Whether the process exited with code 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`Error::ExternalProcessFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process did not exit with code 0.
    pub fn check(self, spec: &ProcessSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::process_failed(
                spec.display_program(),
                spec.args.clone(),
                self.code,
            ))
        }
    }
}

/// Runs a [`ProcessSpec`] to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the process and wait for it to exit.
    ///
    /// A non-zero exit is not an error at this level; callers decide.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or awaited.
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput>;
}

/// [`ProcessRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, spec: &ProcessSpec) -> Result<ProcessOutput> {
        debug!(program = %spec.program.display(), args = ?spec.args, "Running process");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());

        let (status, stdout) = match spec.stdout {
            StdoutMode::Inherit => {
                let status = cmd
                    .stdout(Stdio::inherit())
                    .status()
                    .await
                    .map_err(|e| Error::io(e, &spec.program, "spawn"))?;
                (status, String::new())
            }
            StdoutMode::Capture => {
                let output = cmd
                    .stdout(Stdio::piped())
                    .output()
                    .await
                    .map_err(|e| Error::io(e, &spec.program, "spawn"))?;
                (
                    output.status,
                    String::from_utf8_lossy(&output.stdout).into_owned(),
                )
            }
        };

        debug!(program = %spec.program.display(), code = ?status.code(), "Process exited");
        Ok(ProcessOutput {
            code: status.code(),
            stdout,
        })
    }
}
