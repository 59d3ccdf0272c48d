//! Core types and utilities for qlrun.
//!
//! This crate holds the pieces every pipeline stage shares:
//!
//! - [`Error`] - the error taxonomy for acquisition and invocation
//! - [`JobState`] - explicit per-job context carrying the resolved CLI path
//! - [`ProcessRunner`] - narrow seam around external process execution
//! - [`AnalysisLimits`] - memory and thread settings for `database analyze`

mod error;
pub mod limits;
pub mod process;
pub mod state;

pub use error::{Error, Result};
pub use limits::AnalysisLimits;
pub use process::{ProcessOutput, ProcessRunner, ProcessSpec, StdoutMode, TokioProcessRunner};
pub use state::{COMMAND_PATH_VAR, JobState, export_variable};
