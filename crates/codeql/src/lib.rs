//! Typed façade over the CodeQL CLI.
//!
//! [`CodeQl`] exposes one method per pipeline stage. Each method builds a
//! fixed argument vector, runs exactly one process through a
//! [`qlrun_core::ProcessRunner`] (two for language extraction), and parses
//! structured output where the stage produces any.
//!
//! Stages share a database directory whose lifecycle spans the pipeline:
//! created by [`CodeQl::database_init`], populated by autobuild or
//! [`CodeQl::extract_scanned_language`], sealed by
//! [`CodeQl::finalize_database`] and read by [`CodeQl::database_analyze`].

mod autobuild;
mod invoker;
mod python;
mod queries;
mod tracer;

pub use autobuild::{JAVA_TOOL_OPTIONS_VAR, augment_java_tool_options};
pub use invoker::CodeQl;
pub use python::{PYTHON_IMPORT_PATH_VAR, PYTHON_VERSION_VAR, PythonSetup, python_setup};
pub use queries::{QueryMetadata, ResolveQueriesOutput};
pub use tracer::{TracerEnv, dump_env};
