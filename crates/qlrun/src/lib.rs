//! Command-line front end for qlrun.
//!
//! Each pipeline stage is a subcommand. `setup` acquires the CodeQL bundle
//! and exports the resolved command path; later subcommands, usually run as
//! separate CI steps, pick that path up from `CODEQL_ACTION_CMD`.

pub mod cli;
pub mod commands;
pub mod logging;
