//! Per-job state shared between pipeline stages.
//!
//! Acquisition records the resolved CLI path here once. Every later stage
//! reads it back, either from the same [`JobState`] value or, in a separate
//! process of the same job, from the exported environment variable.

use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable the CLI path is exported under.
pub const COMMAND_PATH_VAR: &str = "CODEQL_ACTION_CMD";

/// Variable naming the runner's env file for later steps.
const RUNNER_ENV_FILE_VAR: &str = "GITHUB_ENV";

/// Explicit job context carrying the resolved CodeQL command path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    command_path: Option<PathBuf>,
}

impl JobState {
    /// Create an empty state (no acquisition yet).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a state that already knows the command path.
    #[must_use]
    pub fn with_command_path(path: impl Into<PathBuf>) -> Self {
        Self {
            command_path: Some(path.into()),
        }
    }

    /// Recover state exported by an earlier stage of the same job.
    ///
    /// An unset or empty variable yields an empty state.
    #[must_use]
    pub fn from_env() -> Self {
        let command_path = std::env::var_os(COMMAND_PATH_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { command_path }
    }

    /// Record the resolved command path.
    pub fn set_command_path(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        debug!(path = %path.display(), "Recording CodeQL command path");
        self.command_path = Some(path);
    }

    /// The recorded command path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingPersistedState`] when no acquisition has run.
    pub fn command_path(&self) -> Result<&Path> {
        self.command_path
            .as_deref()
            .ok_or_else(|| Error::MissingPersistedState {
                variable: COMMAND_PATH_VAR.to_string(),
            })
    }

    /// Export the command path so later processes of this job can find it.
    ///
    /// Appends `CODEQL_ACTION_CMD=<path>` to the runner env file when
    /// `GITHUB_ENV` is set. Returns whether anything was written.
    ///
    /// # Errors
    ///
    /// Fails when no path is recorded, the path contains a line break, or
    /// the env file cannot be written.
    pub fn export(&self) -> Result<bool> {
        let path = self.command_path()?;
        export_variable(COMMAND_PATH_VAR, &path.display().to_string())
    }
}

/// Make `name=value` visible to later steps of this job.
///
/// Appends to the runner env file named by `GITHUB_ENV`. Without one the
/// value is only logged and `false` is returned.
///
/// # Errors
///
/// Returns a configuration error if `name` or `value` contains a line break,
/// which would let it inject further variables into the env file.
pub fn export_variable(name: &str, value: &str) -> Result<bool> {
    if [name, value].iter().any(|s| s.contains(['\n', '\r'])) {
        return Err(Error::configuration(format!(
            "Cannot export {name}: value contains a line break"
        )));
    }

    match std::env::var_os(RUNNER_ENV_FILE_VAR).filter(|v| !v.is_empty()) {
        Some(env_file) => {
            append_env_line(Path::new(&env_file), name, value)?;
            info!(variable = name, value, "Exported variable");
            Ok(true)
        }
        None => {
            info!(variable = name, value, "No runner env file; variable not exported");
            Ok(false)
        }
    }
}

fn append_env_line(env_file: &Path, name: &str, value: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(env_file)
        .map_err(|e| Error::io(e, env_file, "open"))?;
    writeln!(file, "{name}={value}").map_err(|e| Error::io(e, env_file, "write"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_command_path() {
        let state = JobState::new();
        let err = state.command_path().unwrap_err();
        assert!(matches!(err, Error::MissingPersistedState { ref variable } if variable == COMMAND_PATH_VAR));
    }

    #[test]
    fn test_set_command_path() {
        let mut state = JobState::new();
        state.set_command_path("/opt/codeql/codeql");
        assert_eq!(
            state.command_path().unwrap(),
            Path::new("/opt/codeql/codeql")
        );
    }

    #[test]
    fn test_from_env() {
        temp_env::with_var(COMMAND_PATH_VAR, Some("/tools/codeql/codeql"), || {
            let state = JobState::from_env();
            assert_eq!(
                state.command_path().unwrap(),
                Path::new("/tools/codeql/codeql")
            );
        });
    }

    #[test]
    fn test_from_env_empty_is_missing() {
        temp_env::with_var(COMMAND_PATH_VAR, Some(""), || {
            assert!(JobState::from_env().command_path().is_err());
        });
        temp_env::with_var_unset(COMMAND_PATH_VAR, || {
            assert!(JobState::from_env().command_path().is_err());
        });
    }

    #[test]
    fn test_export_appends_to_env_file() {
        let temp = TempDir::new().unwrap();
        let env_file = temp.path().join("github_env");
        std::fs::write(&env_file, "EXISTING=1\n").unwrap();

        let state = JobState::with_command_path("/t/codeql/codeql");
        temp_env::with_var(RUNNER_ENV_FILE_VAR, Some(env_file.as_os_str()), || {
            assert!(state.export().unwrap());
        });

        let content = std::fs::read_to_string(&env_file).unwrap();
        assert_eq!(content, "EXISTING=1\nCODEQL_ACTION_CMD=/t/codeql/codeql\n");
    }

    #[test]
    fn test_export_without_env_file() {
        let state = JobState::with_command_path("/t/codeql/codeql");
        temp_env::with_var_unset(RUNNER_ENV_FILE_VAR, || {
            assert!(!state.export().unwrap());
        });
    }

    #[test]
    fn test_export_requires_path() {
        assert!(JobState::new().export().is_err());
    }

    #[test]
    fn test_export_rejects_line_breaks() {
        let temp = TempDir::new().unwrap();
        let env_file = temp.path().join("github_env");

        let state = JobState::with_command_path("/t/codeql\nLD_PRELOAD=/evil.so");
        temp_env::with_var(RUNNER_ENV_FILE_VAR, Some(env_file.as_os_str()), || {
            let err = state.export().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)));
            assert!(export_variable("A\rB", "1").is_err());
        });
        assert!(!env_file.exists());
    }

    #[test]
    fn test_export_variable() {
        let temp = TempDir::new().unwrap();
        let env_file = temp.path().join("github_env");
        temp_env::with_var(RUNNER_ENV_FILE_VAR, Some(env_file.as_os_str()), || {
            assert!(export_variable("LGTM_PYTHON_SETUP_VERSION", "3").unwrap());
            assert!(export_variable("LGTM_INDEX_IMPORT_PATH", "/usr/lib/python3/dist-packages").unwrap());
        });
        assert_eq!(
            std::fs::read_to_string(&env_file).unwrap(),
            "LGTM_PYTHON_SETUP_VERSION=3\nLGTM_INDEX_IMPORT_PATH=/usr/lib/python3/dist-packages\n"
        );
    }
}
