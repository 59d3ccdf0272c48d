//! Interpreter details the Python extractor needs.
//!
//! The extractor does not run the project's interpreter itself. It reads the
//! major version and the site-packages root holding `pip` from
//! `LGTM_PYTHON_SETUP_VERSION` and `LGTM_INDEX_IMPORT_PATH`.

use qlrun_core::{Error, ProcessRunner, ProcessSpec, Result};
use std::path::Path;
use tracing::{debug, info};

/// Variable holding the interpreter's major version.
pub const PYTHON_VERSION_VAR: &str = "LGTM_PYTHON_SETUP_VERSION";

/// Variable holding the directory that contains the `pip` package.
pub const PYTHON_IMPORT_PATH_VAR: &str = "LGTM_INDEX_IMPORT_PATH";

const IMPORT_PATH_SCRIPT: &str =
    "import os; import pip; print(os.path.dirname(os.path.dirname(pip.__file__)))";
const VERSION_SCRIPT: &str = "import sys; print(sys.version_info[0])";

/// What the Python extractor needs to know about an interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonSetup {
    /// Major version, e.g. `3`.
    pub version: String,
    /// Directory containing the `pip` package.
    pub import_path: String,
}

impl PythonSetup {
    /// The variables to export, in export order.
    #[must_use]
    pub fn variables(&self) -> [(&'static str, &str); 2] {
        [
            (PYTHON_VERSION_VAR, self.version.as_str()),
            (PYTHON_IMPORT_PATH_VAR, self.import_path.as_str()),
        ]
    }
}

/// Ask `python` for its pip import path and major version.
///
/// # Errors
///
/// Returns an error if either query fails or prints nothing.
pub async fn python_setup(runner: &dyn ProcessRunner, python: &Path) -> Result<PythonSetup> {
    let import_path = query(runner, python, IMPORT_PATH_SCRIPT).await?;
    let version = query(runner, python, VERSION_SCRIPT).await?;
    info!(python = %python.display(), %version, %import_path, "Detected Python setup");
    Ok(PythonSetup {
        version,
        import_path,
    })
}

async fn query(runner: &dyn ProcessRunner, python: &Path, script: &str) -> Result<String> {
    let spec = ProcessSpec::new(python)
        .arg("-c")
        .arg(script)
        .capture_stdout();
    debug!(python = %python.display(), script, "Querying interpreter");
    let output = runner.run(&spec).await?.check(&spec)?;
    let value = output.stdout.trim();
    if value.is_empty() {
        return Err(Error::output_parse(
            "python setup",
            format!("{} printed nothing for `{script}`", python.display()),
        ));
    }
    Ok(value.to_string())
}
