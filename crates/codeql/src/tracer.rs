//! Environment capture for build tracing.
//!
//! `codeql database trace-command` runs a child under the tracer. Running a
//! tiny environment dumper as that child reveals the variables a traced
//! build needs, which are then applied to the user's own build steps.

use qlrun_core::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Environment captured under the tracer.
pub type TracerEnv = BTreeMap<String, String>;

/// Write the current process environment to `path` as a flat JSON object.
///
/// This is what the environment dumper runs under the tracer.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn dump_env(path: &Path) -> Result<()> {
    let env: TracerEnv = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    let json = serde_json::to_string(&env)
        .map_err(|e| Error::output_parse("environment dump", e.to_string()))?;
    std::fs::write(path, json).map_err(|e| Error::io(e, path, "write"))
}

/// A fresh `env.<uuid>.json` path under `dir`.
pub(crate) fn env_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("env.{}.json", Uuid::new_v4()))
}

/// Read and remove the file the dumper wrote.
pub(crate) async fn read_env_file(path: &Path) -> Result<TracerEnv> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        Error::output_parse(
            "database trace-command",
            format!("environment file {} was not produced: {e}", path.display()),
        )
    })?;
    if let Err(e) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), error = %e, "Could not remove environment file");
    }
    serde_json::from_str(&content)
        .map_err(|e| Error::output_parse("database trace-command", e.to_string()))
}
