//! Working out which repository this action was checked out from.
//!
//! Runners do not tell an action its own repository. They do unpack actions
//! under `<runner temp>/../_actions/<owner>/<repo>/<ref>/`, so the location of
//! the running executable reveals it. An executable outside that layout falls
//! back to the canonical repository.

use qlrun_core::{Error, Result};
use std::path::{Component, Path};
use tracing::debug;

use crate::CANONICAL_ACTION_REPOSITORY;

/// Repository coordinates (`owner/repo`) of the running action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRepository(String);

impl ActionRepository {
    /// Wrap an explicit `owner/repo`.
    #[must_use]
    pub fn new(slug: impl Into<String>) -> Self {
        Self(slug.into())
    }

    /// The canonical upstream repository.
    #[must_use]
    pub fn canonical() -> Self {
        Self::new(CANONICAL_ACTION_REPOSITORY)
    }

    /// Detect the repository.
    ///
    /// An explicit, non-empty `configured` value wins. Otherwise the
    /// executable path is matched against the runner's actions directory.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when neither a repository nor the
    /// runner temp directory is given.
    pub fn detect(
        configured: Option<&str>,
        runner_temp: Option<&Path>,
        exe_path: &Path,
    ) -> Result<Self> {
        if let Some(slug) = configured.map(str::trim).filter(|s| !s.is_empty()) {
            debug!(repository = slug, "Using configured action repository");
            return Ok(Self::new(slug));
        }

        let runner_temp = runner_temp
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::configuration(
                    "RUNNER_TEMP is required to detect the action repository; set it or pass --action-repository",
                )
            })?;

        match from_actions_dir(runner_temp, exe_path) {
            Some(repo) => {
                debug!(repository = %repo.0, "Detected action repository from install path");
                Ok(repo)
            }
            None => {
                debug!(
                    exe = %exe_path.display(),
                    "Not running from a runner actions directory; using canonical repository"
                );
                Ok(Self::canonical())
            }
        }
    }

    /// The `owner/repo` slug.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn from_actions_dir(runner_temp: &Path, exe_path: &Path) -> Option<ActionRepository> {
    let actions_dir = runner_temp.parent()?.join("_actions");
    let relative = exe_path.strip_prefix(&actions_dir).ok()?;

    let mut parts = relative.components().filter_map(|c| match c {
        Component::Normal(part) => part.to_str(),
        _ => None,
    });
    let owner = parts.next()?;
    let repo = parts.next()?;
    Some(ActionRepository::new(format!("{owner}/{repo}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_wins() {
        let repo = ActionRepository::detect(
            Some("acme/codeql-fork"),
            Some(Path::new("/home/runner/work/_temp")),
            Path::new("/home/runner/work/_actions/other/repo/v1/qlrun"),
        )
        .unwrap();
        assert_eq!(repo.as_str(), "acme/codeql-fork");
    }

    #[test]
    fn test_configured_without_runner_temp() {
        let repo = ActionRepository::detect(Some("acme/fork"), None, Path::new("/usr/bin/qlrun"))
            .unwrap();
        assert_eq!(repo.as_str(), "acme/fork");
    }

    #[test]
    fn test_blank_configured_is_ignored() {
        let repo = ActionRepository::detect(
            Some("  "),
            Some(Path::new("/r/_temp")),
            Path::new("/usr/bin/qlrun"),
        )
        .unwrap();
        assert_eq!(repo, ActionRepository::canonical());
    }

    #[test]
    fn test_detect_from_actions_dir() {
        let repo = ActionRepository::detect(
            None,
            Some(Path::new("/home/runner/work/_temp")),
            Path::new("/home/runner/work/_actions/acme/codeql-action/v1/bin/qlrun"),
        )
        .unwrap();
        assert_eq!(repo.as_str(), "acme/codeql-action");
    }

    #[test]
    fn test_outside_actions_dir_falls_back() {
        let repo = ActionRepository::detect(
            None,
            Some(Path::new("/home/runner/work/_temp")),
            Path::new("/home/runner/work/checkout/target/debug/qlrun"),
        )
        .unwrap();
        assert_eq!(repo.as_str(), CANONICAL_ACTION_REPOSITORY);
    }

    #[test]
    fn test_too_shallow_falls_back() {
        let repo = ActionRepository::detect(
            None,
            Some(Path::new("/r/_temp")),
            Path::new("/r/_actions/qlrun"),
        )
        .unwrap();
        assert_eq!(repo, ActionRepository::canonical());
    }

    #[test]
    fn test_missing_runner_temp_is_config_error() {
        let err = ActionRepository::detect(None, None, Path::new("/r/_actions/a/b/qlrun"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("RUNNER_TEMP"));

        let err = ActionRepository::detect(Some(""), Some(Path::new("")), Path::new("/q"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(ActionRepository::new("a/b").to_string(), "a/b");
    }
}
