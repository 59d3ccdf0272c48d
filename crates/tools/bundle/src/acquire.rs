//! Producing a runnable `codeql` binary.

use qlrun_core::{Error, JobState, Result};
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::cache::ToolCache;
use crate::extract::extract_tar_gz;
use crate::locator::BundleLocator;
use crate::platform::{PlatformTag, ToolSetup};
use crate::version::resolve_version;

/// Name the bundle is cached under.
pub const TOOL_NAME: &str = "CodeQL";

/// Options for a single acquisition.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Explicit bundle URL; when set, no candidate lookup happens.
    pub tools_url: Option<String>,
    /// Operating system to lay the distribution out for.
    pub os: String,
    /// Scratch directory for downloads.
    pub download_dir: PathBuf,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            tools_url: None,
            os: std::env::consts::OS.to_string(),
            download_dir: std::env::temp_dir(),
        }
    }
}

impl AcquireOptions {
    /// Use an explicit bundle URL. Empty strings count as unset.
    #[must_use]
    pub fn with_tools_url(mut self, url: Option<String>) -> Self {
        self.tools_url = url.filter(|u| !u.trim().is_empty());
        self
    }

    /// Override the operating system.
    #[must_use]
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = os.into();
        self
    }

    /// Override the scratch directory.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }
}

/// Resolves, fetches and caches the CodeQL bundle.
pub struct ToolAcquirer {
    cache: Box<dyn ToolCache>,
    locator: BundleLocator,
    options: AcquireOptions,
}

impl ToolAcquirer {
    /// Create an acquirer.
    #[must_use]
    pub fn new(cache: impl ToolCache + 'static, locator: BundleLocator, options: AcquireOptions) -> Self {
        Self {
            cache: Box::new(cache),
            locator,
            options,
        }
    }

    /// Acquire the CLI and record its path in `state`.
    ///
    /// The platform is checked before any other work. Every later failure
    /// is logged with its full cause and returned as
    /// [`Error::ToolAcquisitionFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] or [`Error::ToolAcquisitionFailed`].
    pub async fn acquire(&self, state: &mut JobState) -> Result<ToolSetup> {
        let platform = PlatformTag::from_os(&self.options.os)?;

        let bundle_dir = self.bundle_dir().await.map_err(|e| {
            error!(error = %e, cause = ?e, "CodeQL tool acquisition failed");
            Error::acquisition_failed(e)
        })?;

        let setup = ToolSetup::from_bundle_dir(&bundle_dir, platform);
        state.set_command_path(&setup.command_path);
        info!(
            command = %setup.command_path.display(),
            %platform,
            "CodeQL tools ready"
        );
        Ok(setup)
    }

    async fn bundle_dir(&self) -> Result<PathBuf> {
        let explicit_url = self.options.tools_url.as_deref();
        let version = match explicit_url {
            Some(url) => resolve_version(url)?,
            None => resolve_version(&self.locator.config().bundle_suffix)?,
        }
        .to_string();

        if let Some(dir) = self.cache.find(TOOL_NAME, &version) {
            info!(%version, dir = %dir.display(), "Using cached CodeQL bundle");
            return Ok(dir);
        }

        let url = match explicit_url {
            Some(url) => url.to_string(),
            None => self.locator.locate().await?,
        };

        let staging = self
            .options
            .download_dir
            .join(format!("qlrun-bundle-{version}-{}", std::process::id()));
        let result = self.fetch_into_cache(&url, &version, &staging).await;
        if staging.exists() {
            let _ = std::fs::remove_dir_all(&staging);
        }
        result
    }

    async fn fetch_into_cache(&self, url: &str, version: &str, staging: &std::path::Path) -> Result<PathBuf> {
        let archive = staging.join(crate::BUNDLE_ARCHIVE_NAME);
        self.locator.download(url, &archive).await?;

        let extracted = staging.join("extracted");
        extract_tar_gz(&archive, &extracted)?;
        debug!(%version, "Extracted CodeQL bundle");

        self.cache.store(TOOL_NAME, version, &extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::LocatorConfig;

    #[test]
    fn test_default_options_use_host_os() {
        let options = AcquireOptions::default();
        assert_eq!(options.os, std::env::consts::OS);
        assert!(options.tools_url.is_none());
    }

    #[test]
    fn test_empty_tools_url_is_unset() {
        let options = AcquireOptions::default().with_tools_url(Some("  ".into()));
        assert!(options.tools_url.is_none());
    }

    #[tokio::test]
    async fn test_malformed_tools_url_is_wrapped() {
        let temp = tempfile::TempDir::new().unwrap();
        let acquirer = ToolAcquirer::new(
            crate::DirToolCache::new(temp.path()),
            BundleLocator::new(LocatorConfig::new("t")).unwrap(),
            AcquireOptions::default()
                .with_os("linux")
                .with_tools_url(Some("https://example.com/codeql.tar.gz".into())),
        );

        let mut state = JobState::new();
        let err = acquirer.acquire(&mut state).await.unwrap_err();
        let Error::ToolAcquisitionFailed { source } = err else {
            panic!("expected acquisition failure, got {err:?}");
        };
        assert!(matches!(*source, Error::MalformedUrl { .. }));
        assert!(state.command_path().is_err());
    }
}
