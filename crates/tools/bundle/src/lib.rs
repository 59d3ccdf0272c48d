//! CodeQL bundle acquisition for qlrun.
//!
//! This crate provides functionality to:
//! - Derive a comparable version from a bundle URL
//! - Find a reachable bundle among several GitHub servers and repositories
//! - Cache extracted bundles by (name, version)
//! - Produce the platform-correct path to the `codeql` binary
//!
//! # Example
//!
//! ```ignore
//! use qlrun_core::JobState;
//! use qlrun_tools_bundle::{AcquireOptions, BundleLocator, DirToolCache, LocatorConfig, ToolAcquirer};
//!
//! let locator = BundleLocator::new(LocatorConfig::new("token"))?;
//! let acquirer = ToolAcquirer::new(DirToolCache::default(), locator, AcquireOptions::default());
//!
//! let mut state = JobState::new();
//! let setup = acquirer.acquire(&mut state).await?;
//! println!("{}", setup.command_path.display());
//! ```

mod acquire;
mod cache;
mod extract;
mod locator;
mod platform;
mod repository;
mod version;

pub use acquire::{AcquireOptions, TOOL_NAME, ToolAcquirer};
pub use cache::{DirToolCache, ToolCache};
pub use extract::extract_tar_gz;
pub use locator::{BundleLocator, CandidateUrl, LocatorConfig};
pub use platform::{PlatformTag, ToolSetup};
pub use repository::ActionRepository;
pub use version::{ResolvedVersion, resolve_version};

/// Public GitHub server.
pub const GITHUB_DOTCOM_URL: &str = "https://github.com";

/// Repository that publishes the canonical bundle releases.
pub const CANONICAL_ACTION_REPOSITORY: &str = "github/codeql-action";

/// Release tag of the bundle used when no explicit URL is given.
pub const DEFAULT_BUNDLE_TAG: &str = "codeql-bundle-20200610";

/// Archive name inside each bundle release.
pub const BUNDLE_ARCHIVE_NAME: &str = "codeql-bundle.tar.gz";

/// Path suffix (below `releases/download/`) of the default bundle.
#[must_use]
pub fn default_bundle_suffix() -> String {
    format!("{DEFAULT_BUNDLE_TAG}/{BUNDLE_ARCHIVE_NAME}")
}
