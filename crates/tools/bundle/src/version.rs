//! Version extraction from bundle URLs.
//!
//! Bundle release names are dates (`codeql-bundle-20200610`), not semantic
//! versions, but the tool cache needs a totally ordered key. Non-semver
//! tokens are mapped onto a `0.0.0-<token>` prerelease.

use qlrun_core::{Error, Result};
use semver::Version;
use std::fmt;

/// Marker that precedes the version token in a bundle URL.
const VERSION_MARKER: &str = "bundle-";

/// A normalized semantic version derived from a bundle URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolvedVersion(Version);

impl fmt::Display for ResolvedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Extract and normalize the version of a bundle URL.
///
/// The token is the text after `bundle-` in the last directory segment of
/// the URL that contains it. The file name never carries the token.
///
/// # Errors
///
/// Returns [`Error::MalformedUrl`] if the pattern is absent or the token is
/// not valid semver even with a `0.0.0-` prefix.
pub fn resolve_version(url: &str) -> Result<ResolvedVersion> {
    let token = version_token(url)
        .ok_or_else(|| Error::malformed_url(url, "no 'bundle-<version>/' segment"))?;

    if let Some(version) = clean(token) {
        return Ok(ResolvedVersion(version));
    }

    clean(&format!("0.0.0-{token}"))
        .map(ResolvedVersion)
        .ok_or_else(|| {
            Error::malformed_url(url, format!("'{token}' is not a valid version"))
        })
}

fn version_token(url: &str) -> Option<&str> {
    let (directories, _file) = url.rsplit_once('/')?;
    let segment = directories
        .split('/')
        .rev()
        .find(|segment| segment.contains(VERSION_MARKER))?;
    let start = segment.find(VERSION_MARKER)? + VERSION_MARKER.len();
    let token = &segment[start..];
    (!token.is_empty()).then_some(token)
}

/// Parse leniently: surrounding whitespace and a leading `v` or `=` are ignored.
fn clean(s: &str) -> Option<Version> {
    let s = s.trim();
    let s = s.strip_prefix('=').unwrap_or(s).trim_start();
    let s = s.strip_prefix('v').unwrap_or(s);
    Version::parse(s).ok()
}
