//! Versioned tool cache.
//!
//! Extracted bundles are stored by (tool name, version, architecture),
//! mirroring the runner tool-cache layout so entries written by other tools
//! on the same runner are found too.
//!
//! Structure:
//! ```text
//! <root>/
//! └── CodeQL/
//!     └── 0.0.0-20200610/
//!         ├── x64/            # Extracted bundle
//!         └── x64.complete    # Marker written last
//! ```

use qlrun_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Content store keyed by (name, version).
pub trait ToolCache: Send + Sync {
    /// Directory of a complete cached entry, if any.
    fn find(&self, name: &str, version: &str) -> Option<PathBuf>;

    /// Move an extracted tree into the cache and return its new location.
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be moved or the marker written.
    fn store(&self, name: &str, version: &str, source: &Path) -> Result<PathBuf>;
}

/// [`ToolCache`] backed by a directory tree.
#[derive(Debug, Clone)]
pub struct DirToolCache {
    root: PathBuf,
    arch: String,
}

impl Default for DirToolCache {
    fn default() -> Self {
        let root = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("qlrun")
            .join("tools");
        Self::new(root)
    }
}

impl DirToolCache {
    /// Create a cache at the specified root directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            arch: current_arch().to_string(),
        }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding an entry's files.
    #[must_use]
    pub fn entry_dir(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version).join(&self.arch)
    }

    fn marker_path(&self, name: &str, version: &str) -> PathBuf {
        self.root
            .join(name)
            .join(version)
            .join(format!("{}.complete", self.arch))
    }
}

impl ToolCache for DirToolCache {
    fn find(&self, name: &str, version: &str) -> Option<PathBuf> {
        let dir = self.entry_dir(name, version);
        if dir.is_dir() && self.marker_path(name, version).is_file() {
            trace!(name, version, ?dir, "Cache hit");
            Some(dir)
        } else {
            trace!(name, version, "Cache miss");
            None
        }
    }

    fn store(&self, name: &str, version: &str, source: &Path) -> Result<PathBuf> {
        let dest = self.entry_dir(name, version);
        let marker = self.marker_path(name, version);

        // Leftovers of an interrupted store are never complete; replace them.
        if marker.exists() {
            std::fs::remove_file(&marker).map_err(|e| Error::io(e, &marker, "remove"))?;
        }
        if dest.exists() {
            std::fs::remove_dir_all(&dest).map_err(|e| Error::io(e, &dest, "remove"))?;
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(e, parent, "create directory"))?;
        }

        if std::fs::rename(source, &dest).is_err() {
            // Different filesystem; fall back to a recursive copy.
            copy_dir_all(source, &dest)?;
            let _ = std::fs::remove_dir_all(source);
        }

        std::fs::write(&marker, b"").map_err(|e| Error::io(e, &marker, "write"))?;
        debug!(name, version, ?dest, "Stored tool in cache");
        Ok(dest)
    }
}

fn copy_dir_all(source: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).map_err(|e| Error::io(e, dest, "create directory"))?;
    let entries = std::fs::read_dir(source).map_err(|e| Error::io(e, source, "read directory"))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(e, source, "read directory"))?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        let file_type = entry.file_type().map_err(|e| Error::io(e, &from, "stat"))?;
        if file_type.is_dir() {
            copy_dir_all(&from, &to)?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| Error::io(e, &from, "copy"))?;
        }
    }
    Ok(())
}

/// Architecture name used by the runner tool cache.
fn current_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "x32",
        other => other,
    }
}
