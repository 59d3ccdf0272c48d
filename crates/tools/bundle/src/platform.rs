//! Platform detection and the layout of an unpacked CodeQL distribution.

use qlrun_core::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Platform tag used inside CodeQL distributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformTag {
    /// 64-bit Windows.
    Win64,
    /// 64-bit Linux.
    Linux64,
    /// 64-bit macOS.
    Osx64,
}

impl PlatformTag {
    /// Map an operating system name (as in `std::env::consts::OS`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for anything but Windows,
    /// Linux and macOS.
    pub fn from_os(os: &str) -> Result<Self> {
        match os.to_lowercase().as_str() {
            "windows" | "win32" => Ok(Self::Win64),
            "linux" => Ok(Self::Linux64),
            "macos" | "darwin" => Ok(Self::Osx64),
            _ => Err(Error::unsupported_platform(os)),
        }
    }

    /// The platform this process runs on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] on other operating systems.
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Suffix for native executables.
    #[must_use]
    pub fn exe_suffix(self) -> &'static str {
        match self {
            Self::Win64 => ".exe",
            Self::Linux64 | Self::Osx64 => "",
        }
    }

    /// Suffix for the shell scripts shipped in a distribution.
    #[must_use]
    pub fn script_suffix(self) -> &'static str {
        match self {
            Self::Win64 => ".cmd",
            Self::Linux64 | Self::Osx64 => ".sh",
        }
    }
}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win64 => write!(f, "win64"),
            Self::Linux64 => write!(f, "linux64"),
            Self::Osx64 => write!(f, "osx64"),
        }
    }
}

/// Paths inside an unpacked CodeQL distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSetup {
    /// Root of the distribution (the `codeql/` directory of the bundle).
    pub dist_root: PathBuf,
    /// Shared tools directory.
    pub tools_dir: PathBuf,
    /// The `codeql` executable.
    pub command_path: PathBuf,
    /// Platform the paths were computed for.
    pub platform: PlatformTag,
}

impl ToolSetup {
    /// Lay out a distribution rooted at `dist_root`.
    #[must_use]
    pub fn new(dist_root: impl Into<PathBuf>, platform: PlatformTag) -> Self {
        let dist_root = dist_root.into();
        let tools_dir = dist_root.join("tools");
        let command_path = dist_root.join(format!("codeql{}", platform.exe_suffix()));
        Self {
            dist_root,
            tools_dir,
            command_path,
            platform,
        }
    }

    /// Lay out the distribution inside an extracted bundle directory.
    #[must_use]
    pub fn from_bundle_dir(bundle_dir: &Path, platform: PlatformTag) -> Self {
        Self::new(bundle_dir.join("codeql"), platform)
    }
}
