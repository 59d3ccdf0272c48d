//! Memory and thread limits for `codeql database analyze`.

use sysinfo::System;

use crate::{Error, Result};

/// Memory held back for the OS when no explicit RAM limit is given.
const SYSTEM_RESERVED_MEMORY_MB: u64 = 256;

/// Raw user settings for analysis resources.
///
/// Values are kept as the strings the user typed and only validated when the
/// flags are built, so a bad value fails the analyze stage rather than setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisLimits {
    /// Memory to use in megabytes.
    pub ram_mb: Option<String>,
    /// Thread count; zero or negative values are relative to the core count.
    pub threads: Option<String>,
}

impl AnalysisLimits {
    /// Create limits from optional raw values. Empty strings count as unset.
    #[must_use]
    pub fn new(ram_mb: Option<String>, threads: Option<String>) -> Self {
        Self {
            ram_mb: ram_mb.filter(|s| !s.trim().is_empty()),
            threads: threads.filter(|s| !s.trim().is_empty()),
        }
    }

    /// The `--ram=<mb>` flag.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the value is not a positive number.
    pub fn memory_flag(&self) -> Result<String> {
        let megabytes = match &self.ram_mb {
            Some(raw) => parse_ram(raw)?,
            None => default_ram_mb(total_memory_bytes()),
        };
        Ok(format!("--ram={megabytes}"))
    }

    /// The `--threads=<n>` flag.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the value is not an integer.
    pub fn threads_flag(&self) -> Result<String> {
        let threads = match &self.threads {
            Some(raw) => clamp_threads(parse_threads(raw)?, available_cpus()),
            None => 1,
        };
        Ok(format!("--threads={threads}"))
    }
}

fn parse_ram(raw: &str) -> Result<u64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("Invalid RAM setting \"{raw}\", specified.")))?;
    if !value.is_finite() || value < 1.0 {
        return Err(Error::configuration(format!(
            "Invalid RAM setting \"{raw}\", specified."
        )));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let megabytes = value.floor() as u64;
    Ok(megabytes)
}

fn parse_threads(raw: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| {
        Error::configuration(format!("Invalid threads setting \"{raw}\", specified."))
    })
}

fn default_ram_mb(total_bytes: u64) -> u64 {
    (total_bytes / (1024 * 1024)).saturating_sub(SYSTEM_RESERVED_MEMORY_MB)
}

fn clamp_threads(requested: i64, cpus: i64) -> i64 {
    requested.clamp(-cpus, cpus)
}

fn total_memory_bytes() -> u64 {
    let mut system = System::new();
    system.refresh_memory();
    system.total_memory()
}

fn available_cpus() -> i64 {
    std::thread::available_parallelism()
        .map_or(1, |n| i64::try_from(n.get()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_ram() {
        let limits = AnalysisLimits::new(Some("4096".into()), None);
        assert_eq!(limits.memory_flag().unwrap(), "--ram=4096");
    }

    #[test]
    fn test_fractional_ram_is_floored() {
        let limits = AnalysisLimits::new(Some("1500.9".into()), None);
        assert_eq!(limits.memory_flag().unwrap(), "--ram=1500");
    }

    #[test]
    fn test_invalid_ram() {
        for raw in ["lots", "0", "-5"] {
            let limits = AnalysisLimits::new(Some(raw.into()), None);
            let err = limits.memory_flag().unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{raw}");
        }
    }

    #[test]
    fn test_default_ram_reserves_system_memory() {
        assert_eq!(default_ram_mb(8 * 1024 * 1024 * 1024), 8192 - 256);
        assert_eq!(default_ram_mb(100 * 1024 * 1024), 0);
    }

    #[test]
    fn test_default_ram_flag_shape() {
        let flag = AnalysisLimits::default().memory_flag().unwrap();
        assert!(flag.starts_with("--ram="));
        assert!(flag["--ram=".len()..].parse::<u64>().is_ok());
    }

    #[test]
    fn test_default_threads() {
        assert_eq!(
            AnalysisLimits::default().threads_flag().unwrap(),
            "--threads=1"
        );
    }

    #[test]
    fn test_threads_clamped() {
        assert_eq!(clamp_threads(64, 4), 4);
        assert_eq!(clamp_threads(-64, 4), -4);
        assert_eq!(clamp_threads(0, 4), 0);
        assert_eq!(clamp_threads(-2, 4), -2);
    }

    #[test]
    fn test_invalid_threads() {
        let limits = AnalysisLimits::new(None, Some("many".into()));
        assert!(matches!(
            limits.threads_flag().unwrap_err(),
            Error::Configuration(_)
        ));
    }

    #[test]
    fn test_empty_strings_are_unset() {
        let limits = AnalysisLimits::new(Some(String::new()), Some("  ".into()));
        assert_eq!(limits, AnalysisLimits::default());
    }
}
