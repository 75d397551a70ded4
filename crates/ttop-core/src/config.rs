//! Configuration management for ttop.
//!
//! Loads configuration from ${TTOP_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod paths {
    //! Path resolution for the ttop configuration directory.
    //!
    //! TTOP_HOME resolution order:
    //! 1. TTOP_HOME environment variable (if set)
    //! 2. ~/.config/ttop (default)

    use std::path::PathBuf;

    /// Returns the ttop home directory.
    ///
    /// Checks TTOP_HOME env var first, falls back to ~/.config/ttop.
    /// `dirs` resolves the home directory even when `HOME` is unset
    /// (daemons, minimal containers).
    pub fn ttop_home() -> PathBuf {
        if let Ok(home) = std::env::var("TTOP_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("ttop"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        ttop_home().join("config.toml")
    }
}

/// Monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling interval in milliseconds.
    pub interval_ms: u64,
    /// Target process to monitor; `None` means the monitor's own process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    /// Log file for diagnostics. The dashboard owns the terminal, so logs
    /// never go to stdout/stderr.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: Self::DEFAULT_INTERVAL_MS,
            pid: None,
            log_file: None,
        }
    }
}

impl Config {
    const DEFAULT_INTERVAL_MS: u64 = 1000;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes a default config file, refusing to clobber an existing one.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("config already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&Config::default())
            .context("Failed to serialize default config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.interval_ms, 1000);
        assert!(config.pid.is_none());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval_ms = 250\npid = 42\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.pid, Some(42));
        assert_eq!(config.interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "pid = 7\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.pid, Some(7));
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::init(&path).unwrap();
        assert!(path.exists());
        assert!(Config::init(&path).is_err());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "interval_ms = \"soon\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
