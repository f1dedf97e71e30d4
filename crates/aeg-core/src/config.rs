use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AegError, AegResult};

/// Top-level configuration (loaded from aeg.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AegConfig {
    pub crypto: CryptoConfig,
    pub output: OutputConfig,
    pub logging: LogConfig,
}

/// Sealing defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-SHA256 iterations (default: 1000000, accepted range 50000-5000000)
    pub iterations: u32,
    /// Record an empty filename in sealed containers (default: false)
    pub hide_name: bool,
    /// Run autotune before every seal instead of using `iterations`
    pub autotune_on_seal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Extension appended to sealed files (default: "aeg")
    pub extension: String,
    /// Output name used when a container's filename is hidden
    pub fallback_name: String,
    /// Warn when an input exceeds this many MiB (whole files are held in memory)
    pub large_file_warn_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            iterations: 1_000_000,
            hide_name: false,
            autotune_on_seal: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "aeg".into(),
            fallback_name: "recovered.bin".into(),
            large_file_warn_mb: 512,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl OutputConfig {
    pub fn large_file_warn_bytes(&self) -> u64 {
        self.large_file_warn_mb.saturating_mul(1024 * 1024)
    }
}

impl AegConfig {
    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> AegResult<Self> {
        if !path.exists() {
            tracing::debug!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            AegError::Config(msg) => AegError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn parse(content: &str) -> AegResult<Self> {
        toml::from_str(content).map_err(|e| AegError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> AegResult<String> {
        toml::to_string_pretty(self).map_err(|e| AegError::Config(e.to_string()))
    }
}
