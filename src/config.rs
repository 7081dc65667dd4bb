//! Bridge configuration
//!
//! Parses `bridge.toml` from the user's config directory, or the file named by
//! `TAQYON_BRIDGE_CONFIG`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "TAQYON_BRIDGE_CONFIG";

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    /// Default timeout for renderer calls; no timeout when unset
    #[serde(default)]
    pub call_timeout_ms: Option<u64>,

    /// How long the renderer waits for the init-response
    #[serde(default = "default_init_timeout_ms")]
    pub init_timeout_ms: u64,

    /// Default tracing directive, combined with `RUST_LOG`
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Buffer size of the in-memory duplex transport
    #[serde(default = "default_duplex_buffer")]
    pub duplex_buffer: usize,
}

fn default_init_timeout_ms() -> u64 {
    10_000
}

fn default_log_filter() -> String {
    "taqyon_bridge=info".to_string()
}

fn default_duplex_buffer() -> usize {
    64 * 1024
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: None,
            init_timeout_ms: default_init_timeout_ms(),
            log_filter: default_log_filter(),
            duplex_buffer: default_duplex_buffer(),
        }
    }
}

impl BridgeConfig {
    /// Default call timeout
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Init handshake timeout
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    /// Location of the config file
    pub fn default_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .map(|d| d.join("taqyon").join("bridge.toml"))
            .unwrap_or_else(|| PathBuf::from("bridge.toml"))
    }

    /// Load the configuration, falling back to defaults when no file exists
    pub fn load() -> Result<Self> {
        let path = Self::default_path();

        if !path.exists() {
            tracing::warn!("Bridge config not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        Self::from_path(&path)
    }

    /// Read configuration from a specific path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {:?}: {}", path, e)))?;

        let config: BridgeConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))?;

        tracing::debug!("Loaded bridge config from {:?}", path);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
call_timeout_ms = 2500
log_filter = "taqyon_bridge=debug"
"#;

        let config: BridgeConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.call_timeout(), Some(Duration::from_millis(2500)));
        assert_eq!(config.log_filter, "taqyon_bridge=debug");
        assert_eq!(config.init_timeout_ms, 10_000);
        assert_eq!(config.duplex_buffer, 64 * 1024);
    }

    #[test]
    fn test_empty_config_matches_default() {
        let config: BridgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.call_timeout(), None);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "init_timeout_ms = 50").unwrap();

        let config = BridgeConfig::from_path(file.path()).unwrap();
        assert_eq!(config.init_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn test_from_path_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "init_timeout_ms = \"soon\"").unwrap();

        let err = BridgeConfig::from_path(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
