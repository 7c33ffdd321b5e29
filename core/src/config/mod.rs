//! Configuration management
//!
//! YAML configuration file with serde defaults, discovered under the user
//! config directory, plus environment-variable overrides for the values
//! that change per deployment (credential, upstream URL, model).

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use home::home_dir;
use serde::{Deserialize, Serialize};

pub mod upstream;

pub use upstream::UpstreamConfig;

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "themis.yaml";

/// Default config directory name
const CONFIG_DIR_NAME: &str = "themis";

/// How the proxy relays the upstream answer to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Forward the upstream event stream as SSE frames
    #[default]
    Streaming,
    /// Wait for the full completion and return one JSON body
    Buffered,
}

/// HTTP server settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address, e.g. `127.0.0.1:8080`
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Relay mode; chosen by configuration, never by request content
    #[serde(default)]
    pub response_mode: ResponseMode,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
            response_mode: ResponseMode::default(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream completion endpoint settings
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

impl Config {
    /// Path of the configuration file
    pub fn config_path() -> PathBuf {
        config_dir()
            .or_else(|| home_dir().map(|h| h.join(".config")))
            .map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Load configuration: file if present, defaults otherwise, then
    /// environment overrides on top
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Config::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file (no env overrides)
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        serde_yml::from_str(&content)
            .with_context(|| format!("failed to parse config file {:?}", path))
    }

    /// Environment variables take precedence over the file; the credential
    /// in particular is expected to arrive this way
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("SILICONFLOW_API_KEY") {
            if !key.trim().is_empty() {
                self.upstream.api_key = Some(key);
            }
        }
        if let Ok(url) = env::var("SILICONFLOW_API_URL") {
            if !url.trim().is_empty() {
                self.upstream.base_url = url;
            }
        }
        if let Ok(model) = env::var("SILICONFLOW_MODEL") {
            if !model.trim().is_empty() {
                self.upstream.model = model;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.response_mode, ResponseMode::Streaming);
        assert_eq!(config.upstream.timeout_seconds, 15);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "server:\n  bind: 0.0.0.0:9000\n  response_mode: buffered\nupstream:\n  model: Qwen/Qwen2.5-72B-Instruct\n"
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.server.response_mode, ResponseMode::Buffered);
        assert_eq!(config.upstream.model, "Qwen/Qwen2.5-72B-Instruct");
        // Untouched sections keep their defaults.
        assert_eq!(config.upstream.max_tokens, 8192);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "server: [not, a, map").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
