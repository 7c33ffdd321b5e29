//! Upstream endpoint configuration
//!
//! One parameterized block of tunables for the SiliconFlow (or any
//! OpenAI-compatible) completion endpoint. Model name, token limit,
//! temperature, timeout and streaming are configuration, not code branches.

use serde::{Deserialize, Serialize};

/// Configuration for the upstream completion endpoint
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the API (including the /v1 suffix)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier to use
    #[serde(default = "default_model")]
    pub model: String,

    /// Bearer credential
    ///
    /// Usually supplied via the SILICONFLOW_API_KEY environment variable
    /// rather than the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Upper bound on one upstream call, in seconds.
    ///
    /// Kept shorter than typical caller timeouts so the proxy reports a
    /// clean 408 instead of the platform cutting the connection.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Ask the model for a thinking preamble (Qwen3 extension)
    #[serde(default = "default_enable_thinking")]
    pub enable_thinking: bool,
}

fn default_base_url() -> String {
    "https://api.siliconflow.cn/v1".to_string()
}

fn default_model() -> String {
    "Qwen/Qwen3-235B-A22B".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_enable_thinking() -> bool {
    true
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        UpstreamConfig {
            base_url: default_base_url(),
            model: default_model(),
            api_key: None,
            timeout_seconds: default_timeout(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            enable_thinking: default_enable_thinking(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: UpstreamConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config.base_url, "https://api.siliconflow.cn/v1");
        assert_eq!(config.model, "Qwen/Qwen3-235B-A22B");
        assert_eq!(config.timeout_seconds, 15);
        assert_eq!(config.max_tokens, 8192);
        assert!(config.api_key.is_none());
        assert!(config.enable_thinking);
    }

    #[test]
    fn test_partial_override() {
        let yaml = "model: Qwen/Qwen2.5-72B-Instruct\ntimeout_seconds: 20\n";
        let config: UpstreamConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.model, "Qwen/Qwen2.5-72B-Instruct");
        assert_eq!(config.timeout_seconds, 20);
        assert_eq!(config.max_tokens, 8192);
    }
}
