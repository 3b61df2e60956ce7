//! Anthropic provider configuration
//! This module contains configuration structures and defaults specific to Anthropic

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";

/// Anthropic-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for API requests
    pub base_url: String,
    /// Default model to use
    pub default_model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Used when a request does not set `max_tokens`; the API requires one
    pub default_max_tokens: u32,
    /// Custom headers to include in requests
    pub custom_headers: HashMap<String, String>,
    /// API version to use
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 300,
            default_max_tokens: 8192,
            custom_headers: HashMap::new(),
            api_version: "2023-06-01".to_string(),
        }
    }
}
