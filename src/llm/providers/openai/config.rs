//! OpenAI provider configuration
//! This module contains configuration structures and defaults specific to OpenAI

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "o3-mini-2025-01-31";

/// OpenAI-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for API requests
    pub base_url: String,
    /// Organization ID (optional)
    pub organization: Option<String>,
    /// Default model to use
    pub default_model: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Custom headers to include in requests
    pub custom_headers: HashMap<String, String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            organization: None,
            default_model: DEFAULT_MODEL.to_string(),
            // Reasoning models routinely take minutes on the extraction prompts
            timeout_seconds: 300,
            custom_headers: HashMap::new(),
        }
    }
}

/// Check if a model is a reasoning (o-series) model
///
/// These take `max_completion_tokens` instead of `max_tokens` and reject a
/// custom temperature.
pub fn is_reasoning_model(model: &str) -> bool {
    ["o1", "o3", "o4"]
        .iter()
        .any(|prefix| model == *prefix || model.starts_with(&format!("{}-", prefix)))
}
