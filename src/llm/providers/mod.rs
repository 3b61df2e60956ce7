//! LLM Providers Module
//!
//! This module contains implementations for the LLM providers the reference
//! backend can answer with, organized by provider with each having their own
//! subdirectory containing:
//! - client.rs: Provider-specific client implementation
//! - config.rs: Provider-specific configuration and model defaults
//! - types.rs: Provider-specific request/response types
//! - mod.rs: Module exports

pub mod anthropic;
pub mod openai;

use std::sync::Arc;

use crate::llm::{LLMError, LLMProviderType, LLMResult, traits::LLMProviderClient};

// Re-export provider clients for convenience
pub use anthropic::AnthropicClient;
pub use openai::OpenAIClient;

/// Settings needed to construct any provider client
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }
}

/// Build a shareable provider client for `provider_type`.
///
/// Custom providers are rejected; only OpenAI and Anthropic have clients.
pub fn create_provider(
    provider_type: &LLMProviderType,
    settings: ProviderSettings,
) -> LLMResult<Arc<dyn LLMProviderClient>> {
    if settings.api_key.trim().is_empty() {
        return Err(LLMError::AuthenticationFailed(format!(
            "no API key configured for {}",
            provider_type
        )));
    }

    match provider_type {
        LLMProviderType::OpenAI => {
            let mut config = openai::OpenAIConfig {
                api_key: settings.api_key,
                ..openai::OpenAIConfig::default()
            };
            if let Some(url) = settings.base_url {
                config.base_url = url;
            }
            if let Some(model) = settings.model {
                config.default_model = model;
            }
            if let Some(timeout) = settings.timeout_seconds {
                config.timeout_seconds = timeout;
            }
            Ok(Arc::new(OpenAIClient::new(config)))
        }
        LLMProviderType::Anthropic => {
            let mut config = anthropic::AnthropicConfig {
                api_key: settings.api_key,
                ..anthropic::AnthropicConfig::default()
            };
            if let Some(url) = settings.base_url {
                config.base_url = url;
            }
            if let Some(model) = settings.model {
                config.default_model = model;
            }
            if let Some(timeout) = settings.timeout_seconds {
                config.timeout_seconds = timeout;
            }
            Ok(Arc::new(AnthropicClient::new(config)))
        }
        LLMProviderType::Custom(name) => Err(LLMError::ProviderNotFound(name.clone())),
    }
}

/// Environment variable holding the API key for `provider_type`
pub fn api_key_env_var(provider_type: &LLMProviderType) -> Option<&'static str> {
    match provider_type {
        LLMProviderType::OpenAI => Some(openai::API_KEY_ENV_VAR),
        LLMProviderType::Anthropic => Some(anthropic::API_KEY_ENV_VAR),
        LLMProviderType::Custom(_) => None,
    }
}
