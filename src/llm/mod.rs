//! LLM Provider Clients
//!
//! This module provides the provider-neutral chat types and the provider
//! clients the reference backend uses to answer wizard prompts. Each provider
//! lives in its own directory under [`providers`] with `client.rs`,
//! `config.rs` and `types.rs`.

pub mod providers;
pub mod traits;

pub use traits::LLMProviderClient;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// LLM Provider types supported by PAT Agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LLMProviderType {
    OpenAI,
    Anthropic,
    Custom(String),
}

impl std::fmt::Display for LLMProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProviderType::OpenAI => write!(f, "openai"),
            LLMProviderType::Anthropic => write!(f, "anthropic"),
            LLMProviderType::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl std::str::FromStr for LLMProviderType {
    type Err = LLMError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LLMProviderType::OpenAI),
            "anthropic" | "claude" => Ok(LLMProviderType::Anthropic),
            "" => Err(LLMError::ProviderNotFound("empty provider name".to_string())),
            other => Ok(LLMProviderType::Custom(other.to_string())),
        }
    }
}

/// LLM Request structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRequest {
    pub id: Uuid,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub stop: Option<Vec<String>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl LLMRequest {
    /// Single user turn, which is how every wizard prompt is sent
    pub fn user_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: None,
            max_tokens: None,
            stop: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Chat message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Message roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// LLM Response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: TokenUsage,
    pub provider: LLMProviderType,
}

impl LLMResponse {
    /// Text of the first choice
    pub fn content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// Response choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Error types for LLM operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Rate limit exceeded for provider: {0}")]
    RateLimitExceeded(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Empty response from provider: {0}")]
    EmptyResponse(String),
}

/// Result type for LLM operations
pub type LLMResult<T> = Result<T, LLMError>;
