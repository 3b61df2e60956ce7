//! Common traits for LLM providers
//! This module defines the interface every provider client implements

use async_trait::async_trait;

use super::{LLMError, LLMProviderType, LLMRequest, LLMResponse, LLMResult};

/// Core trait that all LLM provider clients must implement
#[async_trait]
pub trait LLMProviderClient: Send + Sync {
    /// Send a chat completion request
    async fn chat_completion(&self, request: &LLMRequest) -> LLMResult<LLMResponse>;

    /// Get the provider type
    fn provider_type(&self) -> LLMProviderType;

    /// Model used when the caller does not name one
    fn default_model(&self) -> &str;

    /// Send one prompt and return the text of the first choice
    async fn complete(&self, prompt: &str, max_tokens: Option<u32>) -> LLMResult<String> {
        let mut request = LLMRequest::user_prompt(self.default_model(), prompt);
        request.max_tokens = max_tokens;
        let response = self.chat_completion(&request).await?;
        response
            .content()
            .map(str::to_string)
            .ok_or_else(|| LLMError::EmptyResponse(response.id.clone()))
    }
}
