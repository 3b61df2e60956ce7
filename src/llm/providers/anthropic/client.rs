//! Anthropic provider client implementation
//! This module contains the client that makes requests to Anthropic's API

use async_trait::async_trait;
use reqwest::{header::HeaderMap, header::HeaderValue, header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, error};

use crate::llm::traits::LLMProviderClient;
use crate::llm::{
    Choice, LLMError, LLMProviderType, LLMRequest, LLMResponse, LLMResult, MessageRole,
};

use super::config::AnthropicConfig;
use super::types::{AnthropicError, AnthropicMessage, AnthropicRequest, AnthropicResponse};

/// Anthropic provider client
pub struct AnthropicClient {
    client: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    /// Create a new Anthropic client with configuration
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Build HTTP headers for requests
    fn build_headers(&self) -> LLMResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key)
                .map_err(|e| LLMError::Internal(format!("Invalid API key format: {}", e)))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&self.config.api_version)
                .map_err(|e| LLMError::Internal(format!("Invalid API version format: {}", e)))?,
        );

        for (key, value) in &self.config.custom_headers {
            let header_name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| LLMError::Internal(format!("Invalid header key: {}", e)))?;
            headers.insert(
                header_name,
                HeaderValue::from_str(value)
                    .map_err(|e| LLMError::Internal(format!("Invalid header value: {}", e)))?,
            );
        }

        Ok(headers)
    }

    /// Convert our internal request format to Anthropic's format
    fn convert_request(&self, request: &LLMRequest) -> AnthropicRequest {
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();

        // Anthropic takes system text as a top-level field
        for msg in &request.messages {
            match msg.role {
                MessageRole::System => system_parts.push(msg.content.clone()),
                _ => messages.push(AnthropicMessage::from(msg)),
            }
        }

        AnthropicRequest {
            model: request.model.clone(),
            messages,
            max_tokens: request.max_tokens.unwrap_or(self.config.default_max_tokens),
            temperature: request.temperature,
            stop_sequences: request.stop.clone(),
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
        }
    }

    /// Convert Anthropic response to our internal format
    fn convert_response(&self, response: AnthropicResponse) -> LLMResponse {
        let choice = Choice {
            index: 0,
            message: response.to_chat_message(),
            finish_reason: response.stop_reason.clone(),
        };

        LLMResponse {
            id: response.id,
            model: response.model,
            choices: vec![choice],
            usage: response.usage.into(),
            provider: LLMProviderType::Anthropic,
        }
    }

    /// Handle error responses from Anthropic
    fn handle_error_response(&self, status_code: u16, error_text: &str) -> LLMError {
        let message = serde_json::from_str::<AnthropicError>(error_text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| error_text.to_string());

        match status_code {
            401 => LLMError::AuthenticationFailed(message),
            429 => LLMError::RateLimitExceeded(message),
            400 => LLMError::InvalidRequest(message),
            _ => LLMError::Internal(format!("Anthropic API error ({}): {}", status_code, message)),
        }
    }
}

#[async_trait]
impl LLMProviderClient for AnthropicClient {
    async fn chat_completion(&self, request: &LLMRequest) -> LLMResult<LLMResponse> {
        let headers = self.build_headers()?;
        let anthropic_request = self.convert_request(request);
        let request_url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        debug!("Anthropic API Request: URL={}, Model={}", request_url, request.model);

        let response = self
            .client
            .post(&request_url)
            .headers(headers)
            .json(&anthropic_request)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout(e.to_string())
                } else {
                    LLMError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            error!("Anthropic API Error: {} - {}", status, error_text);
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        let anthropic_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Serialization(e.to_string()))?;

        Ok(self.convert_response(anthropic_response))
    }

    fn provider_type(&self) -> LLMProviderType {
        LLMProviderType::Anthropic
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}
