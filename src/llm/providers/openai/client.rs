//! OpenAI provider client implementation
//! This module contains the client that makes requests to OpenAI's API

use async_trait::async_trait;
use reqwest::{header::HeaderMap, header::HeaderValue, header::CONTENT_TYPE, Client};
use std::time::Duration;
use tracing::{debug, error};

use crate::llm::traits::LLMProviderClient;
use crate::llm::{Choice, LLMError, LLMProviderType, LLMRequest, LLMResponse, LLMResult};

use super::config::{is_reasoning_model, OpenAIConfig};
use super::types::{OpenAIChatMessage, OpenAIError, OpenAIRequest, OpenAIResponse};

/// OpenAI provider client
pub struct OpenAIClient {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIClient {
    /// Create a new OpenAI client with configuration
    pub fn new(config: OpenAIConfig) -> Self {
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
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
                .map_err(|e| LLMError::Internal(format!("Invalid API key format: {}", e)))?,
        );

        if let Some(org) = &self.config.organization {
            headers.insert(
                "OpenAI-Organization",
                HeaderValue::from_str(org)
                    .map_err(|e| LLMError::Internal(format!("Invalid organization format: {}", e)))?,
            );
        }

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

    /// Convert our internal request format to OpenAI's format
    fn convert_request(&self, request: &LLMRequest) -> OpenAIRequest {
        let messages: Vec<OpenAIChatMessage> = request.messages.iter().map(|msg| msg.into()).collect();

        let mut openai_request = OpenAIRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: None,
            max_completion_tokens: None,
            stop: request.stop.clone(),
            reasoning_effort: request
                .metadata
                .get("reasoning_effort")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        };

        // Reasoning models use max_completion_tokens and a fixed temperature
        if is_reasoning_model(&request.model) {
            openai_request.max_completion_tokens = request.max_tokens;
            openai_request.temperature = None;
        } else {
            openai_request.max_tokens = request.max_tokens;
        }

        openai_request
    }

    /// Convert OpenAI response to our internal format
    fn convert_response(&self, response: OpenAIResponse) -> LLMResponse {
        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: choice.message.into(),
                finish_reason: choice.finish_reason,
            })
            .collect();

        LLMResponse {
            id: response.id,
            model: response.model,
            choices,
            usage: response.usage.into(),
            provider: LLMProviderType::OpenAI,
        }
    }

    /// Handle error responses from OpenAI
    fn handle_error_response(&self, status_code: u16, error_text: &str) -> LLMError {
        let message = serde_json::from_str::<OpenAIError>(error_text)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| error_text.to_string());

        match status_code {
            401 => LLMError::AuthenticationFailed(message),
            429 => LLMError::RateLimitExceeded(message),
            400 => LLMError::InvalidRequest(message),
            408 | 504 => LLMError::Timeout(message),
            _ => LLMError::Internal(format!("OpenAI API error ({}): {}", status_code, message)),
        }
    }
}

#[async_trait]
impl LLMProviderClient for OpenAIClient {
    async fn chat_completion(&self, request: &LLMRequest) -> LLMResult<LLMResponse> {
        let headers = self.build_headers()?;
        let openai_request = self.convert_request(request);
        let request_url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        debug!("OpenAI API Request: URL={}, Model={}", request_url, request.model);

        let response = self
            .client
            .post(&request_url)
            .headers(headers)
            .json(&openai_request)
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

            error!("OpenAI API Error: {} - {}", status, error_text);
            return Err(self.handle_error_response(status.as_u16(), &error_text));
        }

        let openai_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| LLMError::Serialization(e.to_string()))?;

        Ok(self.convert_response(openai_response))
    }

    fn provider_type(&self) -> LLMProviderType {
        LLMProviderType::OpenAI
    }

    fn default_model(&self) -> &str {
        &self.config.default_model
    }
}
