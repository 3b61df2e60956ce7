//! HTTP client for the wizard backend
//! This module contains the request/response exchanges with `get_answers`,
//! `get_history`, `del_msg` and the supplementary model and catalog endpoints.

use reqwest::{header::HeaderMap, header::HeaderValue, header::ACCEPT, header::CONTENT_TYPE, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::models::{AlgorithmReference, HistoryChannel, Interaction, RetrievedExample};
use crate::{PatAgentError, Result};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Where the backend lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Serialize)]
struct QuestionBody<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct DeleteBody {
    index: usize,
}

#[derive(Debug, Serialize)]
struct ModelQuestionBody<'a> {
    question: &'a str,
    history: &'static str,
}

#[derive(Debug, Serialize)]
struct InstructionBody<'a> {
    instruction: &'a str,
}

/// `{status, data}` wrapper used by the model and catalog endpoints
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

/// `{error}` body the backend sends with 4xx/5xx answers; the catalog endpoints use `message`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// Client for the wizard backend.
///
/// Every call is a single JSON request/response exchange. Nothing is retried;
/// failures come back as [`PatAgentError::Transport`], [`PatAgentError::Server`]
/// or [`PatAgentError::Parse`].
#[derive(Debug, Clone)]
pub struct WizardClient {
    client: Client,
    base_url: Url,
    config: ClientConfig,
}

impl WizardClient {
    /// Create a client from configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = normalize_base_url(&config.base_url)?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(default_headers())
            .build()
            .map_err(|e| PatAgentError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    pub fn builder() -> WizardClientBuilder {
        WizardClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `POST get_answers {question}` → the full, updated message list
    pub async fn ask_question(&self, question: &str) -> Result<Vec<Interaction>> {
        self.ask_question_with_context(question, None).await
    }

    /// Same as [`ask_question`](Self::ask_question) with optional extra context for the model
    pub async fn ask_question_with_context(
        &self,
        question: &str,
        context: Option<&serde_json::Value>,
    ) -> Result<Vec<Interaction>> {
        let body = QuestionBody { question, context };
        self.post("get_answers", &body).await
    }

    /// `GET get_history` → the full message list of the default channel
    pub async fn fetch_history(&self) -> Result<Vec<Interaction>> {
        self.get("get_history").await
    }

    /// `GET get_history?channel=…` for one of the other history channels
    pub async fn fetch_channel_history(&self, channel: HistoryChannel) -> Result<Vec<Interaction>> {
        let mut url = self.endpoint("get_history")?;
        url.query_pairs_mut().append_pair("channel", channel.label());
        self.execute(self.client.get(url), "get_history").await
    }

    /// `POST del_msg {index}` → the message list after deletion
    pub async fn delete_message(&self, index: usize) -> Result<Vec<Interaction>> {
        self.post("del_msg", &DeleteBody { index }).await
    }

    /// `POST get_chatbot_model_answers {question, history}` → the recorded interaction
    pub async fn ask_model(&self, question: &str, channel: HistoryChannel) -> Result<Interaction> {
        let body = ModelQuestionBody {
            question,
            history: channel.label(),
        };
        let envelope: Envelope<Interaction> = self.post("get_chatbot_model_answers", &body).await?;
        unwrap_envelope("get_chatbot_model_answers", envelope)
    }

    /// `GET get_classical_algorithms` → the algorithm catalog
    pub async fn fetch_algorithms(&self) -> Result<Vec<AlgorithmReference>> {
        let envelope: Envelope<Vec<AlgorithmReference>> =
            self.get("get_classical_algorithms").await?;
        unwrap_envelope("get_classical_algorithms", envelope)
    }

    /// `GET get_classical_algorithm_details?algorithm=…` → one catalog entry
    pub async fn fetch_algorithm_details(&self, algorithm: &str) -> Result<AlgorithmReference> {
        let mut url = self.endpoint("get_classical_algorithm_details")?;
        url.query_pairs_mut().append_pair("algorithm", algorithm);
        let envelope: Envelope<AlgorithmReference> = self
            .execute(self.client.get(url), "get_classical_algorithm_details")
            .await?;
        unwrap_envelope("get_classical_algorithm_details", envelope)
    }

    /// `POST get_most_relevant_example {instruction}` → the closest annotated example
    pub async fn most_relevant_example(&self, instruction: &str) -> Result<RetrievedExample> {
        self.post("get_most_relevant_example", &InstructionBody { instruction })
            .await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        self.execute(self.client.get(url), path).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path)?;
        self.execute(self.client.post(url).json(body), path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &str,
    ) -> Result<T> {
        debug!("Wizard backend request: {}", operation);

        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", operation, e);
            PatAgentError::from(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or(text);
            error!("{} answered {}: {}", operation, status, message);
            return Err(PatAgentError::Server {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            error!("Unexpected response from {}: {}", operation, e);
            PatAgentError::Parse(format!("{}: {}", operation, e))
        })
    }
}

/// Builder for [`WizardClient`]
pub struct WizardClientBuilder {
    config: ClientConfig,
}

impl WizardClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<WizardClient> {
        WizardClient::new(self.config)
    }
}

impl Default for WizardClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Relative endpoint names resolve against the base, so it must end in `/`
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(PatAgentError::Configuration("empty base URL".to_string()));
    }
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Ok(Url::parse(&with_slash)?)
}

fn unwrap_envelope<T>(operation: &str, envelope: Envelope<T>) -> Result<T> {
    if envelope.status != "success" {
        return Err(PatAgentError::Server {
            status: 200,
            message: envelope
                .message
                .unwrap_or_else(|| format!("{} reported status {}", operation, envelope.status)),
        });
    }
    envelope
        .data
        .ok_or_else(|| PatAgentError::Parse(format!("{}: missing data", operation)))
}
