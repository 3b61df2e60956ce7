//! Model gateways
//!
//! The wizard only needs "send this prompt, give me the reply text". A
//! [`ModelGateway`] provides that either through the backend
//! ([`RemoteGateway`], which also records the exchange in a history channel)
//! or straight to a provider ([`DirectGateway`]).

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::llm::LLMProviderClient;
use crate::models::{AlgorithmReference, HistoryChannel, RetrievedExample};
use crate::transport::WizardClient;
use crate::Result;

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Send one prompt and return the model's raw reply
    async fn ask(&self, prompt: &str, channel: HistoryChannel) -> Result<String>;

    /// Closest annotated example for a code-generation instruction, if the gateway has a database
    async fn retrieve_example(&self, _instruction: &str) -> Result<Option<RetrievedExample>> {
        Ok(None)
    }

    /// Known-algorithm catalog, if the gateway has one
    async fn algorithms(&self) -> Result<Vec<AlgorithmReference>> {
        Ok(Vec::new())
    }
}

/// Sends prompts through the backend's model endpoint
pub struct RemoteGateway {
    client: WizardClient,
}

impl RemoteGateway {
    pub fn new(client: WizardClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelGateway for RemoteGateway {
    async fn ask(&self, prompt: &str, channel: HistoryChannel) -> Result<String> {
        let interaction = self.client.ask_model(prompt, channel).await?;
        Ok(interaction.answer)
    }

    async fn retrieve_example(&self, instruction: &str) -> Result<Option<RetrievedExample>> {
        self.client.most_relevant_example(instruction).await.map(Some)
    }

    async fn algorithms(&self) -> Result<Vec<AlgorithmReference>> {
        self.client.fetch_algorithms().await
    }
}

/// Sends prompts to a provider client without touching any history
pub struct DirectGateway {
    provider: Arc<dyn LLMProviderClient>,
    max_tokens: Option<u32>,
}

impl DirectGateway {
    pub fn new(provider: Arc<dyn LLMProviderClient>) -> Self {
        Self {
            provider,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl ModelGateway for DirectGateway {
    async fn ask(&self, prompt: &str, channel: HistoryChannel) -> Result<String> {
        debug!(
            "Direct prompt to {} ({} channel not recorded)",
            self.provider.provider_type(),
            channel
        );
        Ok(self.provider.complete(prompt, self.max_tokens).await?)
    }
}
