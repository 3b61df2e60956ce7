// PAT Agent reference backend
// Serves the wizard endpoints over a history store and an LLM provider client

//! # Reference Backend
//!
//! The wizard's transport client expects a backend that answers chat
//! questions, keeps per-channel histories, runs wizard prompts against a
//! language model and serves the algorithm and example databases. This
//! module provides one built on Axum.
//!
//! ## Layers
//!
//! ```text
//! WizardClient / RemoteGateway
//!        ↓ HTTP + JSON
//! Router (this module) ← CORS, request tracing
//!        ↓ handlers
//! HistoryStorage · AlgorithmCatalog · ExampleIndex · LLMProviderClient
//! ```
//!
//! ## Endpoints
//!
//! | Method | Path | Answer |
//! |--------|------|--------|
//! | POST | `/get_answers` | full default history |
//! | GET | `/get_history[?channel=]` | history of one channel |
//! | POST | `/del_msg` | default history after deletion |
//! | POST | `/get_chatbot_model_answers` | `{status, data: interaction}` |
//! | GET | `/get_classical_algorithms` | `{status, data: [entry]}` |
//! | GET | `/get_classical_algorithm_details?algorithm=` | `{status, data: entry}` |
//! | POST | `/get_most_relevant_example` | `{nl, code}` |
//! | POST | `/add_new_classical_algorithm` | `{status, newEntry: entry}` |
//! | GET | `/health` | plain text |
//!
//! ## Rust Learning Notes:
//!
//! ### Shared State
//! [`ServerState`] is `Clone` and holds only `Arc`s, so Axum can hand each
//! handler its own copy without copying the stores behind it.

pub mod catalog;
pub mod handlers;
pub mod history;
pub mod retrieval;

#[cfg(test)]
mod handlers_tests;

pub use catalog::AlgorithmCatalog;
pub use handlers::{ApiError, ServerState};
pub use history::{FileHistory, HistoryStorage, InMemoryHistory};
pub use retrieval::ExampleIndex;

use axum::{
    routing::{get, post},
    Router, Server,
};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::llm::LLMProviderClient;

/// Default port the wizard client points at
pub const DEFAULT_PORT: u16 = 5000;

/// Server configuration
#[derive(Debug, Clone)]
pub struct WizardServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_enabled: bool,
}

impl Default for WizardServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors_enabled: true,
        }
    }
}

/// Build the router for `state`
pub fn create_router(state: ServerState, cors_enabled: bool) -> Router {
    let mut app = Router::new()
        .route("/get_answers", post(handlers::get_answers))
        .route("/get_history", get(handlers::get_history))
        .route("/del_msg", post(handlers::del_msg))
        .route(
            "/get_chatbot_model_answers",
            post(handlers::get_chatbot_model_answers),
        )
        .route(
            "/get_classical_algorithms",
            get(handlers::get_classical_algorithms),
        )
        .route(
            "/get_classical_algorithm_details",
            get(handlers::get_classical_algorithm_details),
        )
        .route(
            "/get_most_relevant_example",
            post(handlers::get_most_relevant_example),
        )
        .route(
            "/add_new_classical_algorithm",
            post(handlers::add_new_classical_algorithm),
        )
        .route("/health", get(handlers::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// The reference backend
pub struct WizardServer {
    config: WizardServerConfig,
    state: ServerState,
}

impl WizardServer {
    pub fn new(state: ServerState) -> Self {
        Self {
            config: WizardServerConfig::default(),
            state,
        }
    }

    pub fn builder() -> WizardServerBuilder {
        WizardServerBuilder::new()
    }

    pub fn with_config(mut self, config: WizardServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &WizardServerConfig {
        &self.config
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone(), self.config.cors_enabled)
    }

    /// Bind to the configured host and port and serve until the process stops
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        self.log_startup(addr);

        Server::bind(&addr)
            .serve(self.router().into_make_service())
            .await?;
        Ok(())
    }

    /// Serve on an already bound listener
    pub async fn run_on(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.log_startup(listener.local_addr()?);

        Server::from_tcp(listener)?
            .serve(self.router().into_make_service())
            .await?;
        Ok(())
    }

    fn log_startup(&self, addr: SocketAddr) {
        info!("🚀 PAT Agent server running on http://{}", addr);
        match &self.state.llm {
            Some(llm) => info!("🤖 Answering with {} ({})", llm.provider_type(), llm.default_model()),
            None => info!("⚠️  No language model configured; model endpoints answer 503"),
        }
        info!("📚 {} examples loaded", self.state.examples.len());
    }
}

/// Builder for [`WizardServer`]
pub struct WizardServerBuilder {
    config: WizardServerConfig,
    history: Option<Arc<dyn HistoryStorage>>,
    llm: Option<Arc<dyn LLMProviderClient>>,
    catalog: Option<AlgorithmCatalog>,
    examples: Option<ExampleIndex>,
    max_tokens: Option<u32>,
}

impl WizardServerBuilder {
    pub fn new() -> Self {
        Self {
            config: WizardServerConfig::default(),
            history: None,
            llm: None,
            catalog: None,
            examples: None,
            max_tokens: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn with_cors(mut self, enabled: bool) -> Self {
        self.config.cors_enabled = enabled;
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStorage>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LLMProviderClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_catalog(mut self, catalog: AlgorithmCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_examples(mut self, examples: ExampleIndex) -> Self {
        self.examples = Some(examples);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Missing stores default to in-memory and empty ones
    pub fn build(self) -> WizardServer {
        let history = self
            .history
            .unwrap_or_else(|| Arc::new(InMemoryHistory::new()));
        let state = ServerState {
            history,
            llm: self.llm,
            catalog: Arc::new(self.catalog.unwrap_or_default()),
            examples: Arc::new(self.examples.unwrap_or_default()),
            max_tokens: self.max_tokens,
        };
        WizardServer::new(state).with_config(self.config)
    }
}

impl Default for WizardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
