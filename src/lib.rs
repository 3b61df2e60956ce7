// PAT Agent - Rust Edition
// Turns natural-language system descriptions into PAT process models through a guided wizard

//! # PAT Agent Library
//!
//! This is the main library crate for PAT Agent, an interactive tool that walks a
//! user from a free-text description of a concurrent system to verified PAT
//! (Process Analysis Toolkit) code. This file serves as the **library root**
//! and defines the public API that the binaries and external crates use.
//!
//! ## Core Components
//!
//! ### Wizard Widgets
//! - [`ConfirmDialog`]: Confirmation prompt resolving to `true` / `false`
//! - [`LoadingOverlay`]: Stateless "work in progress" presentation
//! - [`Timeline`]: The 8-stage stepper (Information Collection → Refinement)
//!
//! ### Prompt Library
//! Pure functions in [`prompts`] build the instruction strings sent to the
//! language model for intent classification, constant/variable extraction,
//! action extraction and code generation.
//!
//! ### Contract Boundary
//! The prompts describe JSON shapes but cannot enforce them. Every model reply
//! goes through [`contracts`] before the wizard trusts it:
//!
//! - **Intent**: exactly one of the four tagged classification objects
//! - **Tables**: unique names, constants before variables, array initial values
//! - **Actions**: no nested conditions, every name resolves against the tables
//!
//! ### Transport and Store
//! [`WizardClient`] talks to the backend (`get_answers`, `get_history`,
//! `del_msg`). [`ChatSession`] turns each response into [`StoreEvent`]s that a
//! central [`Store`] applies, so network code never touches presentation state.
//!
//! ### Reference Backend
//! [`server`] hosts the same endpoints over a pluggable history store and an
//! LLM provider client.
//!
//! ## Rust Learning Notes:
//!
//! ### Re-exports
//! `pub use` statements create shortcuts so users don't need to know the internal
//! module structure. Instead of `use pat_agent::widgets::timeline::Timeline`,
//! users can write `use pat_agent::Timeline`.

pub mod config;
pub mod contracts;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod server;
pub mod store;
pub mod transport;
pub mod verification;
pub mod widgets;
pub mod wizard;

// Re-export core domain types for easy access
pub use models::{
    Action, ActionTables, AlgorithmReference, Assertion, AssertionType, Constant, HistoryChannel,
    IntentClassification, Interaction, InteractionMode, MatchType, ProcessActions,
    ProcessDefinition, ProcessTables, RetrievedExample, StateCondition, StructuredData, Variable,
    VariableType,
};
pub use verification::{Mismatch, Outcome, VerificationResult};

pub use contracts::{ContractReport, ContractViolation};
pub use store::{AppState, Store, StoreEvent};
pub use transport::{ChatSession, ClientConfig, WizardClient, WizardClientBuilder};
pub use widgets::{
    ConfirmDialog, ConfirmRequest, DialogOptions, LoadingOverlay, StepStatus, Timeline,
    TimelineStage,
};
pub use wizard::{CodeRequest, DirectGateway, ModelGateway, RemoteGateway, Wizard};

use thiserror::Error;

/// Custom error types for PAT Agent operations
///
/// ## Rust Learning Notes:
///
/// ### The `thiserror` Crate
/// - `#[derive(Error)]` implements the `std::error::Error` trait
/// - `#[error("...")]` provides human-readable error messages
/// - `#[from]` enables automatic conversion from other error types
#[derive(Error, Debug)]
pub enum PatAgentError {
    /// The backend could not be reached or the connection broke mid-request
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success HTTP status
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The backend or model answered with something that is not the expected JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// A model reply parsed but broke its contract. Recoverable: re-prompt or ask the user.
    #[error("Contract violation in {contract}: {summary}")]
    ContractViolation { contract: String, summary: String },

    /// Error when invalid input is provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error when a resource cannot be found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The resource already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Settings could not be loaded or are inconsistent
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Errors raised by an LLM provider client
    #[error("LLM error: {0}")]
    Llm(#[from] llm::LLMError),

    /// History persistence failures
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for PatAgentError {
    fn from(err: std::io::Error) -> Self {
        PatAgentError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for PatAgentError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            PatAgentError::Server {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else if error.is_decode() {
            PatAgentError::Parse(error.to_string())
        } else {
            PatAgentError::Transport(error.to_string())
        }
    }
}

impl From<url::ParseError> for PatAgentError {
    fn from(error: url::ParseError) -> Self {
        PatAgentError::Configuration(format!("Invalid URL: {}", error))
    }
}

impl PatAgentError {
    /// Whether the wizard can recover by asking the model (or the user) again
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PatAgentError::ContractViolation { .. } | PatAgentError::Parse(_)
        )
    }
}

/// Type alias for Results that use our custom error type
pub type Result<T> = std::result::Result<T, PatAgentError>;
