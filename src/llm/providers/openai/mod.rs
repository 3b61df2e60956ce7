//! OpenAI provider module
//! This module provides the OpenAI chat completions client

pub mod client;
pub mod config;
pub mod types;

pub use client::OpenAIClient;
pub use config::{is_reasoning_model, OpenAIConfig, API_KEY_ENV_VAR};
