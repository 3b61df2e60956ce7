//! Anthropic provider module
//! This module provides the Anthropic Messages API client

pub mod client;
pub mod config;
pub mod types;

pub use client::AnthropicClient;
pub use config::{AnthropicConfig, API_KEY_ENV_VAR};
