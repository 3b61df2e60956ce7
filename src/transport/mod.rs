//! Transport layer
//!
//! [`WizardClient`] performs the JSON exchanges with the backend and
//! [`ChatSession`] turns their outcomes into store events.

pub mod client;
pub mod session;

#[cfg(test)]
mod session_tests;

pub use client::{ClientConfig, WizardClient, WizardClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
pub use session::ChatSession;
