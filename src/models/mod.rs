// Core domain models for PAT Agent
// These are the serde shapes exchanged with the backend and the language model

//! # Domain Models Module
//!
//! This module contains the data model implied by the wizard's client-server
//! and prompt contracts. Nothing here validates; validation lives in
//! [`crate::contracts`]. The types deserialize leniently because the model
//! frequently answers `"2"` where `2` was meant, or a list where a
//! comma-separated string was asked for.
//!
//! ## Rust Learning Notes:
//!
//! ### Module Organization
//! This `mod.rs` file serves as the **module root** for the `models` directory.
//!
//! ### Re-exports for Clean APIs
//! The `pub use` statements at the bottom create a clean, flat API.
//! Users can import `use pat_agent::models::Variable` instead of
//! `use pat_agent::models::process::Variable`.

// Interactions (the chat history) and history channels
pub mod message;

// Processes, constants, variables and the user's structured system description
pub mod process;

// Actions extracted per process
pub mod action;

// Known-algorithm catalog and the intent classification result
pub mod catalog;

// Properties to verify and the verdict the user expects
pub mod assertion;

pub use assertion::{Assertion, AssertionType, StateCondition};
pub use action::{Action, ActionTables, ConditionValue, ProcessActions, COMPLEX_CONDITIONS_KEY};
pub use catalog::{AlgorithmReference, IntentClassification, MatchType, RetrievedExample};
pub use message::{HistoryChannel, Interaction, Message, MessageRole};
pub use process::{
    Constant, InteractionMode, ProcessDefinition, ProcessTables, ScalarValue, StructuredData,
    SubsystemDescription, Variable, VariableType,
};

use serde::{Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Render any JSON scalar or list as the plain text the prompts expect.
///
/// Lists become `[a, b]`, `null` becomes the empty string.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(value_to_text).collect::<Vec<_>>().join(", ")
        ),
        other => other.to_string(),
    }
}

/// Deserialize a string field that the model may have emitted as a number, list or null
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

/// Deserialize `"a, b, c"` or `["a", "b", "c"]` into a list of trimmed entries
pub(crate) fn value_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        other => split_list(&value_to_text(&other)),
    })
}

/// Serialize a list back into the comma-separated form used in the prompts
pub(crate) fn join_values<S>(values: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&values.join(", "))
}

/// Split a comma-separated list, dropping surrounding brackets and blanks
pub(crate) fn split_list(text: &str) -> Vec<String> {
    let trimmed = text
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');
    trimmed
        .split(',')
        .map(|s| s.trim().trim_matches('"').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
