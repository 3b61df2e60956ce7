// Parse-and-validate boundary for language model replies

//! # Contracts Module
//!
//! The prompt library describes JSON shapes to the model but cannot make the
//! model honor them. Every reply passes through this module before the wizard
//! acts on it:
//!
//! 1. [`extract_json`] cuts the JSON document out of the reply (code fences and
//!    chatter around it are common)
//! 2. The document is deserialized into the typed model
//! 3. A validator walks the model and collects every [`ContractViolation`]
//!    into a [`ContractReport`]
//!
//! A failed report becomes [`PatAgentError::ContractViolation`], which is
//! recoverable: the caller re-prompts or asks the user to clarify.
//!
//! ## Rust Learning Notes:
//!
//! ### Collect, don't short-circuit
//! Validators push into a report instead of returning at the first problem.
//! A re-prompt that lists every broken rule converges faster than one that
//! fixes them one at a time.

pub mod actions;
pub mod intent;
pub mod tables;

pub use actions::{parse_actions, validate_actions};
pub use intent::{parse_intent, validate_intent};
pub use tables::{parse_tables, validate_tables};

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::{PatAgentError, Result};

/// One broken rule in a model reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("reply is not valid JSON for this contract: {0}")]
    MalformedJson(String),

    #[error("algorithm '{0}' is not in the catalog")]
    UnknownAlgorithm(String),

    #[error("algorithm '{id}' is a {found} entry, but the answer requires a {expected} entry")]
    MatchTypeMismatch {
        id: String,
        expected: String,
        found: String,
    },

    #[error("process '{0}' was not entered by the user")]
    UnknownProcess(String),

    #[error("name '{0}' is defined more than once")]
    DuplicateName(String),

    #[error("name '{0}' collides with a process name")]
    NameCollidesWithProcess(String),

    #[error("shared name '{name}' must be defined once under the first process, found under '{process}'")]
    SharedNameNotHoisted { name: String, process: String },

    #[error("constant '{name}' has non-integer value '{value}'")]
    NonIntegerConstant { name: String, value: String },

    #[error("variable '{name}' has type '{found}', expected int or array")]
    UnsupportedVariableType { name: String, found: String },

    #[error("array variable '{0}' has no initial value")]
    MissingArrayInitialValue(String),

    #[error("variable '{variable}' lists '{value}', which is neither a number nor a defined constant")]
    InvalidPossibleValue { variable: String, value: String },

    #[error("action name '{0}' is defined more than once")]
    DuplicateActionName(String),

    #[error("action name '{0}' may only contain alphanumerics and underscores")]
    InvalidActionName(String),

    #[error("action '{0}' has a condition inside state_changes")]
    ConditionInStateChanges(String),

    #[error("action '{action}' assigns a structured value to '{variable}'")]
    StructuredValue { action: String, variable: String },

    #[error("action '{action}' references undeclared variable '{variable}'")]
    UnknownVariable { action: String, variable: String },

    #[error("action '{action}' uses '{value}' for '{variable}', outside its possible values")]
    ValueOutOfDomain {
        action: String,
        variable: String,
        value: String,
    },

    #[error("action '{action}' has a composite condition referencing undefined '{identifier}'")]
    UnknownIdentifier { action: String, identifier: String },
}

/// Every violation found in one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractReport {
    /// Which contract was checked: `intent`, `tables` or `actions`
    pub contract: &'static str,
    pub violations: Vec<ContractViolation>,
}

impl ContractReport {
    pub fn new(contract: &'static str) -> Self {
        Self {
            contract,
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: ContractViolation) {
        self.violations.push(violation);
    }

    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// One line per violation, suitable for a re-prompt
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| format!("- {}", v))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            return Ok(());
        }
        debug!(
            "{} contract broken with {} violation(s)",
            self.contract,
            self.violations.len()
        );
        Err(PatAgentError::ContractViolation {
            contract: self.contract.to_string(),
            summary: self.summary(),
        })
    }
}

fn fenced_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:[a-zA-Z]*\n)?(.*?)```").expect("valid regex"))
}

/// Cut the JSON document out of a model reply.
///
/// Prefers the content of a fenced block that looks like JSON, otherwise the
/// span from the first `{` to the last `}`.
pub fn extract_json(reply: &str) -> Option<&str> {
    for captures in fenced_block_regex().captures_iter(reply) {
        if let Some(block) = captures.get(1) {
            let block = block.as_str().trim();
            if block.starts_with('{') {
                return Some(block);
            }
        }
    }

    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (start < end).then(|| &reply[start..=end])
}

/// Return the longest fenced code block, or the trimmed reply if it has none
pub fn extract_longest_code_block(reply: &str) -> String {
    fenced_block_regex()
        .captures_iter(reply)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .max_by_key(|block| block.len())
        .unwrap_or(reply)
        .trim()
        .to_string()
}

/// Deserialize the JSON part of a reply, reporting failure as a contract violation
pub(crate) fn parse_reply<T: DeserializeOwned>(contract: &'static str, reply: &str) -> Result<T> {
    let violation = match extract_json(reply) {
        None => ContractViolation::MalformedJson("no JSON object found".to_string()),
        Some(json) => match serde_json::from_str(json) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => ContractViolation::MalformedJson(e.to_string()),
        },
    };
    debug!("{} reply did not parse: {}", contract, violation);
    Err(PatAgentError::ContractViolation {
        contract: contract.to_string(),
        summary: format!("- {}", violation),
    })
}
