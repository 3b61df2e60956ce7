// Properties the user asks the verifier to check

//! # Assertions
//!
//! Entered on the assertions page (stage 4) and turned into annotation lines
//! by [`crate::prompts::assertion_annotations`]. Each assertion also carries
//! the verdict the user expects, which stage 8 compares against the
//! verifier's answer.

use serde::{Deserialize, Deserializer, Serialize};

use super::value_list;
use crate::verification::Outcome;

/// Kind of property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssertionType {
    DeadlockFree,
    Reachability,
    Ltl,
    /// Anything else; contributes no annotation line
    Other(String),
}

impl AssertionType {
    pub fn as_str(&self) -> &str {
        match self {
            AssertionType::DeadlockFree => "deadlock-free",
            AssertionType::Reachability => "reachability",
            AssertionType::Ltl => "ltl",
            AssertionType::Other(text) => text,
        }
    }
}

impl From<String> for AssertionType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "deadlock-free" => AssertionType::DeadlockFree,
            "reachability" => AssertionType::Reachability,
            "ltl" => AssertionType::Ltl,
            _ => AssertionType::Other(value.trim().to_string()),
        }
    }
}

impl From<AssertionType> for String {
    fn from(kind: AssertionType) -> Self {
        kind.as_str().to_string()
    }
}

/// `variable = value`, optionally joined to the previous condition with `AND`/`OR`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCondition {
    #[serde(default)]
    pub variable: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,
}

impl StateCondition {
    pub fn new(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
            connector: None,
        }
    }

    pub fn joined_by(mut self, connector: impl Into<String>) -> Self {
        self.connector = Some(connector.into());
        self
    }

    /// Both sides filled in
    pub fn is_complete(&self) -> bool {
        !self.variable.trim().is_empty() && !self.value.trim().is_empty()
    }
}

/// One property from the assertions page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// Subsystem the property is about; the whole system when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub assertion_type: AssertionType,
    #[serde(default)]
    pub state_name: String,
    #[serde(default)]
    pub conditions: Vec<StateCondition>,
    /// `customize` switches a reachability assertion to `custom_description`
    #[serde(default)]
    pub reachability_type: String,
    /// `action`, `state` or `customize`
    #[serde(default)]
    pub ltl_target: String,
    /// Temporal operator in words, `always_eventually` style
    #[serde(default)]
    pub ltl_logic: String,
    #[serde(default, deserialize_with = "value_list")]
    pub selected_actions: Vec<String>,
    #[serde(default)]
    pub custom_description: String,
    #[serde(default = "default_truth", deserialize_with = "lenient_outcome")]
    pub assertion_truth: Outcome,
}

fn default_truth() -> Outcome {
    Outcome::Valid
}

/// Blank means the property should hold
fn lenient_outcome<'de, D>(deserializer: D) -> Result<Outcome, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(Outcome::Valid);
    }
    raw.parse().map_err(serde::de::Error::custom)
}

impl Assertion {
    fn of(assertion_type: AssertionType) -> Self {
        Self {
            component: None,
            assertion_type,
            state_name: String::new(),
            conditions: Vec::new(),
            reachability_type: String::new(),
            ltl_target: String::new(),
            ltl_logic: String::new(),
            selected_actions: Vec::new(),
            custom_description: String::new(),
            assertion_truth: Outcome::Valid,
        }
    }

    pub fn deadlock_free() -> Self {
        Self::of(AssertionType::DeadlockFree)
    }

    pub fn reachability(state_name: impl Into<String>, conditions: Vec<StateCondition>) -> Self {
        Self {
            state_name: state_name.into(),
            conditions,
            ..Self::of(AssertionType::Reachability)
        }
    }

    /// LTL property over actions
    pub fn ltl_actions(logic: impl Into<String>, actions: &[&str]) -> Self {
        Self {
            ltl_target: "action".to_string(),
            ltl_logic: logic.into(),
            selected_actions: actions.iter().map(|a| a.to_string()).collect(),
            ..Self::of(AssertionType::Ltl)
        }
    }

    /// LTL property over a named state
    pub fn ltl_state(
        logic: impl Into<String>,
        state_name: impl Into<String>,
        conditions: Vec<StateCondition>,
    ) -> Self {
        Self {
            ltl_target: "state".to_string(),
            ltl_logic: logic.into(),
            state_name: state_name.into(),
            conditions,
            ..Self::of(AssertionType::Ltl)
        }
    }

    pub fn for_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn expecting(mut self, outcome: Outcome) -> Self {
        self.assertion_truth = outcome;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_form_payload_deserializes() {
        let assertion: Assertion = serde_json::from_value(json!({
            "component": "Owner",
            "assertionType": "LTL",
            "ltlTarget": "action",
            "ltlLogic": "always_eventually",
            "selectedActions": "lock, unlock",
            "assertionTruth": ""
        }))
        .unwrap();

        assert_eq!(assertion.assertion_type, AssertionType::Ltl);
        assert_eq!(assertion.selected_actions, vec!["lock", "unlock"]);
        assert_eq!(assertion.assertion_truth, Outcome::Valid);
        assert_eq!(assertion.component.as_deref(), Some("Owner"));
    }

    #[test]
    fn test_expected_invalid_and_unknown_type() {
        let assertion: Assertion = serde_json::from_value(json!({
            "assertionType": "refinement",
            "assertionTruth": "Invalid"
        }))
        .unwrap();
        assert_eq!(assertion.assertion_type, AssertionType::Other("refinement".to_string()));
        assert_eq!(assertion.assertion_truth, Outcome::Invalid);

        let bad = serde_json::from_value::<Assertion>(json!({
            "assertionType": "ltl",
            "assertionTruth": "maybe"
        }));
        assert!(bad.is_err());
    }
}
