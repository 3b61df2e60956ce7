// Actions extracted for each process

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value_to_text;

/// Reserved condition key for boolean expressions that cannot be written as variable/value pairs
pub const COMPLEX_CONDITIONS_KEY: &str = "complex_composite_conditions";

/// An atomic, conditionally enabled state transition.
///
/// `conditions` and `state_changes` are kept as raw JSON objects: a reply that
/// nests a condition inside `state_changes` must still parse so the contract
/// check can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub action_name: String,
    #[serde(default)]
    pub conditions: Map<String, Value>,
    #[serde(default)]
    pub state_changes: Map<String, Value>,
}

impl Action {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            conditions: Map::new(),
            state_changes: Map::new(),
        }
    }

    pub fn when(mut self, variable: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(variable.into(), value.into());
        self
    }

    pub fn when_any(mut self, variable: impl Into<String>, values: &[&str]) -> Self {
        let values = values.iter().map(|v| Value::String(v.to_string())).collect();
        self.conditions.insert(variable.into(), Value::Array(values));
        self
    }

    pub fn when_complex(mut self, expression: impl Into<String>) -> Self {
        self.conditions
            .insert(COMPLEX_CONDITIONS_KEY.to_string(), Value::String(expression.into()));
        self
    }

    pub fn then(mut self, variable: impl Into<String>, value: impl Into<Value>) -> Self {
        self.state_changes.insert(variable.into(), value.into());
        self
    }

    /// The composite expression, if the action uses the reserved key
    pub fn complex_condition(&self) -> Option<&str> {
        self.conditions
            .get(COMPLEX_CONDITIONS_KEY)
            .and_then(Value::as_str)
    }

    /// Simple variable conditions, excluding the reserved composite key
    pub fn variable_conditions(&self) -> impl Iterator<Item = (&String, ConditionValue)> {
        self.conditions
            .iter()
            .filter(|(key, _)| key.as_str() != COMPLEX_CONDITIONS_KEY)
            .map(|(key, value)| (key, ConditionValue::from_value(value)))
    }
}

/// Reading of one condition or state-change value
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    /// `"door": "closed"` or `"count": 2`
    Single(String),
    /// `"door": ["closed", "locked"]` - any of the listed values
    AnyOf(Vec<String>),
    /// An object where a plain value was expected
    Structured(Value),
}

impl ConditionValue {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => ConditionValue::AnyOf(items.iter().map(value_to_text).collect()),
            Value::Object(_) => ConditionValue::Structured(value.clone()),
            other => ConditionValue::Single(value_to_text(other)),
        }
    }

    /// Plain values carried by this entry; empty for structured values
    pub fn values(&self) -> Vec<&str> {
        match self {
            ConditionValue::Single(v) => vec![v.as_str()],
            ConditionValue::AnyOf(vs) => vs.iter().map(String::as_str).collect(),
            ConditionValue::Structured(_) => Vec::new(),
        }
    }
}

/// Actions of one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessActions {
    pub process_name: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Reply shape of the action extraction prompt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTables {
    pub processes: Vec<ProcessActions>,
}

impl ActionTables {
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.processes.iter().flat_map(|p| p.actions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_prompt_example() {
        let tables: ActionTables = serde_json::from_value(json!({
            "processes": [{
                "processName": "Process 1",
                "actions": [{
                    "action_name": "open",
                    "conditions": {
                        "owner.i": "near",
                        "door": ["closed", "locked"],
                        "complex_composite_conditions": "((key == with_owner_i and owner.i == in) or (key == in))"
                    },
                    "state_changes": {"door": "open"}
                }]
            }]
        }))
        .unwrap();

        let action = &tables.processes[0].actions[0];
        assert_eq!(action.action_name, "open");
        assert!(action.complex_condition().unwrap().contains("with_owner_i"));
        let conditions: Vec<_> = action.variable_conditions().collect();
        assert_eq!(conditions.len(), 2);
        assert!(conditions.iter().any(|(k, v)| k.as_str() == "door"
            && *v == ConditionValue::AnyOf(vec!["closed".into(), "locked".into()])));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let action: Action = serde_json::from_value(json!({"action_name": "idle"})).unwrap();
        assert!(action.conditions.is_empty());
        assert!(action.state_changes.is_empty());
    }

    #[test]
    fn test_builder() {
        let action = Action::new("lock")
            .when("door", "closed")
            .when_any("key", &["in", "with_owner"])
            .then("door", "locked");
        assert_eq!(action.conditions.len(), 2);
        assert_eq!(action.state_changes["door"], json!("locked"));
        assert_eq!(
            ConditionValue::from_value(&json!(3)).values(),
            vec!["3"]
        );
    }
}
