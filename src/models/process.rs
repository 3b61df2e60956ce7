// Processes, constants and variables of the modelled system

//! # Process Tables
//!
//! The second wizard stage asks the model for one table per process: its
//! constants first, then its variables. The shape mirrors what the prompt
//! requests:
//!
//! ```text
//! { "processes": [ { "processName": "...", "constants": [...], "variables": [...] } ] }
//! ```

use serde::{Deserialize, Serialize};

use super::{join_values, lenient_string, value_list, Assertion};

/// How the user said the processes are combined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InteractionMode {
    /// Processes hand control to each other as described; no overall system
    None,
    /// `[]` - only one process runs
    Choice,
    /// `||` - parallel composition
    Parallel,
    /// `|||` - interleaving
    Interleaving,
    /// Single component, nothing to combine
    Skip,
    /// Free-text interaction description
    Custom(String),
}

impl InteractionMode {
    /// Modes under which processes are likely to share most of their state.
    ///
    /// Shared constants and variables must then be defined once, under the first process.
    pub fn shares_state(&self) -> bool {
        matches!(self, InteractionMode::None | InteractionMode::Choice)
    }

    pub fn as_str(&self) -> &str {
        match self {
            InteractionMode::None => "none",
            InteractionMode::Choice => "choice",
            InteractionMode::Parallel => "parallel",
            InteractionMode::Interleaving => "interleaving",
            InteractionMode::Skip => "skip",
            InteractionMode::Custom(text) => text,
        }
    }
}

impl From<String> for InteractionMode {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "none" => InteractionMode::None,
            "choice" => InteractionMode::Choice,
            "parallel" => InteractionMode::Parallel,
            "interleaving" | "interleave" => InteractionMode::Interleaving,
            "skip" => InteractionMode::Skip,
            _ => InteractionMode::Custom(value.trim().to_string()),
        }
    }
}

impl From<InteractionMode> for String {
    fn from(mode: InteractionMode) -> Self {
        mode.as_str().to_string()
    }
}

impl std::fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One process as entered on the information collection page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemDescription {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Everything the user entered in stage 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredData {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub model_desc: String,
    pub subsystem_count: usize,
    #[serde(default)]
    pub subsystems: Vec<SubsystemDescription>,
    pub interaction_mode: InteractionMode,
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

impl StructuredData {
    pub fn new(model_name: impl Into<String>, interaction_mode: InteractionMode) -> Self {
        Self {
            model_name: model_name.into(),
            model_desc: String::new(),
            subsystem_count: 0,
            subsystems: Vec::new(),
            interaction_mode,
            assertions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.model_desc = description.into();
        self
    }

    /// Append a process and keep `subsystem_count` in step
    pub fn with_subsystem(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.subsystems.push(SubsystemDescription {
            name: name.into(),
            description: description.into(),
        });
        self.subsystem_count = self.subsystems.len();
        self
    }

    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// One line per process, as fed to the constant/variable extraction prompt
    pub fn processes_description(&self) -> String {
        self.subsystems
            .iter()
            .enumerate()
            .map(|(i, sub)| {
                format!(
                    "process {}: process name: {}, process description: {}",
                    i + 1,
                    sub.name,
                    sub.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whole-system paragraph fed to the action extraction prompt
    pub fn system_description(&self) -> String {
        let processes = self
            .subsystems
            .iter()
            .map(|sub| format!("{}: {}", sub.name, sub.description))
            .collect::<Vec<_>>()
            .join("; ");
        format!(
            "The user would like to build a system called {}, where {}. There are {} processes in the system, the descriptions of the processes are as follows: {}",
            self.model_name, self.model_desc, self.subsystem_count, processes
        )
    }
}

/// A JSON scalar the model may send as a number or as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Int(i64),
    Text(String),
}

impl ScalarValue {
    /// Integer reading of the value, accepting `"2"` as well as `2`
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(n) => Some(*n),
            ScalarValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarValue::Int(n) => write!(f, "{}", n),
            ScalarValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A named integer constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub name: String,
    pub value: ScalarValue,
    #[serde(default)]
    pub description: String,
}

impl Constant {
    pub fn new(name: impl Into<String>, value: i64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ScalarValue::Int(value),
            description: description.into(),
        }
    }
}

/// Variable type; anything other than int or array breaks the table contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariableType {
    Int,
    Array,
    Other(String),
}

impl From<String> for VariableType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "int" | "integer" => VariableType::Int,
            "array" | "list" => VariableType::Array,
            _ => VariableType::Other(value),
        }
    }
}

impl From<VariableType> for String {
    fn from(var_type: VariableType) -> Self {
        match var_type {
            VariableType::Int => "int".to_string(),
            VariableType::Array => "array".to_string(),
            VariableType::Other(text) => text,
        }
    }
}

/// A state variable with its enumerated domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    pub name: String,

    #[serde(rename = "type")]
    pub var_type: VariableType,

    /// Each entry is a numeric literal or the name of a defined constant
    #[serde(
        default,
        deserialize_with = "value_list",
        serialize_with = "join_values"
    )]
    pub possible_values: Vec<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub initial_value: String,

    #[serde(default)]
    pub description: String,
}

impl Variable {
    pub fn int(name: impl Into<String>, possible_values: &[&str], initial_value: &str) -> Self {
        Self {
            name: name.into(),
            var_type: VariableType::Int,
            possible_values: possible_values.iter().map(|s| s.to_string()).collect(),
            initial_value: initial_value.to_string(),
            description: String::new(),
        }
    }

    pub fn array(name: impl Into<String>, possible_values: &[&str], initial_value: &str) -> Self {
        Self {
            var_type: VariableType::Array,
            ..Self::int(name, possible_values, initial_value)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether `value` is one of the declared possible values
    pub fn allows(&self, value: &str) -> bool {
        let value = value.trim();
        self.possible_values.iter().any(|v| v == value)
    }
}

/// Constants and variables owned by one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub process_name: String,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

impl ProcessDefinition {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            constants: Vec::new(),
            variables: Vec::new(),
        }
    }

    pub fn with_constant(mut self, constant: Constant) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
}

/// The full constant/variable table set for a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessTables {
    pub processes: Vec<ProcessDefinition>,
}

impl ProcessTables {
    pub fn new(processes: Vec<ProcessDefinition>) -> Self {
        Self { processes }
    }

    pub fn constants(&self) -> impl Iterator<Item = &Constant> {
        self.processes.iter().flat_map(|p| p.constants.iter())
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.processes.iter().flat_map(|p| p.variables.iter())
    }

    pub fn find_variable(&self, name: &str) -> Option<&Variable> {
        self.variables().find(|v| v.name == name)
    }

    pub fn find_constant(&self, name: &str) -> Option<&Constant> {
        self.constants().find(|c| c.name == name)
    }

    pub fn process(&self, name: &str) -> Option<&ProcessDefinition> {
        self.processes.iter().find(|p| p.process_name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_prompt_example_shape() {
        let tables: ProcessTables = serde_json::from_value(json!({
            "processes": [{
                "processName": "Process 1",
                "constants": [
                    {"name": "MAX_USERS", "value": "2", "description": "Maximum number of users allowed"}
                ],
                "variables": [
                    {"name": "userCount", "type": "int", "possibleValues": "0, 1, MAX_USERS",
                     "initialValue": "MAX_USERS", "description": "Current number of active users"},
                    {"name": "positions", "type": "array", "possibleValues": "near, far, in",
                     "initialValue": "[far, far]", "description": "Positions of the two users"}
                ]
            }]
        }))
        .unwrap();

        let process = &tables.processes[0];
        assert_eq!(process.constants[0].value.as_integer(), Some(2));
        assert_eq!(process.variables[0].possible_values, vec!["0", "1", "MAX_USERS"]);
        assert_eq!(process.variables[1].var_type, VariableType::Array);
        assert_eq!(process.variables[1].initial_value, "[far, far]");
    }

    #[test]
    fn test_lenient_variable_fields() {
        let variable: Variable = serde_json::from_value(json!({
            "name": "positions",
            "type": "Array",
            "possibleValues": ["near", "far"],
            "initialValue": ["far", "far"]
        }))
        .unwrap();
        assert_eq!(variable.possible_values, vec!["near", "far"]);
        assert_eq!(variable.initial_value, "[far, far]");
        assert!(variable.allows(" far "));
        assert!(!variable.allows("in"));
    }

    #[test]
    fn test_possible_values_serialize_as_text() {
        let variable = Variable::int("count", &["0", "1", "2"], "0");
        let value = serde_json::to_value(&variable).unwrap();
        assert_eq!(value["possibleValues"], "0, 1, 2");
        assert_eq!(value["type"], "int");
    }

    #[test]
    fn test_interaction_mode_round_trip() {
        let mode: InteractionMode = serde_json::from_value(json!("Choice")).unwrap();
        assert_eq!(mode, InteractionMode::Choice);
        assert!(mode.shares_state());
        assert!(!InteractionMode::Parallel.shares_state());
        let custom = InteractionMode::from("owners pass the key around".to_string());
        assert_eq!(custom.as_str(), "owners pass the key around");
    }

    #[test]
    fn test_structured_data_descriptions() {
        let data = StructuredData::new("CarKey", InteractionMode::Parallel)
            .with_description("an owner unlocks a car")
            .with_subsystem("Owner", "walks to the car")
            .with_subsystem("Door", "opens when unlocked");

        assert_eq!(data.subsystem_count, 2);
        assert_eq!(
            data.processes_description(),
            "process 1: process name: Owner, process description: walks to the car\n\
             process 2: process name: Door, process description: opens when unlocked"
        );
        assert!(data
            .system_description()
            .ends_with("Owner: walks to the car; Door: opens when unlocked"));
    }
}
