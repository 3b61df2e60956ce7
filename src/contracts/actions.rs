// Action table contract

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::models::{
    split_list, Action, ActionTables, ConditionValue, ProcessTables, Variable,
    COMPLEX_CONDITIONS_KEY,
};
use crate::Result;

use super::{parse_reply, ContractReport, ContractViolation};

const EXPRESSION_KEYWORDS: [&str; 5] = ["and", "or", "not", "true", "false"];

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+|\[[^\]]*\])*").expect("valid regex")
    })
}

/// `owner.i` and `owner[0]` both refer to `owner`
fn base_name(reference: &str) -> &str {
    let end = reference.find(|c| c == '.' || c == '[').unwrap_or(reference.len());
    &reference[..end]
}

fn is_valid_action_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Names an action may refer to, resolved from the tables
struct Scope<'a> {
    variables: HashMap<&'a str, &'a Variable>,
    constants: HashMap<&'a str, Option<i64>>,
    literals: HashSet<&'a str>,
}

impl<'a> Scope<'a> {
    fn new(tables: &'a ProcessTables) -> Self {
        let variables: HashMap<&str, &Variable> =
            tables.variables().map(|v| (v.name.as_str(), v)).collect();
        let constants = tables
            .constants()
            .map(|c| (c.name.as_str(), c.value.as_integer()))
            .collect();
        let literals = tables
            .variables()
            .flat_map(|v| v.possible_values.iter().map(String::as_str))
            .collect();
        Self {
            variables,
            constants,
            literals,
        }
    }

    fn variable(&self, reference: &str) -> Option<&'a Variable> {
        self.variables
            .get(reference)
            .or_else(|| self.variables.get(base_name(reference)))
            .copied()
    }

    /// Integer reading of a literal or a constant name
    fn integer(&self, token: &str) -> Option<i64> {
        let token = token.trim();
        token
            .parse::<i64>()
            .ok()
            .or_else(|| self.constants.get(token).copied().flatten())
    }

    fn knows(&self, identifier: &str) -> bool {
        let base = base_name(identifier);
        self.variables.contains_key(base)
            || self.constants.contains_key(base)
            || self.literals.contains(identifier)
            || EXPRESSION_KEYWORDS.contains(&identifier.to_lowercase().as_str())
    }

    fn unknown_identifiers<'e>(&self, expression: &'e str) -> Vec<&'e str> {
        identifier_regex()
            .find_iter(expression)
            .map(|m| m.as_str())
            .filter(|ident| !self.knows(ident))
            .collect()
    }
}

fn is_expression(value: &str) -> bool {
    let value = value.trim();
    value.parse::<i64>().is_err()
        && value
            .chars()
            .any(|c| c.is_whitespace() || "+-*/%()<>=!&|".contains(c))
}

/// Check one condition or assignment value against the variable's domain
fn check_value(
    scope: &Scope<'_>,
    report: &mut ContractReport,
    action: &str,
    variable: &Variable,
    value: &str,
) {
    let value = value.trim();
    if value.starts_with('[') {
        for element in split_list(value) {
            check_value(scope, report, action, variable, &element);
        }
        return;
    }

    if variable.allows(value) {
        return;
    }

    if let Some(n) = scope.integer(value) {
        if variable
            .possible_values
            .iter()
            .any(|candidate| scope.integer(candidate) == Some(n))
        {
            return;
        }
    } else if is_expression(value) {
        for identifier in scope.unknown_identifiers(value) {
            report.push(ContractViolation::UnknownIdentifier {
                action: action.to_string(),
                identifier: identifier.to_string(),
            });
        }
        return;
    }

    report.push(ContractViolation::ValueOutOfDomain {
        action: action.to_string(),
        variable: variable.name.clone(),
        value: value.to_string(),
    });
}

fn check_conditions(scope: &Scope<'_>, report: &mut ContractReport, action: &Action) {
    let name = action.action_name.as_str();

    if let Some(raw) = action.conditions.get(COMPLEX_CONDITIONS_KEY) {
        match raw.as_str() {
            Some(expression) => {
                for identifier in scope.unknown_identifiers(expression) {
                    report.push(ContractViolation::UnknownIdentifier {
                        action: name.to_string(),
                        identifier: identifier.to_string(),
                    });
                }
            }
            None => report.push(ContractViolation::StructuredValue {
                action: name.to_string(),
                variable: COMPLEX_CONDITIONS_KEY.to_string(),
            }),
        }
    }

    for (key, value) in action.variable_conditions() {
        let Some(variable) = scope.variable(key) else {
            report.push(ContractViolation::UnknownVariable {
                action: name.to_string(),
                variable: key.clone(),
            });
            continue;
        };
        if let ConditionValue::Structured(_) = value {
            report.push(ContractViolation::StructuredValue {
                action: name.to_string(),
                variable: key.clone(),
            });
            continue;
        }
        for v in value.values() {
            check_value(scope, report, name, variable, v);
        }
    }
}

fn check_state_changes(scope: &Scope<'_>, report: &mut ContractReport, action: &Action) {
    let name = action.action_name.as_str();

    for (key, value) in &action.state_changes {
        if key == COMPLEX_CONDITIONS_KEY || key == "conditions" {
            report.push(ContractViolation::ConditionInStateChanges(name.to_string()));
            continue;
        }
        if let Value::Object(inner) = value {
            if inner.contains_key("conditions") || inner.contains_key(COMPLEX_CONDITIONS_KEY) {
                report.push(ContractViolation::ConditionInStateChanges(name.to_string()));
            } else {
                report.push(ContractViolation::StructuredValue {
                    action: name.to_string(),
                    variable: key.clone(),
                });
            }
            continue;
        }

        let Some(variable) = scope.variable(key) else {
            report.push(ContractViolation::UnknownVariable {
                action: name.to_string(),
                variable: key.clone(),
            });
            continue;
        };
        for v in ConditionValue::from_value(value).values() {
            check_value(scope, report, name, variable, v);
        }
    }
}

/// Check extracted actions against the tables they were generated from
pub fn validate_actions(actions: &ActionTables, tables: &ProcessTables) -> ContractReport {
    let mut report = ContractReport::new("actions");
    let scope = Scope::new(tables);
    let mut seen = HashSet::new();

    for process in &actions.processes {
        if !tables.processes.is_empty() && tables.process(&process.process_name).is_none() {
            report.push(ContractViolation::UnknownProcess(process.process_name.clone()));
        }

        for action in &process.actions {
            if !is_valid_action_name(&action.action_name) {
                report.push(ContractViolation::InvalidActionName(action.action_name.clone()));
            }
            if !seen.insert(action.action_name.as_str()) {
                report.push(ContractViolation::DuplicateActionName(action.action_name.clone()));
            }
            check_conditions(&scope, &mut report, action);
            check_state_changes(&scope, &mut report, action);
        }
    }

    report
}

/// Parse and validate a reply to [`extract_actions`](crate::prompts::extract_actions)
pub fn parse_actions(reply: &str, tables: &ProcessTables) -> Result<ActionTables> {
    let actions: ActionTables = parse_reply("actions", reply)?;
    validate_actions(&actions, tables).into_result()?;
    Ok(actions)
}
