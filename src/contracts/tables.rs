// Constant and variable table contract

use std::collections::{HashMap, HashSet};

use crate::models::{ProcessTables, StructuredData, VariableType};
use crate::Result;

use super::{parse_reply, ContractReport, ContractViolation};

/// Whether a possible value is a numeric literal
fn is_number(value: &str) -> bool {
    value.trim().parse::<i64>().is_ok()
}

/// Check extracted tables against the naming, typing and sharing rules.
///
/// `data` is what the user entered in stage 1; its process names and
/// interaction mode drive the process and sharing checks.
pub fn validate_tables(tables: &ProcessTables, data: &StructuredData) -> ContractReport {
    let mut report = ContractReport::new("tables");

    let entered: HashSet<&str> = data.subsystems.iter().map(|s| s.name.as_str()).collect();
    let process_names: HashSet<&str> = entered
        .iter()
        .copied()
        .chain(tables.processes.iter().map(|p| p.process_name.as_str()))
        .collect();

    if !entered.is_empty() {
        for process in &tables.processes {
            if !entered.contains(process.process_name.as_str()) {
                report.push(ContractViolation::UnknownProcess(process.process_name.clone()));
            }
        }
    }

    // name -> index of the process that first defined it
    let mut defined: HashMap<&str, usize> = HashMap::new();
    let shares_state = data.interaction_mode.shares_state();

    for (index, process) in tables.processes.iter().enumerate() {
        let names = process
            .constants
            .iter()
            .map(|c| c.name.as_str())
            .chain(process.variables.iter().map(|v| v.name.as_str()));

        for name in names {
            if process_names.contains(name) {
                report.push(ContractViolation::NameCollidesWithProcess(name.to_string()));
            }
            match defined.get(name) {
                None => {
                    defined.insert(name, index);
                }
                Some(&first) if shares_state && first == 0 && index > 0 => {
                    report.push(ContractViolation::SharedNameNotHoisted {
                        name: name.to_string(),
                        process: process.process_name.clone(),
                    });
                }
                Some(_) => report.push(ContractViolation::DuplicateName(name.to_string())),
            }
        }
    }

    for constant in tables.constants() {
        if constant.value.as_integer().is_none() {
            report.push(ContractViolation::NonIntegerConstant {
                name: constant.name.clone(),
                value: constant.value.to_string(),
            });
        }
    }

    let constant_names: HashSet<&str> = tables.constants().map(|c| c.name.as_str()).collect();

    for variable in tables.variables() {
        match &variable.var_type {
            VariableType::Int => {}
            VariableType::Array => {
                let initial = variable.initial_value.trim();
                if initial.is_empty() || initial == "[]" {
                    report.push(ContractViolation::MissingArrayInitialValue(
                        variable.name.clone(),
                    ));
                }
            }
            VariableType::Other(found) => {
                report.push(ContractViolation::UnsupportedVariableType {
                    name: variable.name.clone(),
                    found: found.clone(),
                });
            }
        }

        for value in &variable.possible_values {
            if !is_number(value) && !constant_names.contains(value.as_str()) {
                report.push(ContractViolation::InvalidPossibleValue {
                    variable: variable.name.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    report
}

/// Parse and validate a reply to
/// [`extract_constants_and_variables`](crate::prompts::extract_constants_and_variables)
pub fn parse_tables(reply: &str, data: &StructuredData) -> Result<ProcessTables> {
    let tables: ProcessTables = parse_reply("tables", reply)?;
    validate_tables(&tables, data).into_result()?;
    Ok(tables)
}
