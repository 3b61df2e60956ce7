// Prompt Library
// Instruction strings for every language model task the wizard runs

//! # Prompt Library
//!
//! Pure functions that build the instruction text sent to the language
//! model. None of them talk to a service; the replies they ask for are parsed
//! and checked by [`crate::contracts`].
//!
//! | Function | Reply contract |
//! |---|---|
//! | [`classify_intent`] | [`IntentClassification`](crate::models::IntentClassification) |
//! | [`extract_constants_and_variables`] | [`ProcessTables`] |
//! | [`extract_actions`] | [`ActionTables`](crate::models::ActionTables) |
//! | [`annotate_constants`], [`annotate_actions`] | annotation lines |
//! | [`generate_code`], [`refine_code`] | a single code block |
//! | [`describe_code`], [`name_algorithm_id`], [`name_algorithm`] | plain text |
//!
//! [`assertion_annotations`] and [`mismatch_feedback`] need no model: they
//! render the user's assertions and the verifier's counterexamples as text.
//!
//! ## Rust Learning Notes:
//!
//! ### Raw string literals
//! The templates contain double quotes and JSON braces. `format!` needs `{{`
//! and `}}` for literal braces; the example JSON blocks are therefore kept in
//! separate `const` raw strings (`r#"..."#`) and spliced in with `{}`.

use crate::models::{
    ActionTables, Assertion, AssertionType, InteractionMode, ProcessTables, RetrievedExample,
    StateCondition, StructuredData,
};
use crate::verification::{Mismatch, INITIAL_TRACE};

const CLASSIFICATION_RULES: &str = r#"Here are the rules to follow in your response:
1. Compare the user's description with the description of existing algorithms, identify the most relevant existing algorithm, if any.

2. If the description of the most relevant existing algorithm says "loose match", and the user's request is very likely describing a classical algorithm (e.g., dining philosopher, peterson, etc.) that matches the most relevant existing algorithm, then organize the analyzed results into the following **JSON format**:
{
"type": "customization-algorithm",
"algorithm": id of the algorithm that appears in the description of existing algorithms (before :),
"description": description of the algorithm
}
3. If the description of the most relevant existing algorithm says "exact match", then only if the user's request references the same major **components** as a known algorithm (**no significant extras or missing pieces**). It is ok if the **requirements** described in the user's request doesn't exactly match with the requirements described in the most relevant existing algorithm, as long as there are no significantly more requirements, organize the analyzed results into the following **JSON format**:
{
"type": "customization-system",
"algorithm": id of the algorithm that appears in the description of existing algorithms (before :),
"description": description of the algorithm
}
4. If the user's request has any additional and/or missing components, or has significantly more requirements when the description of the most relevant existing algorithm says "exact match", or if no existing algorithms that are **sufficiently similar** to the user's request, organize the analyzed results into the following **JSON format**:
{
"type": "new system",
"algorithm": "",
"description": ""
}
5. If the user's request is overly general, too vague, or does not sound like a description of a reasonable algorithm or system, organize the analyzed results into the following **JSON format**:
{
"type": "clarify",
"algorithm": "",
"description": ""
}"#;

const TABLES_EXAMPLE: &str = r#"{
  "processes": [
    {
      "processName": "Process 1",
      "constants": [
        {
          "name": "MAX_USERS",
          "value": "2",
          "description": "Maximum number of users allowed"
        }
      ],
      "variables": [
        {
          "name": "userCount",
          "type": "int",
          "possibleValues": "0 to MAX_USERS",
          "initialValue": "MAX_USERS",
          "description": "Current number of active users"
        },
        {
          "name": "positions",
          "type": "array",
          "possibleValues": "near, far, in",
          "initialValue": "[far, far]",
          "description": "Positions of the two users"
        }
      ]
    }
  ]
}"#;

const ACTIONS_EXAMPLE: &str = r#"{
  "processes": [
    {
      "processName": "Process 1",
      "actions": [
        {
          "action_name": "open",
          "conditions": {
          "owner.i": "near",
          "door": ["closed", "locked"],
          "complex_composite_conditions": "((key == with_owner_i and owner.i == in) or (key == in))"
          },
          "state_changes": {
          "door": "open"
          }
        }
      ]
    }
  ]
}"#;

const ACTIONS_RULES: &str = r#"4. All conditions must be exhaustively listed under the "conditions" field. There should **NEVER** be any conditions inside "state_changes". If a state change depends on an additional condition, the action **must be split** into multiple more specific actions, each with deterministic conditions and unconditional state changes.

5. In "conditions", the reserved keyword "complex_composite_conditions" is used to represent complex composite conditions. This is the **only** case where a key may be something other than a variable name. However, using "complex_composite_conditions" is **strongly discouraged** and should **ONLY BE USED WHEN THERE IS ABSOLUTELY NO STANDARD WAY TO EXPRESS THE CONDITIONS**. All expressions inside "complex_composite_conditions" **MUST** be based solely on **DEFINED VARIABLES** and their valid value relationships.

Ensure that:
- Action names (action_name) must be **unique** and consists of alphanumeric characters and underscores **only**.
- All variables used in conditions and state changes **MUST** be declared in the provided list of system variables, and their assigned values MUST come from the corresponding list of defined possible values.
- The **conditions are specific** and use system variables appropriately by considering dependencies between processes.
- **Avoid overly generic statements** - each process should feel logically connected to system behavior.

Note that some actions **may not have any conditions or state changes**. In such cases, the corresponding field should be an empty JSON object. This is especially appropriate when conditions and changes cannot be determined through common sense reasoning or by analyzing the system description, or when the intended conditions or changes cannot be expressed using the existing variables.

Please ensure your response is a valid JSON string that can be parsed directly."#;

const VALID_JSON_REMINDER: &str = "Please ensure your response is a valid JSON string that can be parsed directly.";

/// Classify a free-text system description against the known-algorithm catalog.
///
/// `known_algorithms_summary` is usually
/// [`catalog_summary`](crate::models::catalog::catalog_summary) of the catalog.
pub fn classify_intent(user_input: &str, known_algorithms_summary: &str) -> String {
    format!(
        "User description: \"{}\".\nHere is the list of existing algorithms in our database:\n{}\n\n{}",
        user_input, known_algorithms_summary, CLASSIFICATION_RULES
    )
}

/// Ask for the per-process constant and variable tables
pub fn extract_constants_and_variables(
    structured_data: &StructuredData,
    processes_description: &str,
) -> String {
    format!(
        r#"As an expert in information extraction and analysis in computer science domain, can you extract all the constants and variables involved in each of the {count} processes described?
{processes}
Please structure your analyzed results in the following JSON format:
{example}

Requirements for the content:
1. For constants, they have 3 properties: name, value (should be an integer), and description. For variables, they have 4 properties: name, type (integer, array, etc.), possible values (**please ensure the possible values are defined as constants if necessary**), and description.
2. Constants should be defined before variables. The names of variables and constants (including the possible values of variables) must be unique across all processes and must not conflict with any process name.
3. The interaction mode for the processes is {mode}, if the mode is "none" or "choice", note that constants and variables are likely to overlap significantly across processes. In such cases, ensure that shared constants and variables are defined only once - under the first process - and not duplicated in each individual process.
4. Initial values should be specified based on commonsense or process description.
5. Types of variables should be either int or array. If a variable is an array, it is **MANDATORY** to specify its initial value as a list (i.e., the initialValue field cannot be left empty). If no initial value can be reasonably assigned, it indicates that the **possible values are incomplete** and should include additional entries (e.g., it may be necessary to define a value like "disk_empty").
6. The possible values of a variable should be listed out as concrete values separated by "," without "[]". For example: "ENGINE_OFF, ENGINE_ON". It **should not involve any natural language description** (i.e., cannot be something like 0 to MAX_CROSSING_TIME), each possible value **MUST be either a defined constant or a number**.
7. Descriptions should be clear and concise.
8. For processName, please follow exactly the processName entered by the user without any additional natural language description.
9. Variables whose possible values represent actions, transitions, or system control (e.g., moveSelection, activeControl) rather than data states **should not** be included as variables. These are part of the system behavior and will be handled separately during action extraction.

{reminder}"#,
        count = structured_data.subsystem_count,
        processes = processes_description,
        example = TABLES_EXAMPLE,
        mode = structured_data.interaction_mode,
        reminder = VALID_JSON_REMINDER,
    )
}

/// Ask for the per-process actions, given the validated tables.
///
/// The tables are embedded as compact JSON.
pub fn extract_actions(descriptions: &str, processed_tables: &ProcessTables) -> String {
    // Serializing plain data to a String cannot fail
    let tables = serde_json::to_string(processed_tables).unwrap_or_default();
    format!(
        r#"As an expert in reasoning and action extraction, analyze the following system: {descriptions}
Given the list of system variables and their possible values in JSON format:
{tables}
Follow these steps:
1. **Identify all possible actions for each process**
- Ensure actions are realistic and align with the system behavior.

2. **Determine the conditions for each action**
- Under what conditions should an action occur?
- What values must the system variables have (including variables from other processes) for the action to be valid?
- **Ensure each condition accounts for dependencies between processes**.

3. Organize the analyzed results into a **JSON format**, each action should have **3 properties**: "action_name", "conditions" (exhaustive list of related variables and values they should assume), and "state_changes" associated with the action (affected variables and their respective new value). For both conditions and state changes, please list the variables with their expected value(s) (the values can be defined constants, numeric values, or expressions combining variables with constants or numbers), instead of using any natural language description. An example JSON is as follows:
{example}

{rules}"#,
        descriptions = descriptions,
        tables = tables,
        example = ACTIONS_EXAMPLE,
        rules = ACTIONS_RULES,
    )
}

/// One-shot code generation prompt.
///
/// The retrieved pair is the worked example; the system description only
/// breaks ties with the annotation.
pub fn generate_code(
    general_info: &str,
    pitfalls_rules: &str,
    retrieved: &RetrievedExample,
    system_description: &str,
    nl_instruction: &str,
) -> String {
    format!(
        "You are an expert in PAT (Process Analysis Toolkit), and you already possess a strong understanding of PAT concepts as outlined in the documentation. As a reminder, here are a few key guidelines:
--- Quick Reference ---
General Information: {general_info}

Pitfalls and Syntax Guidelines: {pitfalls_rules}

Your task is to generate the PAT code given the corresponding natural language annotation for the system.
### Example:
**Input NL Annotation:** {example_nl}
**Expected Output:** {example_code}

Given the general system description: {system_description}, now generate the PAT code corresponding to the **following system annotation**. Refer to the system description **only** if explicitly guided in the annotation, or if there is a contradiction between the annotation and the description.

### System Annotation:\n{nl_instruction}
\nThe PAT code should be:
### Response:",
        general_info = general_info,
        pitfalls_rules = pitfalls_rules,
        example_nl = retrieved.nl,
        example_code = retrieved.code,
        system_description = system_description,
        nl_instruction = nl_instruction,
    )
}

/// Summarize finished code into a catalog description
pub fn describe_code(code: &str) -> String {
    format!(
        "As a PAT expert, given the following PAT code, please summarize it briefly in one paragraph. Please be succinct and focus on listing the different components that compose the system and the requirements. For requirements, just describe without assertion result as you have no information of the expected result of the verification. Remember, be brief, say in a pattern like 'This model simulates a xxx system composed of x interacting components: xxx. The system includes requirements on xxx.' **WITHOUT ADDITIONAL INFORMATION, do not describe how the components interact, etc.**:\n{}",
        code
    )
}

/// Ask for a catalog id; pass the reply through [`sanitize_algorithm_id`]
pub fn name_algorithm_id(description: &str) -> String {
    format!(
        "Based on this description, create an id for the model, note, the id **MUST FOLLOW THE FORMAT like 'car_owner_key_door_motor' to be a single connected string**, **DO NOT INCLUDE ANY WORDS OTHER THAN THE ID**\n{}",
        description
    )
}

pub fn name_algorithm(description: &str) -> String {
    format!(
        "Based on this description, create a name for the model, note, the name should be a few words describing the model, ideally capturing the number of components, **DO NOT INCLUDE ANY WORDS OTHER THAN THE NAME**:\n{}",
        description
    )
}

/// Keep only alphanumerics and underscores, lowercased
pub fn sanitize_algorithm_id(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect::<String>()
        .to_lowercase()
}

/// Stage 5: annotation lines for the constants and variables
pub fn annotate_constants(processed_tables: &ProcessTables) -> String {
    // Serializing plain data to a String cannot fail
    let tables = serde_json::to_string(processed_tables).unwrap_or_default();
    format!(
        r#"According to the following json data, please generate NL annotation for PAT code generation, for example, to define the number of owners, you should generate such an annotation: // "N": number of owners in the system (set to 2), and to define the constant "far", you should generate this annotation: // "far": represents an owner being out and far away from the car. The annotation for each constant and variable should be generated on a new line. **Note: 1. For variables, there is no need to specify possible values, only specify the initial value for each variable. 2. Generate the annotations for all constants before variables.** The json data is as follows:
{}"#,
        tables
    )
}

/// Stage 5: annotation lines for the actions of each process
pub fn annotate_actions(actions: &ActionTables) -> String {
    let actions = serde_json::to_string(actions).unwrap_or_default();
    format!(
        r#"According to the following json data, please generate the NL annotation for PAT code generation. For each process, start the annotation with an annotation line // Definition of the "process_name" subsystem. (if any variable is involved in the process, please also add the description like: for xxx with index i). To annotate the actions that can happen in processes, we specify the conditions, action name, and the changes that the action introduces for the variables. For example, an annotation might be: //if "owner[i]" is "far", the action "towards.i" makes "owner[i]" become "near" (owner approaches the car). Note that, when processing conditions, if "complex_composite_conditions" exists as a key, its value alone forms the condition and should be directly described without mentioning "complex_composite_conditions". For other entries in conditions, the key and value together form the condition. Now please generate the NL annotations for each process in the json data, ensuring that the annotation for each action will span a new row. The json data is as follows:
{}"#,
        actions
    )
}

const CENTRAL_VARIABLE_HINT: &str = "consider defining the system around the most central variable (e.g., the number of owners) only if appropriate";

/// The line telling the model how to compose the processes; `None` for a single component
fn system_definition_line(model_name: &str, mode: &InteractionMode) -> Option<String> {
    let line = match mode {
        InteractionMode::Interleaving => format!(
            r#"// define the {} system: overall system combining all the subsystems interleavingly ("|||"), {}"#,
            model_name, CENTRAL_VARIABLE_HINT
        ),
        InteractionMode::Parallel => format!(
            r#"// define the {} system: overall system combining all the subsystems with parallel composition ("||"), {}"#,
            model_name, CENTRAL_VARIABLE_HINT
        ),
        InteractionMode::Choice => format!(
            r#"// define the {} system: overall system combining all the subsystems by choosing only one to execute ("[]"), {}. Note that **each subsystem** should go back to this **overall system**."#,
            model_name, CENTRAL_VARIABLE_HINT
        ),
        InteractionMode::None => "// there is **no need** to define an overall system or explicitly combine the processes. However, ensure that the generated processes **transfer control** to each other as described in the system description, reflecting the intended interactions".to_string(),
        InteractionMode::Skip => return None,
        InteractionMode::Custom(description) => format!(
            "// define the {} system following the description: {}",
            model_name, description
        ),
    };
    Some(line)
}

/// `a = 1 AND b = 2`; the first condition's connector is ignored
fn joined_conditions(conditions: &[StateCondition]) -> String {
    let parts: Vec<String> = conditions
        .iter()
        .filter(|c| c.is_complete())
        .enumerate()
        .map(|(i, c)| {
            let expr = format!("{} = {}", c.variable.trim(), c.value.trim());
            if i == 0 {
                expr
            } else {
                let connector = c.connector.as_deref().unwrap_or("AND").trim().to_uppercase();
                format!("{} {}", connector, expr)
            }
        })
        .collect();
    if parts.is_empty() {
        "no conditions provided".to_string()
    } else {
        parts.join(" ")
    }
}

fn state_label(state_name: &str) -> &str {
    let name = state_name.trim();
    if name.is_empty() {
        "{stateName}"
    } else {
        name
    }
}

/// Stage 4: annotation lines for the system composition and the user's assertions.
///
/// Starts with an empty line so it can be appended to the model-written parts.
pub fn assertion_annotations(structured_data: &StructuredData, assertions: &[Assertion]) -> String {
    let model_name = &structured_data.model_name;
    let mut lines = vec![String::new()];
    lines.extend(system_definition_line(model_name, &structured_data.interaction_mode));
    lines.push("// define **exactly** the following states and assertions as specified. Do **NOT** add, modify, or omit anything".to_string());

    for assertion in assertions {
        let subject = match assertion.component.as_deref().map(str::trim) {
            Some(component) if !component.is_empty() => format!("subsystem {}", component),
            _ => format!("{} system", model_name),
        };

        match assertion.assertion_type {
            AssertionType::DeadlockFree => lines.push(format!("// assert {} deadlockfree", subject)),
            AssertionType::Reachability => {
                let conditions = if assertion.reachability_type.trim().eq_ignore_ascii_case("customize") {
                    assertion.custom_description.clone()
                } else {
                    joined_conditions(&assertion.conditions)
                };
                let state = state_label(&assertion.state_name);
                lines.push(format!("// define {}: {}", state, conditions));
                lines.push(format!(
                    "// assert that the {} can reach the state \"{}\"",
                    subject,
                    assertion.state_name.trim()
                ));
            }
            AssertionType::Ltl => {
                let logic = assertion.ltl_logic.trim().replace('_', " ");
                match assertion.ltl_target.trim().to_lowercase().as_str() {
                    "customize" => lines.push(format!("// {}", assertion.custom_description)),
                    "action" => lines.push(format!(
                        "// assert that the {} will {} perform those actions \"{}\"",
                        subject,
                        logic,
                        assertion.selected_actions.join(", ")
                    )),
                    "state" => {
                        let conditions: Vec<String> = assertion
                            .conditions
                            .iter()
                            .filter(|c| c.is_complete())
                            .map(|c| format!("{} = {}", c.variable.trim(), c.value.trim()))
                            .collect();
                        let conditions = if conditions.is_empty() {
                            "no conditions provided".to_string()
                        } else {
                            conditions.join(" and ")
                        };
                        let state = state_label(&assertion.state_name);
                        lines.push(format!("// define {}: {}", state, conditions));
                        lines.push(format!(
                            "// assert that the {} will {} reach the state \"{}\"",
                            subject,
                            logic,
                            assertion.state_name.trim()
                        ));
                    }
                    _ => {}
                }
            }
            AssertionType::Other(_) => {}
        }
    }

    lines.join("\n")
}

/// Explain each mismatch so the model knows where to look
pub fn mismatch_feedback(mismatches: &[Mismatch]) -> String {
    let mut messages = Vec::new();

    for mismatch in mismatches {
        if !messages.is_empty() {
            messages.push("Apart from this, please also take note of the following mistake that we need to correct.".to_string());
        }
        let assertion = &mismatch.assertion;
        let current = mismatch.current_label();
        let desired = mismatch.desired_result;

        let message = if assertion.contains("deadlockfree") {
            format!(
                "The generated code does not satisfy the following property: {assertion}, meaning that the system is prone to deadlock, which is the opposite to the desired result. Through analyzing your current implementation, we identify that deadlock can be triggered by this trace: {trace}. Therefore, please analyze whether there are any states in the system that don't have any outgoing transitions, with a particular focus on the actions involved in the trace, and make sure that the system is deadlock-free. ",
                assertion = assertion,
                trace = mismatch.trace,
            )
        } else if mismatch.trace == INITIAL_TRACE {
            format!(
                "The generated code does not satisfy the following property: {assertion}, its current verification result is {current}, which is the opposite to the expected result of the desired system ({desired}). Through analyzing your current implementation, we identify that this assertion is violated after the initialization of the system. Therefore, please analyze the initial values of the variables involved in this assertion, and make sure that the initial values of the variables, the definitions of the constants which serve as the possible values of the variables are logically correct and will not lead to the assertion {assertion} being {current} with the initialization.",
                assertion = assertion,
                current = current,
                desired = desired,
            )
        } else {
            let actions = mismatch.trace_actions();
            let (last, earlier) = match actions.split_last() {
                Some((last, earlier)) => (*last, earlier.join(", ")),
                None => ("", String::new()),
            };
            format!(
                "The generated code does not satisfy the following property: {assertion}, its current verification result is {current}, which is the opposite to the expected result of the desired system ({desired}). Through analyzing your current implementation, we identify that this assertion is violated after performing the {last} action. Therefore, please carefully analyze if the guarded condition of performing the {last} action is weaker than it should be, possibly missing out some requirements for the action to be valid. If, after careful analysis, you think the problem is not with the {last} action, then carefully analyze these actions as well: {earlier}. Please make sure that the conditions of those actions happening are strict enough to not lead to the assertion {assertion} being {current}.",
                assertion = assertion,
                current = current,
                desired = desired,
                last = last,
                earlier = earlier,
            )
        };
        messages.push(message);
    }

    messages.join("\n")
}

/// Stage 8: ask for a corrected model, touching only what the feedback names
pub fn refine_code(current_code: &str, feedback: &str) -> String {
    format!(
        "You are an expert in PAT (Process Analysis Toolkit). Your task now is to refine your previously generated PAT code according to some suggestions.\n\nYour previously generated PAT code is as follows:\n{}\n\nThe logic that we can follow to refine our code to satisfy user requirements is:\n{}\n\nPlease refine and fix the PAT code so that it avoids the problems we mentioned, and only through modifying code relevant to our suggestions. **The other parts of code should not be changed to avoid syntax error, especially, NEVER remove semicolons.** Please provide the revised PAT code.",
        current_code, feedback
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ProcessActions, ProcessDefinition, Variable};
    use crate::verification::Outcome;

    #[test]
    fn test_classify_intent_embeds_input_and_catalog() {
        let prompt = classify_intent("two philosophers", "dining: Dining philosophers (loose match)");
        assert!(prompt.starts_with("User description: \"two philosophers\"."));
        assert!(prompt.contains("dining: Dining philosophers (loose match)"));
        for tag in ["customization-algorithm", "customization-system", "new system", "clarify"] {
            assert!(prompt.contains(&format!("\"type\": \"{}\"", tag)), "missing {}", tag);
        }
    }

    #[test]
    fn test_constants_prompt_mentions_mode_and_count() {
        let data = StructuredData::new("Counter", InteractionMode::Choice)
            .with_subsystem("Inc", "adds one")
            .with_subsystem("Dec", "removes one");
        let prompt = extract_constants_and_variables(&data, &data.processes_description());
        assert!(prompt.contains("each of the 2 processes described?"));
        assert!(prompt.contains("The interaction mode for the processes is choice"));
        assert!(prompt.contains("process 2: process name: Dec"));
        assert!(prompt.contains("\"processName\": \"Process 1\""));
        assert!(prompt.ends_with(VALID_JSON_REMINDER));
    }

    #[test]
    fn test_actions_prompt_embeds_tables_as_json() {
        let tables = ProcessTables::new(vec![ProcessDefinition::new("Door")
            .with_variable(Variable::int("door", &["0", "1"], "0"))]);
        let prompt = extract_actions("a door", &tables);
        assert!(prompt.starts_with("As an expert in reasoning and action extraction, analyze the following system: a door"));
        assert!(prompt.contains(r#""processName":"Door""#));
        assert!(prompt.contains("complex_composite_conditions"));
        assert!(prompt.contains("There should **NEVER** be any conditions inside \"state_changes\""));
    }

    #[test]
    fn test_generate_code_layout() {
        let example = RetrievedExample {
            nl: "// a counter".into(),
            code: "var c = 0;".into(),
        };
        let prompt = generate_code("info", "rules", &example, "desc", "// new system");
        assert!(prompt.contains("General Information: info"));
        assert!(prompt.contains("**Input NL Annotation:** // a counter"));
        assert!(prompt.contains("**Expected Output:** var c = 0;"));
        assert!(prompt.contains("### System Annotation:\n// new system\n\nThe PAT code should be:"));
        assert!(prompt.ends_with("### Response:"));
    }

    #[test]
    fn test_catalog_prompts() {
        assert!(describe_code("P() = skip;").ends_with(":\nP() = skip;"));
        assert!(name_algorithm_id("a car").contains("car_owner_key_door_motor"));
        assert!(name_algorithm("a car").ends_with("a car"));
    }

    #[test]
    fn test_sanitize_algorithm_id() {
        assert_eq!(sanitize_algorithm_id(" Car_Owner-Key Door!\n"), "car_ownerkeydoor");
        assert_eq!(sanitize_algorithm_id("'peterson_2'"), "peterson_2");
    }

    fn car() -> StructuredData {
        StructuredData::new("Car", InteractionMode::Interleaving)
    }

    #[test]
    fn test_annotation_prompts_embed_json() {
        let tables = ProcessTables::new(vec![ProcessDefinition::new("Owner")
            .with_variable(Variable::array("owner", &["near", "far"], "[far, far]"))]);
        let prompt = annotate_constants(&tables);
        assert!(prompt.contains(r#"// "N": number of owners in the system (set to 2)"#));
        assert!(prompt.ends_with(&serde_json::to_string(&tables).unwrap()));

        let actions = ActionTables {
            processes: vec![ProcessActions {
                process_name: "Owner".to_string(),
                actions: vec![Action::new("towards").when("owner", "far").then("owner", "near")],
            }],
        };
        let prompt = annotate_actions(&actions);
        assert!(prompt.contains(r#"// Definition of the "process_name" subsystem."#));
        assert!(prompt.contains(r#""action_name":"towards""#));
    }

    #[test]
    fn test_assertion_annotations() {
        let assertions = vec![
            Assertion::deadlock_free(),
            Assertion::reachability(
                "bothNear",
                vec![
                    StateCondition::new("owner[0]", "near"),
                    StateCondition::new("owner[1]", "near").joined_by("or"),
                    StateCondition::new("key", ""),
                ],
            )
            .for_component("Owner"),
            Assertion::ltl_actions("always_eventually", &["lock", "unlock"]),
            Assertion::ltl_state("eventually", "", vec![]),
        ];

        let text = assertion_annotations(&car(), &assertions);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "");
        assert!(lines[1].starts_with(r#"// define the Car system: overall system combining all the subsystems interleavingly ("|||")"#));
        assert!(lines[2].starts_with("// define **exactly** the following states"));
        assert_eq!(lines[3], "// assert Car system deadlockfree");
        assert_eq!(lines[4], "// define bothNear: owner[0] = near OR owner[1] = near");
        assert_eq!(lines[5], r#"// assert that the subsystem Owner can reach the state "bothNear""#);
        assert_eq!(lines[6], r#"// assert that the Car system will always eventually perform those actions "lock, unlock""#);
        assert_eq!(lines[7], "// define {stateName}: no conditions provided");
        assert_eq!(lines[8], r#"// assert that the Car system will eventually reach the state """#);
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn test_system_line_per_mode() {
        let skip = StructuredData::new("Solo", InteractionMode::Skip);
        let text = assertion_annotations(&skip, &[]);
        assert_eq!(text.lines().count(), 2);

        let custom = StructuredData::new("Bus", InteractionMode::Custom("riders queue".to_string()));
        assert!(assertion_annotations(&custom, &[])
            .contains("// define the Bus system following the description: riders queue"));

        let choice = StructuredData::new("Menu", InteractionMode::Choice);
        assert!(assertion_annotations(&choice, &[]).contains("(\"[]\")"));
    }

    #[test]
    fn test_mismatch_feedback_variants() {
        let deadlock = Mismatch {
            assertion: "#assert Car() deadlockfree;".to_string(),
            trace: "<init -> lock>".to_string(),
            current_result: Some(Outcome::Invalid),
            desired_result: Outcome::Valid,
        };
        let initial = Mismatch {
            assertion: "#assert Car() reaches open;".to_string(),
            trace: INITIAL_TRACE.to_string(),
            current_result: Some(Outcome::Valid),
            desired_result: Outcome::Invalid,
        };
        let guarded = Mismatch {
            assertion: "#assert Car() |= [] !crash;".to_string(),
            trace: "<init -> towards.0 -> open>".to_string(),
            current_result: Some(Outcome::Invalid),
            desired_result: Outcome::Valid,
        };

        let text = mismatch_feedback(&[deadlock, initial, guarded]);
        let parts: Vec<&str> = text.lines().collect();
        assert_eq!(parts.len(), 5);
        assert!(parts[0].contains("deadlock can be triggered by this trace: <init -> lock>"));
        assert!(parts[1].starts_with("Apart from this"));
        assert!(parts[2].contains("violated after the initialization of the system"));
        assert!(parts[2].contains("desired system (Invalid)"));
        assert!(parts[4].contains("after performing the open action"));
        assert!(parts[4].contains("these actions as well: init, towards.0."));
    }

    #[test]
    fn test_refine_prompt_layout() {
        let prompt = refine_code("P() = skip;", "fix the guard");
        assert!(prompt.contains("Your previously generated PAT code is as follows:\nP() = skip;\n\n"));
        assert!(prompt.contains("to satisfy user requirements is:\nfix the guard\n\n"));
        assert!(prompt.ends_with("Please provide the revised PAT code."));
    }
}
