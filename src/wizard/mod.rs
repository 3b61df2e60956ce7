// Wizard orchestrator
// Walks a system description through the eight stages, one validated model reply at a time

//! # Wizard
//!
//! [`Wizard`] ties the prompt library, a [`ModelGateway`] and the contract
//! boundary together. Every stage that consults the model follows the same
//! loop:
//!
//! 1. Build the prompt from [`crate::prompts`]
//! 2. Send it through the gateway
//! 3. Parse and validate the reply with [`crate::contracts`]
//! 4. On a recoverable failure, re-prompt with the violations appended
//!
//! Stage changes are published as [`StoreEvent::StepChanged`], so whatever
//! renders the [`Timeline`](crate::widgets::Timeline) follows along.
//!
//! ## Rust Learning Notes:
//!
//! ### Trait Objects
//! The gateway is held as `Arc<dyn ModelGateway>`, so tests can drive the
//! wizard with a scripted gateway and the CLI can pick remote or direct
//! access at runtime.

pub mod gateway;

pub use gateway::{DirectGateway, ModelGateway, RemoteGateway};

use std::sync::Arc;
use tracing::{info, warn};

use crate::contracts::{extract_longest_code_block, parse_actions, parse_intent, parse_tables};
use crate::models::{
    catalog::catalog_summary, ActionTables, AlgorithmReference, Assertion, HistoryChannel,
    IntentClassification, ProcessTables, RetrievedExample, StructuredData,
};
use crate::prompts;
use crate::store::{Store, StoreEvent};
use crate::verification::{find_mismatches, split_code_and_assertions, Mismatch, VerificationResult};
use crate::widgets::TimelineStage;
use crate::{PatAgentError, Result};

pub const DEFAULT_MAX_ATTEMPTS: usize = 2;

/// Inputs for the code generation stage
#[derive(Debug, Clone, Default)]
pub struct CodeRequest {
    pub general_info: String,
    pub pitfalls_rules: String,
    /// Annotation to generate from; the one built by [`Wizard::annotate`] when empty
    pub nl_instruction: String,
    /// Worked example; retrieved through the gateway when absent
    pub example: Option<RetrievedExample>,
}

impl CodeRequest {
    pub fn new(nl_instruction: impl Into<String>) -> Self {
        Self {
            nl_instruction: nl_instruction.into(),
            ..Self::default()
        }
    }

    pub fn with_reference(
        mut self,
        general_info: impl Into<String>,
        pitfalls_rules: impl Into<String>,
    ) -> Self {
        self.general_info = general_info.into();
        self.pitfalls_rules = pitfalls_rules.into();
        self
    }

    pub fn with_example(mut self, example: RetrievedExample) -> Self {
        self.example = Some(example);
        self
    }
}

/// One wizard run
pub struct Wizard {
    gateway: Arc<dyn ModelGateway>,
    store: Store,
    max_attempts: usize,
    catalog: Vec<AlgorithmReference>,
    structured: Option<StructuredData>,
    intent: Option<IntentClassification>,
    tables: Option<ProcessTables>,
    actions: Option<ActionTables>,
    annotation: Option<String>,
    code: Option<String>,
}

impl Wizard {
    pub fn new(gateway: Arc<dyn ModelGateway>, store: Store) -> Self {
        Self {
            gateway,
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            catalog: Vec::new(),
            structured: None,
            intent: None,
            tables: None,
            actions: None,
            annotation: None,
            code: None,
        }
    }

    /// Total tries per stage, first prompt included. At least one.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_catalog(mut self, catalog: Vec<AlgorithmReference>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn stage(&self) -> TimelineStage {
        self.store.snapshot().await.timeline.current_stage()
    }

    /// Move the timeline to `stage`
    pub async fn enter(&self, stage: TimelineStage) {
        info!("Wizard entering stage {}", stage);
        self.store.apply(StoreEvent::StepChanged(stage)).await;
    }

    /// Move to the stage after the current one
    pub async fn advance(&self) -> Result<TimelineStage> {
        let next = self.stage().await.next().ok_or_else(|| {
            PatAgentError::InvalidInput("already at the last stage".to_string())
        })?;
        self.enter(next).await;
        Ok(next)
    }

    /// Stage 1: classify the user's description against the catalog
    pub async fn classify(&mut self, user_input: &str) -> Result<IntentClassification> {
        if user_input.trim().is_empty() {
            return Err(PatAgentError::InvalidInput("empty system description".to_string()));
        }
        self.enter(TimelineStage::InformationCollection).await;

        if self.catalog.is_empty() {
            self.catalog = self.gateway.algorithms().await?;
        }

        let prompt = prompts::classify_intent(user_input, &catalog_summary(&self.catalog));
        let catalog = &self.catalog;
        let intent = self
            .ask_validated(prompt, HistoryChannel::Skip, |reply| parse_intent(reply, catalog))
            .await?;

        info!("Classified description as {}", intent.type_tag());
        self.intent = Some(intent.clone());
        Ok(intent)
    }

    /// Stage 2: constants and variables per process
    pub async fn extract_tables(&mut self, data: StructuredData) -> Result<ProcessTables> {
        if data.subsystems.is_empty() {
            return Err(PatAgentError::InvalidInput("no processes entered".to_string()));
        }
        self.enter(TimelineStage::ConstantsAndVariables).await;

        let prompt = prompts::extract_constants_and_variables(&data, &data.processes_description());
        let tables = self
            .ask_validated(prompt, HistoryChannel::Const, |reply| parse_tables(reply, &data))
            .await?;

        self.structured = Some(data);
        self.tables = Some(tables.clone());
        // New tables invalidate anything derived from the old ones
        self.actions = None;
        self.annotation = None;
        Ok(tables)
    }

    /// Stage 3: actions, checked against the tables from stage 2
    pub async fn extract_actions(&mut self) -> Result<ActionTables> {
        let (data, tables) = match (&self.structured, &self.tables) {
            (Some(data), Some(tables)) => (data, tables),
            _ => {
                return Err(PatAgentError::InvalidInput(
                    "constants and variables must be extracted first".to_string(),
                ))
            }
        };
        self.enter(TimelineStage::Actions).await;

        let prompt = prompts::extract_actions(&data.system_description(), tables);
        let actions = self
            .ask_validated(prompt, HistoryChannel::Action, |reply| parse_actions(reply, tables))
            .await?;

        self.actions = Some(actions.clone());
        self.annotation = None;
        Ok(actions)
    }

    /// Stages 4 and 5: record the assertions and build the code generation annotation.
    ///
    /// The model annotates the tables and the actions; the assertion lines are
    /// rendered locally. The three parts are joined by newlines.
    pub async fn annotate(&mut self, assertions: Vec<Assertion>) -> Result<String> {
        let (Some(data), Some(tables), Some(actions)) =
            (&mut self.structured, &self.tables, &self.actions)
        else {
            return Err(PatAgentError::InvalidInput(
                "actions must be extracted before annotating".to_string(),
            ));
        };
        data.assertions = assertions;
        let assertion_lines = prompts::assertion_annotations(data, &data.assertions);
        let assertion_count = data.assertions.len();
        let constants_prompt = prompts::annotate_constants(tables);
        let actions_prompt = prompts::annotate_actions(actions);

        self.enter(TimelineStage::Assertions).await;
        self.enter(TimelineStage::NlAnnotation).await;
        let constants = self.gateway.ask(&constants_prompt, HistoryChannel::Skip).await?;
        let action_lines = self.gateway.ask(&actions_prompt, HistoryChannel::Skip).await?;

        let annotation = format!("{}\n{}\n{}", constants.trim(), action_lines.trim(), assertion_lines);
        info!("Annotation built with {} assertions", assertion_count);
        self.annotation = Some(annotation.clone());
        Ok(annotation)
    }

    /// Stage 6: one-shot code generation; the reply's longest code block is kept
    pub async fn generate_code(&mut self, mut request: CodeRequest) -> Result<String> {
        if request.nl_instruction.trim().is_empty() {
            request.nl_instruction = self
                .annotation
                .clone()
                .ok_or_else(|| PatAgentError::InvalidInput("empty annotation".to_string()))?;
        }
        self.enter(TimelineStage::CodeGeneration).await;

        let example = match request.example {
            Some(example) => example,
            None => self
                .gateway
                .retrieve_example(&request.nl_instruction)
                .await?
                .ok_or_else(|| {
                    PatAgentError::NotFound("no example available for code generation".to_string())
                })?,
        };

        let system_description = self
            .structured
            .as_ref()
            .map(StructuredData::system_description)
            .unwrap_or_default();

        let prompt = prompts::generate_code(
            &request.general_info,
            &request.pitfalls_rules,
            &example,
            &system_description,
            &request.nl_instruction,
        );
        let code = self
            .ask_validated(prompt, HistoryChannel::Default, code_block)
            .await?;

        self.code = Some(code.clone());
        Ok(code)
    }

    /// Stage 7: one verification unit per assertion of the generated code
    pub async fn verification_units(&self) -> Result<Vec<String>> {
        let code = self.code.as_deref().ok_or_else(|| {
            PatAgentError::InvalidInput("no code has been generated".to_string())
        })?;
        self.enter(TimelineStage::Verification).await;

        let units = split_code_and_assertions(code);
        if units.is_empty() {
            return Err(PatAgentError::InvalidInput(
                "generated code has no #assert".to_string(),
            ));
        }
        Ok(units)
    }

    /// Verdicts that differ from the expected outcome of the matching assertion.
    ///
    /// One result per recorded assertion is required; without recorded
    /// assertions every property is expected to hold.
    pub fn mismatches(&self, results: &[VerificationResult]) -> Result<Vec<Mismatch>> {
        let assertions = self
            .structured
            .as_ref()
            .map(|data| data.assertions.as_slice())
            .unwrap_or_default();
        if !assertions.is_empty() && assertions.len() != results.len() {
            return Err(PatAgentError::InvalidInput(format!(
                "{} verification results for {} assertions",
                results.len(),
                assertions.len()
            )));
        }
        let desired: Vec<_> = assertions.iter().map(|a| a.assertion_truth).collect();
        Ok(find_mismatches(results, &desired))
    }

    /// Stage 8: ask the model to fix the code so the mismatched properties hold.
    ///
    /// Nothing to fix returns the current code without consulting the model.
    pub async fn refine(&mut self, mismatches: &[Mismatch]) -> Result<String> {
        let code = self.code.clone().ok_or_else(|| {
            PatAgentError::InvalidInput("no code has been generated".to_string())
        })?;
        if mismatches.is_empty() {
            return Ok(code);
        }
        self.enter(TimelineStage::Refinement).await;

        let prompt = prompts::refine_code(&code, &prompts::mismatch_feedback(mismatches));
        let refined = self
            .ask_validated(prompt, HistoryChannel::Default, code_block)
            .await?;

        info!("Refined code for {} mismatches", mismatches.len());
        self.code = Some(refined.clone());
        Ok(refined)
    }

    /// Replace the code with one edited outside the wizard
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = Some(code.into());
    }

    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    pub fn intent(&self) -> Option<&IntentClassification> {
        self.intent.as_ref()
    }

    pub fn tables(&self) -> Option<&ProcessTables> {
        self.tables.as_ref()
    }

    pub fn actions(&self) -> Option<&ActionTables> {
        self.actions.as_ref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    async fn ask_validated<T, F>(&self, prompt: String, channel: HistoryChannel, parse: F) -> Result<T>
    where
        F: Fn(&str) -> Result<T>,
    {
        let mut current = prompt.clone();
        let mut attempt = 1;

        loop {
            let reply = self.gateway.ask(&current, channel).await?;
            match parse(&reply) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_recoverable() && attempt < self.max_attempts => {
                    warn!("Attempt {} rejected: {}", attempt, err);
                    current = reprompt(&prompt, &err);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// The reply's longest code block; a reply without code is re-prompted
fn code_block(reply: &str) -> Result<String> {
    let code = extract_longest_code_block(reply);
    if code.trim().is_empty() {
        Err(PatAgentError::Parse("reply contains no code".to_string()))
    } else {
        Ok(code)
    }
}

fn reprompt(prompt: &str, err: &PatAgentError) -> String {
    format!(
        "{}\n\nYour previous answer was rejected:\n{}\nPlease answer again and follow every requirement above.",
        prompt, err
    )
}
