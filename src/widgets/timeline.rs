// Timeline stepper for the eight wizard stages

use serde::{Deserialize, Serialize};

use crate::{PatAgentError, Result};

/// The fixed stages of the wizard, numbered 1 to 8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimelineStage {
    InformationCollection = 1,
    ConstantsAndVariables = 2,
    Actions = 3,
    Assertions = 4,
    NlAnnotation = 5,
    CodeGeneration = 6,
    Verification = 7,
    Refinement = 8,
}

impl TimelineStage {
    pub const ALL: [TimelineStage; 8] = [
        TimelineStage::InformationCollection,
        TimelineStage::ConstantsAndVariables,
        TimelineStage::Actions,
        TimelineStage::Assertions,
        TimelineStage::NlAnnotation,
        TimelineStage::CodeGeneration,
        TimelineStage::Verification,
        TimelineStage::Refinement,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn from_number(step: u8) -> Option<Self> {
        Self::ALL.get((step as usize).checked_sub(1)?).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            TimelineStage::InformationCollection => "Information Collection",
            TimelineStage::ConstantsAndVariables => "Constants & Variables",
            TimelineStage::Actions => "Actions",
            TimelineStage::Assertions => "Assertions",
            TimelineStage::NlAnnotation => "NL Annotation",
            TimelineStage::CodeGeneration => "Code Generation",
            TimelineStage::Verification => "Verification",
            TimelineStage::Refinement => "Refinement",
        }
    }

    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }
}

impl std::fmt::Display for TimelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.number(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Past,
    Current,
    Future,
}

/// A pure function of `current_step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    current: TimelineStage,
}

impl Timeline {
    /// Steps outside 1..=8 are rejected
    pub fn new(current_step: u8) -> Result<Self> {
        TimelineStage::from_number(current_step)
            .map(Self::at)
            .ok_or_else(|| {
                PatAgentError::InvalidInput(format!(
                    "timeline step must be between 1 and 8, got {}",
                    current_step
                ))
            })
    }

    pub fn at(current: TimelineStage) -> Self {
        Self { current }
    }

    pub fn current_step(&self) -> u8 {
        self.current.number()
    }

    pub fn current_stage(&self) -> TimelineStage {
        self.current
    }

    pub fn status(&self, stage: TimelineStage) -> StepStatus {
        match stage.cmp(&self.current) {
            std::cmp::Ordering::Less => StepStatus::Past,
            std::cmp::Ordering::Equal => StepStatus::Current,
            std::cmp::Ordering::Greater => StepStatus::Future,
        }
    }

    /// All eight stages in order with their status
    pub fn steps(&self) -> Vec<(TimelineStage, StepStatus)> {
        TimelineStage::ALL
            .iter()
            .map(|&stage| (stage, self.status(stage)))
            .collect()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::at(TimelineStage::InformationCollection)
    }
}
