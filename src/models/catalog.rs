// Known-algorithm catalog and intent classification

use serde::{Deserialize, Serialize};

/// How closely a catalog entry has to match the user's description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// The same components, tolerant of requirement deltas
    #[serde(rename = "exact match")]
    Exact,
    /// Any description of the same classical algorithm
    #[serde(rename = "loose match")]
    Loose,
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Exact => write!(f, "exact match"),
            MatchType::Loose => write!(f, "loose match"),
        }
    }
}

/// One entry of the algorithm database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmReference {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "matchtype")]
    pub match_type: MatchType,
    pub description: String,
    /// Name of the size parameter the entry can be instantiated with, if any
    #[serde(default)]
    pub variable: String,
    #[serde(default)]
    pub implementation: String,
}

impl AlgorithmReference {
    pub fn new(id: impl Into<String>, match_type: MatchType, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            match_type,
            description: description.into(),
            variable: String::new(),
            implementation: String::new(),
        }
    }

    /// The line this entry contributes to the classification prompt
    pub fn summary_line(&self) -> String {
        format!("{}: {} ({})", self.id, self.description, self.match_type)
    }
}

/// Render a catalog for the intent classification prompt, one entry per line
pub fn catalog_summary(entries: &[AlgorithmReference]) -> String {
    entries
        .iter()
        .map(AlgorithmReference::summary_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The four answers the intent classification prompt allows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntentClassification {
    /// A loose-match entry describes the classical algorithm the user wants
    #[serde(rename = "customization-algorithm")]
    CustomizationAlgorithm {
        algorithm: String,
        #[serde(default)]
        description: String,
    },
    /// An exact-match entry has the same components as the user's system
    #[serde(rename = "customization-system")]
    CustomizationSystem {
        algorithm: String,
        #[serde(default)]
        description: String,
    },
    /// Nothing in the catalog is close enough
    #[serde(rename = "new system")]
    NewSystem {
        #[serde(default)]
        algorithm: String,
        #[serde(default)]
        description: String,
    },
    /// The description is too vague to act on
    #[serde(rename = "clarify")]
    Clarify {
        #[serde(default)]
        algorithm: String,
        #[serde(default)]
        description: String,
    },
}

impl IntentClassification {
    pub fn type_tag(&self) -> &'static str {
        match self {
            IntentClassification::CustomizationAlgorithm { .. } => "customization-algorithm",
            IntentClassification::CustomizationSystem { .. } => "customization-system",
            IntentClassification::NewSystem { .. } => "new system",
            IntentClassification::Clarify { .. } => "clarify",
        }
    }

    /// Catalog id for the two customization answers
    pub fn algorithm_id(&self) -> Option<&str> {
        match self {
            IntentClassification::CustomizationAlgorithm { algorithm, .. }
            | IntentClassification::CustomizationSystem { algorithm, .. } => Some(algorithm),
            _ => None,
        }
    }

    /// Match type the referenced entry must carry for this answer to be consistent
    pub fn required_match_type(&self) -> Option<MatchType> {
        match self {
            IntentClassification::CustomizationAlgorithm { .. } => Some(MatchType::Loose),
            IntentClassification::CustomizationSystem { .. } => Some(MatchType::Exact),
            _ => None,
        }
    }
}

/// A retrieved (annotation, code) pair used as the one-shot example for code generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedExample {
    pub nl: String,
    pub code: String,
}
