// Example retrieval for one-shot code generation
// TF-IDF cosine similarity between the new annotation and the annotated examples

use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

use crate::models::RetrievedExample;
use crate::{PatAgentError, Result};

/// Words of two or more word characters, lowercased
fn tokens(text: &str) -> Vec<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid regex"))
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Annotated examples searchable by annotation text
#[derive(Debug, Clone, Default)]
pub struct ExampleIndex {
    examples: Vec<RetrievedExample>,
}

impl ExampleIndex {
    /// Entries without an annotation are dropped
    pub fn new(examples: Vec<RetrievedExample>) -> Self {
        Self {
            examples: examples
                .into_iter()
                .filter(|e| !e.nl.trim().is_empty())
                .collect(),
        }
    }

    /// Read a JSON array of `{nl, code}` entries
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PatAgentError::Configuration(format!("example database {}: {}", path.display(), e))
        })?;
        let examples: Vec<RetrievedExample> = serde_json::from_str(&text)?;
        debug!("Loaded {} examples from {}", examples.len(), path.display());
        Ok(Self::new(examples))
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// The example whose annotation is closest to `instruction`.
    ///
    /// The vocabulary and document frequencies are fitted over all annotations
    /// plus the instruction; idf is smoothed (`ln((1 + n) / (1 + df)) + 1`)
    /// and vectors are L2-normalized. Ties go to the earliest example.
    pub fn most_relevant(&self, instruction: &str) -> Option<&RetrievedExample> {
        if self.examples.is_empty() {
            return None;
        }

        let mut documents: Vec<Vec<String>> = self.examples.iter().map(|e| tokens(&e.nl)).collect();
        documents.push(tokens(instruction));

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for document in &documents {
            let mut seen: Vec<&str> = document.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *document_frequency.entry(term).or_default() += 1;
            }
        }

        let n = documents.len() as f64;
        let idf: HashMap<&str, f64> = document_frequency
            .iter()
            .map(|(term, df)| (*term, ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0))
            .collect();

        let query = tf_idf(&documents[documents.len() - 1], &idf);
        let mut best = 0;
        let mut best_score = f64::MIN;
        for (i, document) in documents[..documents.len() - 1].iter().enumerate() {
            let vector = tf_idf(document, &idf);
            let score: f64 = query
                .iter()
                .filter_map(|(term, w)| vector.get(*term).map(|v| v * w))
                .sum();
            if score > best_score {
                best = i;
                best_score = score;
            }
        }

        self.examples.get(best)
    }
}

/// L2-normalized term-frequency times idf weights of one document
fn tf_idf<'a>(document: &'a [String], idf: &HashMap<&str, f64>) -> HashMap<&'a str, f64> {
    let mut weights: HashMap<&str, f64> = HashMap::new();
    for term in document {
        *weights.entry(term.as_str()).or_default() += 1.0;
    }
    for (term, weight) in weights.iter_mut() {
        *weight *= idf.get(*term).copied().unwrap_or(0.0);
    }
    let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        weights.values_mut().for_each(|w| *w /= norm);
    }
    weights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example(nl: &str, code: &str) -> RetrievedExample {
        RetrievedExample {
            nl: nl.to_string(),
            code: code.to_string(),
        }
    }

    fn index() -> ExampleIndex {
        ExampleIndex::new(vec![
            example("", "ignored"),
            example("A philosopher picks up the left fork then the right fork", "Phil()"),
            example("The owner unlocks the car door with the key", "Owner()"),
            example("A reader and a writer share a buffer", "Reader()"),
        ])
    }

    #[test]
    fn test_empty_annotations_dropped() {
        assert_eq!(index().len(), 3);
        assert!(ExampleIndex::default().most_relevant("anything").is_none());
    }

    #[test]
    fn test_most_relevant_by_shared_terms() {
        let index = index();
        assert_eq!(index.most_relevant("door key of the car").unwrap().code, "Owner()");
        assert_eq!(index.most_relevant("forks for philosophers? fork").unwrap().code, "Phil()");
    }

    #[test]
    fn test_no_overlap_falls_back_to_first() {
        assert_eq!(index().most_relevant("zzz qqq").unwrap().code, "Phil()");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("examples.json");
        std::fs::write(&path, r#"[{"nl": "a writer writes", "code": "Writer()"}]"#).unwrap();

        let index = ExampleIndex::load(&path).unwrap();
        assert_eq!(index.most_relevant("writer").unwrap().code, "Writer()");
        assert!(ExampleIndex::load(dir.path().join("missing.json")).is_err());
    }
}
