// Intent classification contract

use crate::models::{AlgorithmReference, IntentClassification};
use crate::Result;

use super::{parse_reply, ContractReport, ContractViolation};

/// Check a classification against the catalog it was made from.
///
/// Customization answers must name a catalog entry, and the entry's match
/// type must agree with the answer: `customization-algorithm` needs a loose
/// match entry, `customization-system` an exact match entry.
pub fn validate_intent(
    intent: &IntentClassification,
    catalog: &[AlgorithmReference],
) -> ContractReport {
    let mut report = ContractReport::new("intent");

    if let (Some(id), Some(expected)) = (intent.algorithm_id(), intent.required_match_type()) {
        match catalog.iter().find(|entry| entry.id == id.trim()) {
            None => report.push(ContractViolation::UnknownAlgorithm(id.to_string())),
            Some(entry) if entry.match_type != expected => {
                report.push(ContractViolation::MatchTypeMismatch {
                    id: entry.id.clone(),
                    expected: expected.to_string(),
                    found: entry.match_type.to_string(),
                })
            }
            Some(_) => {}
        }
    }

    report
}

/// Parse and validate a reply to [`classify_intent`](crate::prompts::classify_intent)
pub fn parse_intent(reply: &str, catalog: &[AlgorithmReference]) -> Result<IntentClassification> {
    let intent: IntentClassification = parse_reply("intent", reply)?;
    validate_intent(&intent, catalog).into_result()?;
    Ok(intent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchType;

    fn catalog() -> Vec<AlgorithmReference> {
        vec![
            AlgorithmReference::new("peterson", MatchType::Loose, "Peterson's algorithm"),
            AlgorithmReference::new("car_owner_key_door", MatchType::Exact, "Keyless car"),
        ]
    }

    #[test]
    fn test_parse_valid_customization() {
        let reply = r#"```json
{"type": "customization-system", "algorithm": "car_owner_key_door", "description": "Keyless car"}
```"#;
        let intent = parse_intent(reply, &catalog()).unwrap();
        assert_eq!(intent.algorithm_id(), Some("car_owner_key_door"));
    }

    #[test]
    fn test_unknown_algorithm_is_reported() {
        let intent = IntentClassification::CustomizationAlgorithm {
            algorithm: "bakery".to_string(),
            description: String::new(),
        };
        let report = validate_intent(&intent, &catalog());
        assert_eq!(
            report.violations,
            vec![ContractViolation::UnknownAlgorithm("bakery".to_string())]
        );
    }

    #[test]
    fn test_match_type_must_agree() {
        let intent = IntentClassification::CustomizationSystem {
            algorithm: "peterson".to_string(),
            description: String::new(),
        };
        let report = validate_intent(&intent, &catalog());
        assert!(matches!(
            report.violations.as_slice(),
            [ContractViolation::MatchTypeMismatch { .. }]
        ));
    }

    #[test]
    fn test_new_system_and_clarify_need_no_catalog_entry() {
        for reply in [
            r#"{"type": "new system", "algorithm": "", "description": ""}"#,
            r#"{"type": "clarify", "algorithm": "", "description": ""}"#,
        ] {
            assert!(parse_intent(reply, &[]).is_ok());
        }
    }

    #[test]
    fn test_fifth_shape_is_rejected() {
        let err = parse_intent(r#"{"type": "other", "algorithm": ""}"#, &catalog()).unwrap_err();
        assert!(err.is_recoverable());
    }
}
