// Verification units and verifier output
// Splits generated PAT code into one model per assertion and reads the verdicts back

//! # Verification
//!
//! The verifier checks one `#assert` per run. [`split_code_and_assertions`]
//! turns a generated model into one unit per assertion, and
//! [`parse_verification_output`] reads the verdict from the verifier's report.
//! Running the verifier itself is left to the host. [`find_mismatches`]
//! compares the verdicts with what the user expected; each [`Mismatch`]
//! carries the counterexample trace the refinement prompt explains.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

pub const RESULT_MARKER: &str = "********Verification Result********";
pub const SETTING_MARKER: &str = "********Verification Setting********";

/// Trace reported when no counterexample path is found in the result
pub const INITIAL_TRACE: &str = "<init>";

/// A run of `#define` lines directly followed by an `#assert` line.
/// Lines inside `//` comments never match because the directive must be the first token.
fn assertion_block() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| {
        Regex::new(r"(?m)(?:^[ \t]*#define[^\n]*\n)*^[ \t]*#assert[^\n]*")
            .expect("assertion block pattern is valid")
    })
}

fn verdict_word() -> &'static Regex {
    static VERDICT: OnceLock<Regex> = OnceLock::new();
    VERDICT.get_or_init(|| Regex::new(r"(?i)is\s+(\w+)").expect("verdict pattern is valid"))
}

/// Split `code` into one self-contained model per `#assert`.
///
/// Each unit is the code body (everything except the define/assert blocks),
/// a blank line, every `#define` that preceded any assertion (deduplicated,
/// first occurrence order) and finally that unit's assertion.
pub fn split_code_and_assertions(code: &str) -> Vec<String> {
    let pattern = assertion_block();
    let body = pattern.replace_all(code, "").trim().to_string();

    let mut defines: Vec<&str> = Vec::new();
    let mut seen = HashSet::new();
    let mut assertions = Vec::new();

    for block in pattern.find_iter(code) {
        let lines: Vec<&str> = block.as_str().lines().collect();
        let Some((assertion, preceding)) = lines.split_last() else {
            continue;
        };
        for line in preceding {
            let define = line.trim();
            if define.starts_with("#define") && seen.insert(define) {
                defines.push(define);
            }
        }
        assertions.push(assertion.trim());
    }

    assertions
        .into_iter()
        .map(|assertion| {
            let mut tail = defines.clone();
            tail.push(assertion);
            format!("{}\n\n{}", body, tail.join("\n"))
        })
        .collect()
}

/// The verdict the verifier reported for an assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Valid,
    Invalid,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Valid => write!(f, "Valid"),
            Outcome::Invalid => write!(f, "Invalid"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = crate::PatAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "valid" => Ok(Outcome::Valid),
            "invalid" => Ok(Outcome::Invalid),
            other => Err(crate::PatAgentError::InvalidInput(format!(
                "unknown outcome '{}'",
                other
            ))),
        }
    }
}

/// What the verifier said about one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub index: usize,
    pub assertion: String,
    pub pat_result: String,
    /// `None` when the report carried no recognizable verdict
    pub actual_result: Option<Outcome>,
}

impl VerificationResult {
    /// Build the result for unit `index` from its code and the verifier report
    pub fn from_report(index: usize, unit: &str, report: &str) -> Self {
        let (pat_result, actual_result) = parse_verification_output(report);
        Self {
            index,
            assertion: assertion_line(unit).unwrap_or_default().to_string(),
            pat_result,
            actual_result,
        }
    }

    /// Whether the verdict agrees with what the user expected
    pub fn matches(&self, desired: Outcome) -> bool {
        self.actual_result == Some(desired)
    }
}

/// First `#assert` line of a unit
pub fn assertion_line(unit: &str) -> Option<&str> {
    unit.lines()
        .map(str::trim)
        .find(|line| line.starts_with("#assert"))
}

/// Extract the result section of a verifier report and classify it.
///
/// Returns the trimmed text between the result and setting markers (empty if
/// either marker is missing) and the verdict: `Valid` when the word after the
/// first "is" is "valid", `Invalid` for any other word, `None` if there is none.
pub fn parse_verification_output(report: &str) -> (String, Option<Outcome>) {
    let section = match (report.find(RESULT_MARKER), report.find(SETTING_MARKER)) {
        (Some(start), Some(end)) if start + RESULT_MARKER.len() <= end => {
            report[start + RESULT_MARKER.len()..end].trim().to_string()
        }
        _ => String::new(),
    };

    let outcome = verdict_word()
        .captures(&section)
        .and_then(|caps| caps.get(1))
        .map(|word| {
            if word.as_str().eq_ignore_ascii_case("valid") {
                Outcome::Valid
            } else {
                Outcome::Invalid
            }
        });

    (section, outcome)
}

/// A verdict that disagrees with the expected one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mismatch {
    pub assertion: String,
    /// `<a -> b -> c>` counterexample, or [`INITIAL_TRACE`]
    pub trace: String,
    pub current_result: Option<Outcome>,
    pub desired_result: Outcome,
}

impl Mismatch {
    /// Action names along the trace, in order; empty for [`INITIAL_TRACE`]
    pub fn trace_actions(&self) -> Vec<&str> {
        if self.trace == INITIAL_TRACE {
            return Vec::new();
        }
        self.trace
            .trim_matches(|c| c == '<' || c == '>')
            .split("->")
            .map(str::trim)
            .collect()
    }

    /// Text for `current_result`; a missing verdict reads as undetermined
    pub fn current_label(&self) -> String {
        self.current_result
            .map(|outcome| outcome.to_string())
            .unwrap_or_else(|| "undetermined".to_string())
    }
}

/// First `<...->...>` line of a result section, else [`INITIAL_TRACE`]
pub fn counterexample_trace(pat_result: &str) -> String {
    pat_result
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('<') && line.contains("->"))
        .unwrap_or(INITIAL_TRACE)
        .to_string()
}

/// Compare each result with the expected verdict at the same position.
///
/// Results past the end of `desired` are expected to be valid.
pub fn find_mismatches(results: &[VerificationResult], desired: &[Outcome]) -> Vec<Mismatch> {
    results
        .iter()
        .enumerate()
        .filter_map(|(i, result)| {
            let desired_result = desired.get(i).copied().unwrap_or(Outcome::Valid);
            if result.matches(desired_result) {
                return None;
            }
            Some(Mismatch {
                assertion: result.assertion.clone(),
                trace: counterexample_trace(&result.pat_result),
                current_result: result.actual_result,
                desired_result,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &str = "var x = 0;
P() = inc{x = x + 1} -> P();
#define goal x == 2;
#assert P() reaches goal;
// #assert P() deadlockfree;
#define goal x == 2;
#define big x > 5;
#assert P() |= [] !big;
#assert P() deadlockfree;";

    #[test]
    fn test_split_one_unit_per_assertion() {
        let units = split_code_and_assertions(CODE);
        assert_eq!(units.len(), 3);

        let body = "var x = 0;\nP() = inc{x = x + 1} -> P();\n\n// #assert P() deadlockfree;";
        assert_eq!(
            units[0],
            format!("{}\n\n#define goal x == 2;\n#define big x > 5;\n#assert P() reaches goal;", body)
        );
        assert!(units[1].ends_with("#define big x > 5;\n#assert P() |= [] !big;"));
        assert!(units[2].ends_with("#assert P() deadlockfree;"));
        assert!(units.iter().all(|u| u.matches("#define goal").count() == 1));
    }

    #[test]
    fn test_split_without_assertions() {
        assert!(split_code_and_assertions("var x = 0;").is_empty());
    }

    #[test]
    fn test_parse_valid_report() {
        let report = format!(
            "header\n{}\nThe Assertion (P() deadlockfree) is VALID.\n{}\nsettings",
            RESULT_MARKER, SETTING_MARKER
        );
        let (section, outcome) = parse_verification_output(&report);
        assert_eq!(section, "The Assertion (P() deadlockfree) is VALID.");
        assert_eq!(outcome, Some(Outcome::Valid));
    }

    #[test]
    fn test_parse_invalid_and_missing_reports() {
        let report = format!(
            "{}\nThe Assertion (P() reaches goal) is NOT valid.\n{}",
            RESULT_MARKER, SETTING_MARKER
        );
        assert_eq!(parse_verification_output(&report).1, Some(Outcome::Invalid));
        assert_eq!(parse_verification_output("no markers"), (String::new(), None));
    }

    #[test]
    fn test_result_from_report() {
        let unit = "P() = skip;\n\n#assert P() deadlockfree;";
        let report = format!("{}\nis Valid\n{}", RESULT_MARKER, SETTING_MARKER);
        let result = VerificationResult::from_report(0, unit, &report);
        assert_eq!(result.assertion, "#assert P() deadlockfree;");
        assert!(result.matches(Outcome::Valid));
        assert!(!result.matches("invalid".parse().unwrap()));
    }

    fn result(assertion: &str, pat_result: &str, actual: Option<Outcome>) -> VerificationResult {
        VerificationResult {
            index: 0,
            assertion: assertion.to_string(),
            pat_result: pat_result.to_string(),
            actual_result: actual,
        }
    }

    #[test]
    fn test_find_mismatches_extracts_trace() {
        let results = vec![
            result("#assert P() deadlockfree;", "is Valid", Some(Outcome::Valid)),
            result(
                "#assert P() reaches goal;",
                "The Assertion is NOT valid.\nA counterexample is:\n  <init -> inc -> inc>\n",
                Some(Outcome::Invalid),
            ),
            result("#assert P() |= [] !big;", "", None),
        ];

        let mismatches = find_mismatches(&results, &[Outcome::Valid, Outcome::Valid]);
        assert_eq!(mismatches.len(), 2);
        assert_eq!(mismatches[0].trace, "<init -> inc -> inc>");
        assert_eq!(mismatches[0].trace_actions(), vec!["init", "inc", "inc"]);
        assert_eq!(mismatches[0].current_label(), "Invalid");
        assert_eq!(mismatches[1].trace, INITIAL_TRACE);
        assert!(mismatches[1].trace_actions().is_empty());
        assert_eq!(mismatches[1].current_label(), "undetermined");
        assert_eq!(mismatches[1].desired_result, Outcome::Valid);
    }

    #[test]
    fn test_expected_invalid_is_not_a_mismatch() {
        let results = vec![result("#assert P() reaches bad;", "is NOT valid", Some(Outcome::Invalid))];
        assert!(find_mismatches(&results, &[Outcome::Invalid]).is_empty());
        assert_eq!(find_mismatches(&results, &[]).len(), 1);
    }
}
