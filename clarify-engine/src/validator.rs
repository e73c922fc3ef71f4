//! Validator
//!
//! Two checks per generated result: structural completeness (question
//! and reasoning non-empty) and groundedness (every cited evidence id
//! exists among the proposition's observations). A failing validation
//! never discards the result; violations are recorded and attached so
//! low-quality generations stay inspectable.

use crate::types::GeneratedQuestion;
use std::collections::HashSet;

/// Validate one generated result against the available observation ids
///
/// Returns the pass flag and an ordered list of human-readable
/// violation descriptions (structural first, then one per ungrounded
/// citation in citation order).
pub fn validate_output(
    result: &GeneratedQuestion,
    available_observation_ids: &HashSet<String>,
) -> (bool, Vec<String>) {
    let mut violations = Vec::new();

    if result.question.trim().is_empty() {
        violations.push("Question text is empty".to_string());
    }
    if result.reasoning.trim().is_empty() {
        violations.push("Reasoning text is empty".to_string());
    }

    for evidence_id in &result.evidence {
        if !available_observation_ids.contains(evidence_id) {
            violations.push(format!(
                "Cited evidence '{}' has no matching observation",
                evidence_id
            ));
        }
    }

    (violations.is_empty(), violations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(question: &str, reasoning: &str, evidence: &[&str]) -> GeneratedQuestion {
        GeneratedQuestion {
            question: question.to_string(),
            reasoning: reasoning.to_string(),
            evidence: evidence.iter().map(|s| s.to_string()).collect(),
            method: "test".to_string(),
        }
    }

    fn available(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_output_passes() {
        let result = generated("Q?", "because", &["a", "b"]);
        let (passed, violations) = validate_output(&result, &available(&["a", "b", "c"]));
        assert!(passed);
        assert!(violations.is_empty());
    }

    #[test]
    fn test_empty_question_fails() {
        let result = generated("", "because", &[]);
        let (passed, violations) = validate_output(&result, &available(&[]));
        assert!(!passed);
        assert_eq!(violations, vec!["Question text is empty"]);
    }

    #[test]
    fn test_whitespace_reasoning_fails() {
        let result = generated("Q?", "   ", &[]);
        let (passed, violations) = validate_output(&result, &available(&[]));
        assert!(!passed);
        assert_eq!(violations, vec!["Reasoning text is empty"]);
    }

    #[test]
    fn test_ungrounded_evidence_fails() {
        let result = generated("Q?", "because", &["a", "ghost", "b"]);
        let (passed, violations) = validate_output(&result, &available(&["a", "b"]));
        assert!(!passed);
        assert_eq!(
            violations,
            vec!["Cited evidence 'ghost' has no matching observation"]
        );
    }

    #[test]
    fn test_no_evidence_is_structurally_valid() {
        // Citing nothing violates no groundedness constraint
        let result = generated("Q?", "because", &[]);
        let (passed, _) = validate_output(&result, &available(&[]));
        assert!(passed);
    }

    #[test]
    fn test_violation_order_structural_then_groundedness() {
        let result = generated("", "because", &["ghost"]);
        let (passed, violations) = validate_output(&result, &available(&[]));
        assert!(!passed);
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0], "Question text is empty");
        assert!(violations[1].starts_with("Cited evidence"));
    }
}
