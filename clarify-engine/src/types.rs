//! Canonical types for the question pipeline
//!
//! Input adapters normalize every source into `FlaggedProposition`;
//! nothing shaped like the raw input crosses the loader boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Where an observation record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObservationSource {
    /// Real content from the persistent store
    Store,
    /// Synthesized from a textual preview in a file export
    Preview,
    /// Placeholder for an observation whose content was not exported
    Placeholder,
}

impl ObservationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationSource::Store => "store",
            ObservationSource::Preview => "preview",
            ObservationSource::Placeholder => "placeholder",
        }
    }
}

/// One piece of evidence backing a proposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Identifier; store ids render in decimal, synthesized ids are
    /// `preview_{prop_id}_{index}`
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub source: ObservationSource,
}

/// Canonical flagged proposition (loader output, generator input)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedProposition {
    pub prop_id: i64,
    pub prop_text: String,
    /// Validated factor names, in original order; never empty
    pub triggered_factors: Vec<String>,
    /// Bounded evidence list, at most 5 records, most recent first
    pub observations: Vec<ObservationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prop_reasoning: Option<String>,
    /// Per-factor scores when the source carried them
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub factor_scores: HashMap<String, f64>,
    /// Aggregate score from the upstream analysis (store source only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_score: Option<f64>,
}

impl FlaggedProposition {
    /// Score recorded for one factor, 0.0 when unknown
    pub fn factor_score(&self, factor_name: &str) -> f64 {
        self.factor_scores.get(factor_name).copied().unwrap_or(0.0)
    }

    /// Identifiers of the observations available for groundedness checks
    pub fn observation_ids(&self) -> std::collections::HashSet<String> {
        self.observations.iter().map(|o| o.id.clone()).collect()
    }
}

/// Raw output of one reasoning-service call
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedQuestion {
    pub question: String,
    pub reasoning: String,
    /// Cited observation identifiers
    pub evidence: Vec<String>,
    /// Generation-method tag reported by the service
    pub method: String,
}

/// One fully processed (proposition, factor) pair; one sink line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResult {
    pub prop_id: i64,
    pub factor: String,
    pub question: String,
    pub reasoning: String,
    pub evidence: Vec<String>,
    pub method: String,
    pub prop_text: String,
    /// Generation time, RFC 3339
    pub timestamp: String,
    pub factor_score: f64,
    pub validation_passed: bool,
    pub validation_warnings: Vec<String>,
}

/// Failure category for run statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Reasoning-service call failed; terminal for the pair
    Generation,
    /// Structural or groundedness violation; pair still emitted
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Generation => write!(f, "generation"),
            ErrorCategory::Validation => write!(f, "validation"),
        }
    }
}

/// One recorded per-pair failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub prop_id: i64,
    pub factor: String,
    pub error: String,
    pub category: ErrorCategory,
}

/// Run-scoped counters, folded pair by pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub total_processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub validation_errors: usize,
    pub generation_errors: usize,
}

/// Staging outcome when a store connection was supplied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingReport {
    /// Records added to the caller's transaction
    pub staged: usize,
    /// Duplicates, unresolvable factors, incomplete records, store errors
    pub skipped: usize,
}

/// Final pipeline summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub stats: RunStats,
    /// Durable sink location
    pub output_file: PathBuf,
    pub elapsed_seconds: f64,
    pub failures: Vec<FailureRecord>,
    /// Present when persistence staging ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging: Option<StagingReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prop() -> FlaggedProposition {
        FlaggedProposition {
            prop_id: 7,
            prop_text: "User prefers dark mode".to_string(),
            triggered_factors: vec!["opacity".to_string()],
            observations: vec![ObservationRecord {
                id: "preview_7_0".to_string(),
                text: "switched theme at 23:10".to_string(),
                timestamp: None,
                source: ObservationSource::Preview,
            }],
            prop_reasoning: None,
            factor_scores: HashMap::from([("opacity".to_string(), 0.8)]),
            clarification_score: None,
        }
    }

    #[test]
    fn test_factor_score_lookup() {
        let prop = sample_prop();
        assert_eq!(prop.factor_score("opacity"), 0.8);
        assert_eq!(prop.factor_score("privacy"), 0.0);
    }

    #[test]
    fn test_observation_ids() {
        let prop = sample_prop();
        assert!(prop.observation_ids().contains("preview_7_0"));
        assert_eq!(prop.observation_ids().len(), 1);
    }

    #[test]
    fn test_error_category_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCategory::Generation).unwrap(),
            "\"generation\""
        );
        assert_eq!(ErrorCategory::Validation.to_string(), "validation");
    }

    #[test]
    fn test_pair_result_sink_fields() {
        let result = PairResult {
            prop_id: 1,
            factor: "surveillance".to_string(),
            question: "Q?".to_string(),
            reasoning: "R".to_string(),
            evidence: vec!["preview_1_0".to_string()],
            method: "llm_single_call".to_string(),
            prop_text: "text".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            factor_score: 0.5,
            validation_passed: true,
            validation_warnings: vec![],
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
        for key in [
            "prop_id",
            "factor",
            "question",
            "reasoning",
            "evidence",
            "method",
            "prop_text",
            "timestamp",
            "factor_score",
            "validation_passed",
            "validation_warnings",
        ] {
            assert!(json.get(key).is_some(), "missing sink field: {}", key);
        }
    }
}
