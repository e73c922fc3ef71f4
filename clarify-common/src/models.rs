//! Shared record models
//!
//! Row types for the upstream store tables read by the engine and the
//! query API. These records are created upstream and immutable here.

use crate::factors;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

/// One-per-proposition clarification analysis produced upstream
#[derive(Debug, Clone)]
pub struct ClarificationAnalysis {
    pub id: i64,
    pub proposition_id: i64,
    pub clarification_score: f64,
    pub needs_clarification: bool,
    /// Raw triggered-factor payload as stored (JSON list, JSON object,
    /// or bare string); normalization happens at the loader boundary
    pub triggered_factors: Option<String>,
    pub reasoning_log: Option<String>,
    pub model_used: Option<String>,
    pub validation_passed: bool,
    /// The 12 factor scores in table order (index 0 = factor id 1)
    pub factor_scores: [f64; factors::FACTOR_COUNT],
    pub created_at: Option<String>,
}

/// Column names of the 12 per-factor score columns, in id order
pub const FACTOR_SCORE_COLUMNS: [&str; factors::FACTOR_COUNT] = [
    "factor_1_identity",
    "factor_2_surveillance",
    "factor_3_intent",
    "factor_4_face_threat",
    "factor_5_over_positive",
    "factor_6_opacity",
    "factor_7_generalization",
    "factor_8_privacy",
    "factor_9_actor_observer",
    "factor_10_reputation",
    "factor_11_ambiguity",
    "factor_12_tone",
];

impl ClarificationAnalysis {
    /// Build from a row selecting all `clarification_analyses` columns
    pub fn from_row(row: &SqliteRow) -> Self {
        let mut factor_scores = [0.0; factors::FACTOR_COUNT];
        for (i, col) in FACTOR_SCORE_COLUMNS.iter().enumerate() {
            factor_scores[i] = row.get(*col);
        }
        let needs: i64 = row.get("needs_clarification");
        let valid: i64 = row.get("validation_passed");

        Self {
            id: row.get("id"),
            proposition_id: row.get("proposition_id"),
            clarification_score: row.get("clarification_score"),
            needs_clarification: needs != 0,
            triggered_factors: row.get("triggered_factors"),
            reasoning_log: row.get("reasoning_log"),
            model_used: row.get("model_used"),
            validation_passed: valid != 0,
            factor_scores,
            created_at: row.get("created_at"),
        }
    }

    /// Factor scores keyed by canonical factor name, in id order
    pub fn named_factor_scores(&self) -> Vec<(&'static str, f64)> {
        factors::FACTORS
            .iter()
            .map(|f| (f.name, self.factor_scores[(f.id - 1) as usize]))
            .collect()
    }
}

/// Stored clarifying question (this system's output table)
#[derive(Debug, Clone)]
pub struct StoredQuestion {
    pub id: i64,
    pub proposition_id: i64,
    pub analysis_id: Option<i64>,
    pub factor_name: String,
    pub factor_id: i64,
    pub factor_score: f64,
    pub question: String,
    pub reasoning: String,
    /// JSON-encoded list of evidence identifiers
    pub evidence: String,
    pub generation_method: String,
    pub model_used: Option<String>,
    pub validation_passed: bool,
    /// JSON-encoded list of validation warnings
    pub validation_warnings: String,
    pub created_at: Option<String>,
}

impl StoredQuestion {
    /// Build from a row selecting all `clarifying_questions` columns
    pub fn from_row(row: &SqliteRow) -> Self {
        let valid: i64 = row.get("validation_passed");
        Self {
            id: row.get("id"),
            proposition_id: row.get("proposition_id"),
            analysis_id: row.get("analysis_id"),
            factor_name: row.get("factor_name"),
            factor_id: row.get("factor_id"),
            factor_score: row.get("factor_score"),
            question: row.get("question"),
            reasoning: row.get("reasoning"),
            evidence: row.get("evidence"),
            generation_method: row.get("generation_method"),
            model_used: row.get("model_used"),
            validation_passed: valid != 0,
            validation_warnings: row.get("validation_warnings"),
            created_at: row.get("created_at"),
        }
    }
}
