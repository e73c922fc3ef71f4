//! Flagged propositions and stored clarifying questions
//!
//! Read-only views over the store: the flagged-analysis listing a
//! dashboard renders, and the per-proposition question history. Raw
//! stored payloads (triggered factors, evidence, warnings) are decoded
//! for display; no validation happens here.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use clarify_common::models::{ClarificationAnalysis, StoredQuestion};
use serde::Serialize;
use serde_json::Value;
use sqlx::Row;
use std::collections::HashMap;
use tracing::debug;

use crate::{ApiError, ApiResult, AppState};

/// One flagged proposition with its analysis
#[derive(Debug, Serialize)]
pub struct FlaggedPropositionView {
    pub proposition_id: i64,
    pub text: String,
    pub clarification_score: f64,
    pub triggered_factors: Vec<String>,
    /// All 12 per-factor scores keyed by canonical name
    pub factor_scores: HashMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<String>,
}

/// One stored clarifying question
#[derive(Debug, Serialize)]
pub struct StoredQuestionView {
    pub id: i64,
    pub proposition_id: i64,
    pub factor: String,
    pub factor_score: f64,
    pub question: String,
    pub reasoning: String,
    pub evidence: Vec<String>,
    pub generation_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    pub validation_passed: bool,
    pub validation_warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// GET /api/propositions
///
/// Flagged propositions joined to their analyses, highest
/// clarification score first.
pub async fn list_flagged_propositions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<FlaggedPropositionView>>> {
    let rows = sqlx::query(
        r#"
        SELECT a.*, p.text AS prop_text
        FROM clarification_analyses a
        JOIN propositions p ON p.id = a.proposition_id
        WHERE a.needs_clarification = 1
        ORDER BY a.clarification_score DESC, a.id
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    debug!(count = rows.len(), "Listing flagged propositions");

    let views = rows
        .iter()
        .map(|row| {
            let analysis = ClarificationAnalysis::from_row(row);
            FlaggedPropositionView {
                proposition_id: analysis.proposition_id,
                text: row.get("prop_text"),
                clarification_score: analysis.clarification_score,
                triggered_factors: decode_factor_list(analysis.triggered_factors.as_deref()),
                factor_scores: analysis
                    .named_factor_scores()
                    .into_iter()
                    .map(|(name, score)| (name.to_string(), score))
                    .collect(),
                model_used: analysis.model_used,
                analyzed_at: analysis.created_at,
            }
        })
        .collect();

    Ok(Json(views))
}

/// GET /api/propositions/:id/questions
///
/// Stored clarifying questions for one proposition, newest first.
/// 404 when the proposition does not exist.
pub async fn list_proposition_questions(
    State(state): State<AppState>,
    Path(proposition_id): Path<i64>,
) -> ApiResult<Json<Vec<StoredQuestionView>>> {
    let exists = sqlx::query("SELECT id FROM propositions WHERE id = ?")
        .bind(proposition_id)
        .fetch_optional(&state.db)
        .await?;
    if exists.is_none() {
        return Err(ApiError::NotFound(format!(
            "proposition {} not found",
            proposition_id
        )));
    }

    let rows = sqlx::query(
        r#"
        SELECT * FROM clarifying_questions
        WHERE proposition_id = ?
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(proposition_id)
    .fetch_all(&state.db)
    .await?;

    let views = rows
        .iter()
        .map(|row| {
            let question = StoredQuestion::from_row(row);
            StoredQuestionView {
                id: question.id,
                proposition_id: question.proposition_id,
                factor: question.factor_name,
                factor_score: question.factor_score,
                question: question.question,
                reasoning: question.reasoning,
                evidence: decode_string_list(&question.evidence),
                generation_method: question.generation_method,
                model_used: question.model_used,
                validation_passed: question.validation_passed,
                validation_warnings: decode_string_list(&question.validation_warnings),
                created_at: question.created_at,
            }
        })
        .collect();

    Ok(Json(views))
}

/// Decode a stored triggered-factor payload for display
///
/// Historical shapes: JSON list, JSON object with a `factors` key, or a
/// bare string. Undecodable payloads render as an empty list.
fn decode_factor_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect(),
        Ok(Value::Object(map)) => match map.get("factors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => Vec::new(),
        },
        Ok(Value::String(s)) => vec![s],
        _ => vec![raw.to_string()],
    }
}

/// Decode a JSON-encoded string list column
fn decode_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

/// Build proposition routes
pub fn proposition_routes() -> Router<AppState> {
    Router::new()
        .route("/api/propositions", get(list_flagged_propositions))
        .route(
            "/api/propositions/:id/questions",
            get(list_proposition_questions),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_factor_list_shapes() {
        assert_eq!(
            decode_factor_list(Some(r#"["privacy", "opacity"]"#)),
            vec!["privacy", "opacity"]
        );
        assert_eq!(
            decode_factor_list(Some(r#"{"factors": ["ambiguity"]}"#)),
            vec!["ambiguity"]
        );
        assert_eq!(decode_factor_list(Some("privacy")), vec!["privacy"]);
        assert!(decode_factor_list(None).is_empty());
    }

    #[test]
    fn test_decode_string_list() {
        assert_eq!(decode_string_list(r#"["a", "b"]"#), vec!["a", "b"]);
        assert!(decode_string_list("not json").is_empty());
    }
}
