//! Persistence staging
//!
//! Stages clarifying-question records into the caller-supplied
//! transactional context. Idempotent per (proposition, factor): an
//! existence check skips duplicates before insert. The check and the
//! insert are not atomic against concurrent runs; single-pipeline use
//! is the supported mode.
//!
//! This module never commits. Callers pass `&mut *tx` and own the
//! transaction boundary, so staging can fold into a larger atomic
//! operation or commit standalone.

use crate::types::{PairResult, StagingReport};
use anyhow::Result;
use clarify_common::factors;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, info, warn};

/// Stage results into `clarifying_questions` without committing
///
/// Skips (counted, not errors): unresolvable factor names, results
/// missing question or reasoning text, existing (proposition, factor)
/// records, and per-record store failures.
pub async fn stage_questions(
    conn: &mut SqliteConnection,
    results: &[PairResult],
    from_store: bool,
    model: &str,
) -> Result<StagingReport> {
    info!(count = results.len(), "Staging questions into store");

    let mut report = StagingReport::default();

    for result in results {
        match stage_one(conn, result, from_store, model).await {
            Ok(true) => report.staged += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                warn!(
                    prop_id = result.prop_id,
                    factor = %result.factor,
                    error = %e,
                    "Failed to stage question, skipping record"
                );
                report.skipped += 1;
            }
        }
    }

    info!(
        staged = report.staged,
        skipped = report.skipped,
        "Staging complete (transaction not committed here)"
    );
    Ok(report)
}

/// Stage one result; `Ok(false)` means an intentional skip
async fn stage_one(
    conn: &mut SqliteConnection,
    result: &PairResult,
    from_store: bool,
    model: &str,
) -> Result<bool> {
    let Some(factor_id) = factors::factor_id_from_name(&result.factor) else {
        warn!(factor = %result.factor, "Unresolvable factor name, skipping");
        return Ok(false);
    };

    if result.question.trim().is_empty() || result.reasoning.trim().is_empty() {
        warn!(
            prop_id = result.prop_id,
            factor = %result.factor,
            "Result missing question or reasoning, skipping"
        );
        return Ok(false);
    }

    // Idempotence: at most one question per (proposition, factor)
    let existing = sqlx::query(
        "SELECT id FROM clarifying_questions WHERE proposition_id = ? AND factor_id = ?",
    )
    .bind(result.prop_id)
    .bind(factor_id as i64)
    .fetch_optional(&mut *conn)
    .await?;

    if existing.is_some() {
        debug!(
            prop_id = result.prop_id,
            factor = %result.factor,
            "Question already exists, skipping"
        );
        return Ok(false);
    }

    // Best-effort link to the originating analysis (store-source runs)
    let analysis_id: Option<i64> = if from_store {
        sqlx::query(
            "SELECT id FROM clarification_analyses WHERE proposition_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(result.prop_id)
        .fetch_optional(&mut *conn)
        .await?
        .map(|row| row.get("id"))
    } else {
        None
    };

    sqlx::query(
        r#"
        INSERT INTO clarifying_questions (
            proposition_id, analysis_id, factor_name, factor_id, factor_score,
            question, reasoning, evidence, generation_method, model_used,
            validation_passed, validation_warnings, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        "#,
    )
    .bind(result.prop_id)
    .bind(analysis_id)
    .bind(&result.factor)
    .bind(factor_id as i64)
    .bind(result.factor_score)
    .bind(&result.question)
    .bind(&result.reasoning)
    .bind(serde_json::to_string(&result.evidence)?)
    .bind(&result.method)
    .bind(model)
    .bind(result.validation_passed as i64)
    .bind(serde_json::to_string(&result.validation_warnings)?)
    .execute(&mut *conn)
    .await?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clarify_common::db::schema;
    use sqlx::SqlitePool;

    fn result(prop_id: i64, factor: &str) -> PairResult {
        PairResult {
            prop_id,
            factor: factor.to_string(),
            question: "Is this pattern intentional?".to_string(),
            reasoning: "Confirms intent".to_string(),
            evidence: vec![format!("preview_{}_0", prop_id)],
            method: "llm_single_call".to_string(),
            prop_text: "text".to_string(),
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            factor_score: 0.7,
            validation_passed: true,
            validation_warnings: vec![],
        }
    }

    async fn pool_with_schema() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        schema::init_tables(&pool).await.unwrap();
        // Staged questions reference these propositions
        for id in [1i64, 2, 3, 7, 42] {
            sqlx::query("INSERT INTO propositions (id, text) VALUES (?, 'text')")
                .bind(id)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    async fn question_count(pool: &SqlitePool) -> i64 {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM clarifying_questions")
            .fetch_one(pool)
            .await
            .unwrap();
        row.0
    }

    #[tokio::test]
    async fn test_staging_is_idempotent() {
        let pool = pool_with_schema().await;
        let results = vec![result(1, "surveillance"), result(1, "opacity")];

        let mut conn = pool.acquire().await.unwrap();
        let first = stage_questions(&mut conn, &results, false, "gpt-4o")
            .await
            .unwrap();
        assert_eq!(first.staged, 2);
        assert_eq!(first.skipped, 0);

        // Second run over the same result set stages nothing
        let second = stage_questions(&mut conn, &results, false, "gpt-4o")
            .await
            .unwrap();
        assert_eq!(second.staged, 0);
        assert_eq!(second.skipped, 2);
        drop(conn);

        assert_eq!(question_count(&pool).await, 2);
    }

    #[tokio::test]
    async fn test_skips_unresolvable_factor_and_empty_fields() {
        let pool = pool_with_schema().await;
        let bad_factor = result(1, "charisma");
        let mut empty_question = result(2, "privacy");
        empty_question.question = String::new();
        let results = vec![bad_factor, empty_question, result(3, "opacity")];

        let mut conn = pool.acquire().await.unwrap();
        let report = stage_questions(&mut conn, &results, false, "gpt-4o")
            .await
            .unwrap();
        assert_eq!(report.staged, 1);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_analysis_link_in_store_mode() {
        let pool = pool_with_schema().await;
        sqlx::query(
            "INSERT INTO clarification_analyses (proposition_id, needs_clarification) VALUES (42, 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        stage_questions(&mut conn, &[result(42, "privacy")], true, "gpt-4o")
            .await
            .unwrap();
        drop(conn);

        let row = sqlx::query("SELECT analysis_id, model_used, evidence FROM clarifying_questions")
            .fetch_one(&pool)
            .await
            .unwrap();
        let analysis_id: Option<i64> = row.get("analysis_id");
        assert!(analysis_id.is_some());
        let model: String = row.get("model_used");
        assert_eq!(model, "gpt-4o");
        let evidence: String = row.get("evidence");
        assert_eq!(evidence, r#"["preview_42_0"]"#);
    }

    #[tokio::test]
    async fn test_no_analysis_link_in_file_mode() {
        let pool = pool_with_schema().await;
        let mut conn = pool.acquire().await.unwrap();
        stage_questions(&mut conn, &[result(7, "privacy")], false, "gpt-4o")
            .await
            .unwrap();
        drop(conn);

        let row = sqlx::query("SELECT analysis_id FROM clarifying_questions")
            .fetch_one(&pool)
            .await
            .unwrap();
        let analysis_id: Option<i64> = row.get("analysis_id");
        assert!(analysis_id.is_none());
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_stages_nothing() {
        let pool = pool_with_schema().await;
        {
            let mut tx = pool.begin().await.unwrap();
            let report = stage_questions(&mut tx, &[result(1, "privacy")], false, "gpt-4o")
                .await
                .unwrap();
            assert_eq!(report.staged, 1);
            // Dropped without commit
        }
        assert_eq!(question_count(&pool).await, 0);
    }
}
