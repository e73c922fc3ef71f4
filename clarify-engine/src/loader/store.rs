//! Store-source input adapter
//!
//! Queries analyses flagged as needing clarification, joins each to its
//! proposition and its 5 most recent observations, and assembles the
//! canonical shape. Also provides the enrichment pass that swaps
//! preview/placeholder evidence for real store content.

use crate::loader::LoadReport;
use crate::types::{FlaggedProposition, ObservationRecord, ObservationSource};
use anyhow::{Context, Result};
use clarify_common::factors;
use clarify_common::models::ClarificationAnalysis;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

/// Load flagged propositions from the persistent store
pub async fn load_from_store(pool: &SqlitePool) -> Result<(Vec<FlaggedProposition>, LoadReport)> {
    debug!("Loading flagged propositions from store");

    let rows = sqlx::query(
        r#"
        SELECT a.id, a.proposition_id, a.clarification_score, a.needs_clarification,
               a.triggered_factors, a.reasoning_log, a.model_used, a.validation_passed,
               a.factor_1_identity, a.factor_2_surveillance, a.factor_3_intent,
               a.factor_4_face_threat, a.factor_5_over_positive, a.factor_6_opacity,
               a.factor_7_generalization, a.factor_8_privacy, a.factor_9_actor_observer,
               a.factor_10_reputation, a.factor_11_ambiguity, a.factor_12_tone,
               a.created_at, p.text AS prop_text
        FROM clarification_analyses a
        JOIN propositions p ON p.id = a.proposition_id
        WHERE a.needs_clarification = 1
        ORDER BY a.id
        "#,
    )
    .fetch_all(pool)
    .await
    .context("failed to query flagged analyses")?;

    let mut propositions = Vec::new();
    let mut dropped = 0usize;

    for row in &rows {
        let analysis = ClarificationAnalysis::from_row(row);
        let prop_text: String = row.get("prop_text");

        let triggered_factors =
            normalize_triggered_factors(analysis.triggered_factors.as_deref());
        if triggered_factors.is_empty() {
            warn!(
                prop_id = analysis.proposition_id,
                "Flagged analysis has no valid triggered factors, dropping"
            );
            dropped += 1;
            continue;
        }

        let observations = load_observations(pool, analysis.proposition_id).await?;

        propositions.push(FlaggedProposition {
            prop_id: analysis.proposition_id,
            prop_text,
            triggered_factors,
            observations,
            prop_reasoning: analysis.reasoning_log.clone(),
            factor_scores: analysis
                .named_factor_scores()
                .into_iter()
                .map(|(name, score)| (name.to_string(), score))
                .collect(),
            clarification_score: Some(analysis.clarification_score),
        });
    }

    let report = LoadReport {
        loaded: propositions.len(),
        dropped,
    };
    Ok((propositions, report))
}

/// Load the 5 most recent observations for a proposition, newest first
pub async fn load_observations(
    pool: &SqlitePool,
    proposition_id: i64,
) -> Result<Vec<ObservationRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT o.id, o.content, o.created_at
        FROM observations o
        JOIN observation_propositions op ON op.observation_id = o.id
        WHERE op.proposition_id = ?
        ORDER BY o.created_at DESC, o.id DESC
        LIMIT 5
        "#,
    )
    .bind(proposition_id)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to query observations for proposition {}", proposition_id))?;

    Ok(rows
        .iter()
        .map(|row| {
            let id: i64 = row.get("id");
            ObservationRecord {
                id: id.to_string(),
                text: row.get("content"),
                timestamp: row.get("created_at"),
                source: ObservationSource::Store,
            }
        })
        .collect())
}

/// Replace preview/placeholder evidence with real store observations
///
/// Per-proposition best effort: a failed query keeps the original
/// evidence; a proposition with no store observations keeps its
/// previews.
pub async fn enrich_with_store_observations(
    pool: &SqlitePool,
    propositions: &mut [FlaggedProposition],
) {
    for prop in propositions.iter_mut() {
        match load_observations(pool, prop.prop_id).await {
            Ok(observations) if !observations.is_empty() => {
                debug!(
                    prop_id = prop.prop_id,
                    count = observations.len(),
                    "Enriched proposition with store observations"
                );
                prop.observations = observations;
            }
            Ok(_) => {
                debug!(
                    prop_id = prop.prop_id,
                    "No store observations found, keeping previews"
                );
            }
            Err(e) => {
                warn!(
                    prop_id = prop.prop_id,
                    error = %e,
                    "Failed to enrich proposition, keeping original evidence"
                );
            }
        }
    }
}

/// Normalize the stored triggered-factor payload to a list of names
///
/// The store has carried three shapes over time: a JSON list, a JSON
/// object with a `factors` key, and a bare (or JSON-encoded) string.
/// Names outside the fixed factor table are dropped with a warning.
pub fn normalize_triggered_factors(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    let candidates: Vec<String> = match serde_json::from_str::<Value>(raw) {
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
        // Not JSON: treat the raw value as a single factor name
        _ => vec![raw.to_string()],
    };

    candidates
        .into_iter()
        .filter(|name| {
            let known = factors::factor_id_from_name(name).is_some();
            if !known {
                warn!(factor = %name, "Unknown factor name in stored analysis, skipping");
            }
            known
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clarify_common::db::schema;

    #[test]
    fn test_factor_list_form() {
        let names = normalize_triggered_factors(Some(r#"["surveillance", "opacity"]"#));
        assert_eq!(names, vec!["surveillance", "opacity"]);
    }

    #[test]
    fn test_factor_object_form() {
        let names =
            normalize_triggered_factors(Some(r#"{"factors": ["privacy", "ambiguity"]}"#));
        assert_eq!(names, vec!["privacy", "ambiguity"]);
    }

    #[test]
    fn test_factor_bare_string_form() {
        assert_eq!(normalize_triggered_factors(Some("privacy")), vec!["privacy"]);
        // JSON-encoded single string
        assert_eq!(
            normalize_triggered_factors(Some(r#""privacy""#)),
            vec!["privacy"]
        );
    }

    #[test]
    fn test_unknown_names_dropped() {
        let names = normalize_triggered_factors(Some(r#"["privacy", "charisma"]"#));
        assert_eq!(names, vec!["privacy"]);
        assert!(normalize_triggered_factors(Some("charisma")).is_empty());
        assert!(normalize_triggered_factors(None).is_empty());
    }

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        schema::init_tables(&pool).await.unwrap();

        sqlx::query("INSERT INTO propositions (id, text, reasoning) VALUES (42, 'User checks email late at night', 'observed repeatedly')")
            .execute(&pool)
            .await
            .unwrap();
        for (id, content, ts) in [
            (1, "email at 23:40", "2026-01-01T23:40:00Z"),
            (2, "email at 00:15", "2026-01-02T00:15:00Z"),
            (3, "email at 01:05", "2026-01-03T01:05:00Z"),
            (4, "email at 23:55", "2026-01-04T23:55:00Z"),
            (5, "email at 00:30", "2026-01-05T00:30:00Z"),
            (6, "email at 02:10", "2026-01-06T02:10:00Z"),
        ] {
            sqlx::query("INSERT INTO observations (id, content, created_at) VALUES (?, ?, ?)")
                .bind(id)
                .bind(content)
                .bind(ts)
                .execute(&pool)
                .await
                .unwrap();
            sqlx::query(
                "INSERT INTO observation_propositions (observation_id, proposition_id) VALUES (?, 42)",
            )
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
        }

        sqlx::query(
            r#"
            INSERT INTO clarification_analyses
                (proposition_id, clarification_score, needs_clarification,
                 triggered_factors, reasoning_log, factor_8_privacy, factor_2_surveillance)
            VALUES (42, 0.72, 1, '["privacy", "surveillance"]', 'late-night pattern', 0.8, 0.7)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        // A non-flagged analysis that must not be loaded
        sqlx::query("INSERT INTO propositions (id, text) VALUES (43, 'User likes coffee')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO clarification_analyses (proposition_id, needs_clarification, triggered_factors) \
             VALUES (43, 0, '[\"privacy\"]')",
        )
        .execute(&pool)
        .await
        .unwrap();

        pool
    }

    #[tokio::test]
    async fn test_load_from_store_joins_and_bounds() {
        let pool = seeded_pool().await;
        let (props, report) = load_from_store(&pool).await.unwrap();

        assert_eq!(report.loaded, 1);
        assert_eq!(report.dropped, 0);
        let prop = &props[0];
        assert_eq!(prop.prop_id, 42);
        assert_eq!(prop.prop_text, "User checks email late at night");
        assert_eq!(prop.triggered_factors, vec!["privacy", "surveillance"]);
        assert_eq!(prop.prop_reasoning.as_deref(), Some("late-night pattern"));
        assert_eq!(prop.clarification_score, Some(0.72));
        assert_eq!(prop.factor_score("privacy"), 0.8);

        // 5 most recent of 6, newest first, store-tagged
        assert_eq!(prop.observations.len(), 5);
        assert_eq!(prop.observations[0].id, "6");
        assert_eq!(prop.observations[4].id, "2");
        assert!(prop
            .observations
            .iter()
            .all(|o| o.source == ObservationSource::Store));
    }

    #[tokio::test]
    async fn test_enrichment_replaces_previews() {
        let pool = seeded_pool().await;
        let mut props = vec![FlaggedProposition {
            prop_id: 42,
            prop_text: "User checks email late at night".to_string(),
            triggered_factors: vec!["privacy".to_string()],
            observations: vec![ObservationRecord {
                id: "preview_42_0".to_string(),
                text: "late email".to_string(),
                timestamp: None,
                source: ObservationSource::Preview,
            }],
            prop_reasoning: None,
            factor_scores: Default::default(),
            clarification_score: None,
        }];

        enrich_with_store_observations(&pool, &mut props).await;
        assert_eq!(props[0].observations.len(), 5);
        assert!(props[0]
            .observations
            .iter()
            .all(|o| o.source == ObservationSource::Store));
    }

    #[tokio::test]
    async fn test_enrichment_keeps_previews_when_no_rows() {
        let pool = seeded_pool().await;
        let mut props = vec![FlaggedProposition {
            prop_id: 999,
            prop_text: "unknown".to_string(),
            triggered_factors: vec!["privacy".to_string()],
            observations: vec![ObservationRecord {
                id: "preview_999_0".to_string(),
                text: "preview".to_string(),
                timestamp: None,
                source: ObservationSource::Preview,
            }],
            prop_reasoning: None,
            factor_scores: Default::default(),
            clarification_score: None,
        }];

        enrich_with_store_observations(&pool, &mut props).await;
        assert_eq!(props[0].observations.len(), 1);
        assert_eq!(props[0].observations[0].source, ObservationSource::Preview);
    }
}
