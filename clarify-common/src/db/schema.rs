//! Schema initialization
//!
//! `propositions`, `observations`, `observation_propositions`, and
//! `clarification_analyses` are owned by the upstream detector; they are
//! created here so a fresh database is usable by every service.
//! `clarifying_questions` is this system's output table.
//!
//! `clarifying_questions` deliberately has no unique index on
//! (proposition_id, factor_id): duplicate suppression is an existence
//! check at staging time, and concurrent runs can race past it.

use crate::Result;
use sqlx::SqlitePool;

/// Create all tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS propositions (
            id INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            reasoning TEXT,
            confidence REAL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observations (
            id INTEGER PRIMARY KEY,
            content TEXT NOT NULL,
            observer_name TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observation_propositions (
            observation_id INTEGER NOT NULL REFERENCES observations(id),
            proposition_id INTEGER NOT NULL REFERENCES propositions(id),
            PRIMARY KEY (observation_id, proposition_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clarification_analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            proposition_id INTEGER NOT NULL REFERENCES propositions(id),
            clarification_score REAL NOT NULL DEFAULT 0.0,
            needs_clarification INTEGER NOT NULL DEFAULT 0,
            triggered_factors TEXT,
            reasoning_log TEXT,
            model_used TEXT,
            validation_passed INTEGER NOT NULL DEFAULT 1,
            factor_1_identity REAL NOT NULL DEFAULT 0.0,
            factor_2_surveillance REAL NOT NULL DEFAULT 0.0,
            factor_3_intent REAL NOT NULL DEFAULT 0.0,
            factor_4_face_threat REAL NOT NULL DEFAULT 0.0,
            factor_5_over_positive REAL NOT NULL DEFAULT 0.0,
            factor_6_opacity REAL NOT NULL DEFAULT 0.0,
            factor_7_generalization REAL NOT NULL DEFAULT 0.0,
            factor_8_privacy REAL NOT NULL DEFAULT 0.0,
            factor_9_actor_observer REAL NOT NULL DEFAULT 0.0,
            factor_10_reputation REAL NOT NULL DEFAULT 0.0,
            factor_11_ambiguity REAL NOT NULL DEFAULT 0.0,
            factor_12_tone REAL NOT NULL DEFAULT 0.0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS clarifying_questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            proposition_id INTEGER NOT NULL REFERENCES propositions(id),
            analysis_id INTEGER REFERENCES clarification_analyses(id),
            factor_name TEXT NOT NULL,
            factor_id INTEGER NOT NULL,
            factor_score REAL NOT NULL DEFAULT 0.0,
            question TEXT NOT NULL,
            reasoning TEXT NOT NULL,
            evidence TEXT NOT NULL DEFAULT '[]',
            generation_method TEXT NOT NULL DEFAULT 'unknown',
            model_used TEXT,
            validation_passed INTEGER NOT NULL DEFAULT 1,
            validation_warnings TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");

    Ok(())
}
