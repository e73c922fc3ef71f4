//! Shared SQLite database access
//!
//! One database holds the upstream store (propositions, observations,
//! clarification analyses) and this system's clarifying questions.

pub mod schema;

use crate::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the parent directory and the schema tables if missing.
/// Foreign keys are enforced on every pooled connection.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!("Connecting to database: {}", db_path.display());

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    schema::init_tables(&pool).await?;

    Ok(pool)
}
