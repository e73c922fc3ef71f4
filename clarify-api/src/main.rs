//! clarify-api - Read-only clarification query service
//!
//! Serves flagged propositions, their analyses, and staged clarifying
//! questions over HTTP for dashboard use.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clarify_api::AppState;
use clarify_common::config::TomlConfig;
use clarify_common::db::init_database_pool;

#[derive(Debug, Parser)]
#[command(name = "clarify-api", version, about = "Read-only query API over the clarification store")]
struct Cli {
    /// SQLite database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// TOML config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen port
    #[arg(long, default_value_t = 5740)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting clarify-api");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load(cli.config.as_deref())?;
    let db_path = cli
        .database
        .or(toml_config.database_path)
        .context("database path required: pass --database or set database_path in config")?;
    info!("Database: {}", db_path.display());

    let db_pool = init_database_pool(&db_path).await?;
    let state = AppState::new(db_pool);
    let app = clarify_api::build_router(state);

    let addr = format!("127.0.0.1:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
