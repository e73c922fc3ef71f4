//! clarify-engine - Clarifying Question Generation CLI
//!
//! Runs the full pipeline: load flagged propositions from a JSON export
//! or the persistent store, generate one clarifying question per
//! (proposition, factor) pair, validate, write the JSONL sink, and
//! optionally stage results into the store inside a single transaction.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clarify_common::config::{self, TomlConfig};
use clarify_common::db::init_database_pool;
use clarify_common::factors;
use clarify_engine::loader::InputSource;
use clarify_engine::{QuestionEngine, ReasoningClient, RunFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    /// JSON export file of flagged propositions
    File,
    /// Persistent store (flagged clarification analyses)
    Store,
}

#[derive(Debug, Parser)]
#[command(name = "clarify-engine", version, about = "Generate clarifying questions for flagged behavioral propositions")]
struct Cli {
    /// Where to load flagged propositions from
    #[arg(long, value_enum, default_value = "file")]
    source: SourceArg,

    /// Input JSON file (file source)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output JSONL file
    #[arg(long, default_value = "clarifying_questions.jsonl")]
    output: PathBuf,

    /// TOML config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Restrict the run to these proposition ids
    #[arg(long, value_delimiter = ',')]
    prop_ids: Option<Vec<i64>>,

    /// Restrict the run to these factors (names or numeric ids)
    #[arg(long, value_delimiter = ',')]
    factors: Option<Vec<String>>,

    /// Replace file-sourced preview evidence with store observations
    #[arg(long)]
    enrich: bool,

    /// Stage generated questions into the store (one transaction)
    #[arg(long)]
    stage: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("Starting clarify-engine");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load(cli.config.as_deref())?;
    let api_key = config::resolve_api_key(&toml_config)?;
    let backend = Arc::new(ReasoningClient::new(api_key, &toml_config.reasoning)?);

    let source = match cli.source {
        SourceArg::File => InputSource::File,
        SourceArg::Store => InputSource::Store,
    };

    // The store is needed for the store source, for staging, and for
    // evidence enrichment
    let needs_pool = source == InputSource::Store || cli.stage || cli.enrich;
    let pool = if needs_pool {
        let db_path = cli
            .database
            .or(toml_config.database_path)
            .context("database path required: pass --database or set database_path in config")?;
        info!("Database: {}", db_path.display());
        Some(init_database_pool(&db_path).await?)
    } else {
        None
    };

    let filter = RunFilter {
        prop_ids: cli.prop_ids.map(|ids| ids.into_iter().collect()),
        factor_names: cli.factors.map(parse_factor_filter).transpose()?,
    };

    let mut engine = QuestionEngine::new(backend, source, cli.output);
    if let Some(input) = cli.input {
        engine = engine.with_input_path(input);
    }
    if let Some(pool) = pool.clone() {
        engine = engine.with_pool(pool);
    }
    engine = engine.with_enrichment(cli.enrich);

    let summary = if cli.stage {
        // Pool is always present here (needs_pool covers staging)
        let pool = pool.context("staging requires a database handle")?;
        let mut tx = pool.begin().await?;
        let summary = engine.run(&filter, Some(&mut *tx)).await?;
        tx.commit().await?;
        info!("Staging transaction committed");
        summary
    } else {
        engine.run(&filter, None).await?
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.stats.successful == 0 && summary.stats.total_processed > 0 {
        bail!("no pairs processed successfully");
    }
    Ok(())
}

/// Parse a factor filter of names or numeric ids into canonical names
fn parse_factor_filter(raw: Vec<String>) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in raw {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if let Ok(id) = entry.parse::<u8>() {
            let name = factors::factor_name_from_id(id)
                .with_context(|| format!("unknown factor id: {}", id))?;
            names.insert(name.to_string());
        } else {
            let lowered = entry.to_ascii_lowercase();
            if factors::factor_id_from_name(&lowered).is_none() {
                bail!("unknown factor name: {}", entry);
            }
            names.insert(lowered);
        }
    }
    Ok(names)
}
