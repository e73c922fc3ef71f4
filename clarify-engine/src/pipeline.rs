//! Pipeline orchestrator
//!
//! Sequences load -> filter -> expand -> generate -> validate -> sink
//! -> staging, isolating failures per (proposition, factor) pair. Pairs
//! are processed strictly in input order, so output is deterministic
//! given a deterministic reasoning backend.
//!
//! # Error handling
//! - Generation failure is terminal for its pair only; siblings proceed.
//! - Validation failure annotates the pair; it is still written to the
//!   sink and counts as successful processing.
//! - Only source-level load failures abort the whole run.

use crate::generator::{GenerationError, GenerationRequest, QuestionBackend};
use crate::loader::{self, InputSource};
use crate::types::{
    ErrorCategory, FailureRecord, FlaggedProposition, PairResult, RunStats, RunSummary,
};
use crate::{sink, staging, validator};
use anyhow::Result;
use chrono::Utc;
use clarify_common::factors;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Progress is logged every this many pairs
const PROGRESS_INTERVAL: usize = 10;

/// Optional narrowing of the proposition set before expansion
///
/// Both filters must match when present; an absent filter imposes no
/// restriction.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// Keep only these proposition ids
    pub prop_ids: Option<HashSet<i64>>,
    /// Keep only propositions with at least one of these factor names
    pub factor_names: Option<HashSet<String>>,
}

/// Pipeline orchestrator for clarifying-question generation
pub struct QuestionEngine {
    backend: Arc<dyn QuestionBackend>,
    source: InputSource,
    input_path: Option<PathBuf>,
    output_path: PathBuf,
    pool: Option<SqlitePool>,
    enrich: bool,
}

impl QuestionEngine {
    /// Create a new engine writing to the given sink location
    pub fn new(
        backend: Arc<dyn QuestionBackend>,
        source: InputSource,
        output_path: PathBuf,
    ) -> Self {
        Self {
            backend,
            source,
            input_path: None,
            output_path,
            pool: None,
            enrich: false,
        }
    }

    /// Set the input file path (file source)
    pub fn with_input_path(mut self, path: PathBuf) -> Self {
        self.input_path = Some(path);
        self
    }

    /// Attach a store handle (required for the store source, optional
    /// for enrichment)
    pub fn with_pool(mut self, pool: SqlitePool) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Enable replacing file-sourced previews with store observations
    pub fn with_enrichment(mut self, enrich: bool) -> Self {
        self.enrich = enrich;
        self
    }

    /// Run the full pipeline
    ///
    /// When `staging_conn` is supplied, every generated result is staged
    /// into it after the sink write; the connection's transaction is
    /// never committed here, the caller owns that boundary.
    pub async fn run(
        &self,
        filter: &RunFilter,
        staging_conn: Option<&mut SqliteConnection>,
    ) -> Result<RunSummary> {
        info!("Starting clarifying question generation pipeline");
        let started = Instant::now();

        // Load and normalize
        let (propositions, load_report) = loader::load_flagged_propositions(
            self.source,
            self.input_path.as_deref(),
            self.pool.as_ref(),
            self.enrich,
        )
        .await?;
        loader::log_load_report(self.source, &load_report);

        // Filter and expand
        let propositions = loader::filter_propositions(
            propositions,
            filter.prop_ids.as_ref(),
            filter.factor_names.as_ref(),
        );
        info!(count = propositions.len(), "Filtered propositions");

        let pairs = loader::proposition_factor_pairs(&propositions);
        let total_pairs = pairs.len();
        info!(pairs = total_pairs, "Processing (proposition, factor) pairs");

        // Process each pair, isolating failures
        let mut stats = RunStats::default();
        let mut failures: Vec<FailureRecord> = Vec::new();
        let mut results: Vec<PairResult> = Vec::new();

        for (i, (prop, factor)) in pairs.iter().enumerate() {
            stats.total_processed += 1;

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                info!(processed = i + 1, total = total_pairs, "Progress");
            }

            match self.process_pair(prop, factor).await {
                Ok(result) => {
                    if !result.validation_passed {
                        warn!(
                            prop_id = prop.prop_id,
                            factor = %factor,
                            warnings = ?result.validation_warnings,
                            "Validation failed, result kept for inspection"
                        );
                        stats.validation_errors += 1;
                        failures.push(FailureRecord {
                            prop_id: prop.prop_id,
                            factor: factor.to_string(),
                            error: result.validation_warnings.join("; "),
                            category: ErrorCategory::Validation,
                        });
                    }
                    stats.successful += 1;
                    results.push(result);
                }
                Err(e) => {
                    error!(
                        prop_id = prop.prop_id,
                        factor = %factor,
                        error = %e,
                        "Generation failed for pair"
                    );
                    stats.failed += 1;
                    stats.generation_errors += 1;
                    failures.push(FailureRecord {
                        prop_id: prop.prop_id,
                        factor: factor.to_string(),
                        error: e.to_string(),
                        category: ErrorCategory::Generation,
                    });
                }
            }
        }

        // Durable sink, unconditional
        sink::write_jsonl(&self.output_path, &results)?;

        // Optional staging into the caller's transaction
        let staging_report = match staging_conn {
            Some(conn) => Some(
                staging::stage_questions(
                    conn,
                    &results,
                    self.source == InputSource::Store,
                    self.backend.model(),
                )
                .await?,
            ),
            None => None,
        };

        let summary = RunSummary {
            stats,
            output_file: self.output_path.clone(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
            failures,
            staging: staging_report,
        };

        info!(
            successful = summary.stats.successful,
            failed = summary.stats.failed,
            elapsed_seconds = summary.elapsed_seconds,
            "Pipeline complete"
        );

        Ok(summary)
    }

    /// Generate and validate one pair
    async fn process_pair(
        &self,
        prop: &FlaggedProposition,
        factor: &str,
    ) -> Result<PairResult, GenerationError> {
        // Loader normalization guarantees validity; guard anyway
        let factor_id = factors::factor_id_from_name(factor)
            .ok_or_else(|| GenerationError::Empty(format!("invalid factor name: {}", factor)))?;

        let request = GenerationRequest {
            prop_id: prop.prop_id,
            prop_text: &prop.prop_text,
            factor_id,
            observations: &prop.observations,
            prop_reasoning: prop.prop_reasoning.as_deref(),
        };

        let generated = self.backend.generate(&request).await?;

        let (validation_passed, validation_warnings) =
            validator::validate_output(&generated, &prop.observation_ids());

        Ok(PairResult {
            prop_id: prop.prop_id,
            factor: factor.to_string(),
            question: generated.question,
            reasoning: generated.reasoning,
            evidence: generated.evidence,
            method: generated.method,
            prop_text: prop.prop_text.clone(),
            timestamp: Utc::now().to_rfc3339(),
            factor_score: prop.factor_score(factor),
            validation_passed,
            validation_warnings,
        })
    }
}
