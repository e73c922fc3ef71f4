//! Input adapter: loading, filtering, and pair expansion
//!
//! Loads flagged propositions from one of two interchangeable sources
//! (a JSON export file or the persistent store) and normalizes them
//! into the canonical `FlaggedProposition` shape. Per-record problems
//! drop only that record; source-level problems abort the run.

pub mod file;
pub mod store;

use crate::types::FlaggedProposition;
use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Input source selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// JSON export file of flagged propositions
    File,
    /// Persistent store (clarification analyses flagged upstream)
    Store,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputSource::File => "file",
            InputSource::Store => "store",
        }
    }
}

/// What the loader kept and dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Records dropped during normalization (missing id/text, zero
    /// valid factors)
    pub dropped: usize,
}

/// Load flagged propositions from the selected source
///
/// # Errors
/// Fatal conditions only: missing or malformed file, or a store source
/// without a pool. Per-record normalization problems are logged and
/// counted in the report.
pub async fn load_flagged_propositions(
    source: InputSource,
    file_path: Option<&Path>,
    pool: Option<&SqlitePool>,
    enrich: bool,
) -> Result<(Vec<FlaggedProposition>, LoadReport)> {
    match source {
        InputSource::File => {
            let path = file_path.context("file source requires an input path")?;
            let (mut props, report) = file::load_from_file(path)?;

            // Optionally replace preview/placeholder evidence with real
            // observations when a store handle is available
            if enrich {
                if let Some(pool) = pool {
                    store::enrich_with_store_observations(pool, &mut props).await;
                }
            }

            Ok((props, report))
        }
        InputSource::Store => {
            let Some(pool) = pool else {
                bail!("store source requires a database handle");
            };
            let (props, report) = store::load_from_store(pool).await?;
            Ok((props, report))
        }
    }
}

/// Filter propositions by id membership and factor names
///
/// Both filters must match (AND); an absent filter imposes no
/// restriction. Order-preserving and pure.
pub fn filter_propositions(
    propositions: Vec<FlaggedProposition>,
    prop_ids: Option<&HashSet<i64>>,
    factor_names: Option<&HashSet<String>>,
) -> Vec<FlaggedProposition> {
    propositions
        .into_iter()
        .filter(|p| prop_ids.map_or(true, |ids| ids.contains(&p.prop_id)))
        .filter(|p| {
            factor_names.map_or(true, |names| {
                p.triggered_factors.iter().any(|f| names.contains(f))
            })
        })
        .collect()
}

/// Expand propositions into (proposition, factor) pairs
///
/// One pair per triggered factor, preserving proposition order and each
/// proposition's internal factor order.
pub fn proposition_factor_pairs(
    propositions: &[FlaggedProposition],
) -> Vec<(&FlaggedProposition, &str)> {
    let mut pairs = Vec::new();
    for prop in propositions {
        for factor in &prop.triggered_factors {
            pairs.push((prop, factor.as_str()));
        }
    }
    pairs
}

/// Log a load report at the standard level
pub fn log_load_report(source: InputSource, report: &LoadReport) {
    info!(
        source = source.as_str(),
        loaded = report.loaded,
        dropped = report.dropped,
        "Loaded flagged propositions"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObservationRecord, ObservationSource};
    use std::collections::HashMap;

    fn prop(id: i64, factors: &[&str]) -> FlaggedProposition {
        FlaggedProposition {
            prop_id: id,
            prop_text: format!("proposition {}", id),
            triggered_factors: factors.iter().map(|s| s.to_string()).collect(),
            observations: vec![ObservationRecord {
                id: format!("preview_{}_0", id),
                text: "obs".to_string(),
                timestamp: None,
                source: ObservationSource::Preview,
            }],
            prop_reasoning: None,
            factor_scores: HashMap::new(),
            clarification_score: None,
        }
    }

    #[test]
    fn test_no_filters_keeps_everything() {
        let props = vec![prop(1, &["surveillance"]), prop(2, &["privacy"])];
        let filtered = filter_propositions(props, None, None);
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].prop_id, 1);
    }

    #[test]
    fn test_id_filter() {
        let props = vec![prop(1, &["surveillance"]), prop(2, &["privacy"])];
        let ids: HashSet<i64> = [2].into();
        let filtered = filter_propositions(props, Some(&ids), None);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].prop_id, 2);
    }

    #[test]
    fn test_factor_filter_needs_one_match() {
        let props = vec![
            prop(1, &["surveillance", "opacity"]),
            prop(2, &["privacy"]),
            prop(3, &["opacity"]),
        ];
        let names: HashSet<String> = ["opacity".to_string()].into();
        let filtered = filter_propositions(props, None, Some(&names));
        assert_eq!(
            filtered.iter().map(|p| p.prop_id).collect::<Vec<_>>(),
            vec![1, 3]
        );
    }

    #[test]
    fn test_both_filters_are_anded() {
        let props = vec![prop(1, &["opacity"]), prop(2, &["opacity"])];
        let ids: HashSet<i64> = [1].into();
        let names: HashSet<String> = ["opacity".to_string()].into();
        let filtered = filter_propositions(props, Some(&ids), Some(&names));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].prop_id, 1);
    }

    #[test]
    fn test_pair_expansion_order() {
        let props = vec![prop(1, &["surveillance", "opacity"]), prop(2, &["privacy"])];
        let pairs = proposition_factor_pairs(&props);
        let flat: Vec<(i64, &str)> = pairs.iter().map(|(p, f)| (p.prop_id, *f)).collect();
        assert_eq!(
            flat,
            vec![(1, "surveillance"), (1, "opacity"), (2, "privacy")]
        );
    }

    #[test]
    fn test_pair_count_matches_factor_count() {
        let props = vec![prop(1, &["surveillance", "opacity", "privacy"])];
        assert_eq!(proposition_factor_pairs(&props).len(), 3);
    }

    #[tokio::test]
    async fn test_store_source_without_pool_is_fatal() {
        let result = load_flagged_propositions(InputSource::Store, None, None, false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_source_without_path_is_fatal() {
        let result = load_flagged_propositions(InputSource::File, None, None, false).await;
        assert!(result.is_err());
    }
}
