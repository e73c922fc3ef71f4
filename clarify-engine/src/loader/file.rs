//! File-source input adapter
//!
//! Accepts a raw JSON list or an object with a `propositions` key.
//! Export records are loosely shaped: identifier and text arrive under
//! several synonymous field names, and factor entries may be names or
//! numeric ids. Everything is normalized here; nothing dict-shaped
//! escapes this module.

use crate::loader::LoadReport;
use crate::types::{FlaggedProposition, ObservationRecord, ObservationSource};
use anyhow::{bail, Context, Result};
use clarify_common::factors;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Preview text is capped at this many characters
const PREVIEW_TEXT_CAP: usize = 200;

/// At most this many observations are synthesized or kept per proposition
const MAX_OBSERVATIONS: usize = 5;

/// Load flagged propositions from a JSON export file
///
/// # Errors
/// Missing file and malformed JSON are fatal. Records that fail
/// normalization are dropped and counted, never an error.
pub fn load_from_file(path: &Path) -> Result<(Vec<FlaggedProposition>, LoadReport)> {
    if !path.exists() {
        bail!("flagged propositions file not found: {}", path.display());
    }

    debug!(path = %path.display(), "Loading flagged propositions from file");

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let data: Value = serde_json::from_str(&content)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    // Accept both a bare list and an object wrapping one
    let raw_props = match &data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("propositions") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => bail!("unexpected top-level JSON shape in {}", path.display()),
    };

    let mut normalized = Vec::new();
    let mut dropped = 0usize;
    for raw in raw_props {
        match normalize_proposition(raw) {
            Some(prop) => normalized.push(prop),
            None => dropped += 1,
        }
    }

    let report = LoadReport {
        loaded: normalized.len(),
        dropped,
    };
    Ok((normalized, report))
}

/// Normalize one raw export record into the canonical shape
///
/// Returns `None` (with a logged reason) when the record is unusable:
/// missing identifier or text, or no valid triggered factor.
fn normalize_proposition(raw: &Value) -> Option<FlaggedProposition> {
    let prop_id = match field_as_i64(raw, &["prop_id", "id"]) {
        Some(id) => id,
        None => {
            warn!("Skipping proposition with missing or non-numeric id: {}", raw);
            return None;
        }
    };
    let prop_text = match field_as_str(raw, &["prop_text", "text", "proposition"]) {
        Some(text) if !text.trim().is_empty() => text.to_string(),
        _ => {
            warn!(prop_id, "Skipping proposition with missing text");
            return None;
        }
    };

    let triggered_factors = normalize_factors(raw.get("triggered_factors"));
    if triggered_factors.is_empty() {
        warn!(prop_id, "Proposition has no valid triggered factors, dropping");
        return None;
    }

    let mut observations = normalize_observations(raw.get("observations"));
    if observations.is_empty() {
        observations = synthesize_observations(prop_id, raw);
    }

    let prop_reasoning = field_as_str(raw, &["prop_reasoning", "reasoning"])
        .map(|s| s.to_string());

    let factor_scores = raw
        .get("factor_scores")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_f64().map(|s| (k.clone(), s)))
                .collect()
        })
        .unwrap_or_else(HashMap::new);

    Some(FlaggedProposition {
        prop_id,
        prop_text,
        triggered_factors,
        observations,
        prop_reasoning,
        factor_scores,
        clarification_score: raw.get("clarification_score").and_then(Value::as_f64),
    })
}

/// Validate and canonicalize triggered-factor entries
///
/// A bare string counts as a single-element list. Entries may be factor
/// names or numeric ids; anything outside the fixed table is dropped
/// with a warning.
fn normalize_factors(raw: Option<&Value>) -> Vec<String> {
    let entries: Vec<Value> = match raw {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(s)) => vec![Value::String(s.clone())],
        _ => Vec::new(),
    };

    let mut valid = Vec::new();
    for entry in entries {
        match entry {
            Value::String(name) => {
                if factors::factor_id_from_name(&name).is_some() {
                    valid.push(name);
                } else {
                    warn!(factor = %name, "Unknown factor name, skipping");
                }
            }
            Value::Number(n) => match n.as_u64() {
                Some(id) if id <= u8::MAX as u64 => {
                    match factors::factor_name_from_id(id as u8) {
                        Some(name) => valid.push(name.to_string()),
                        None => warn!(factor_id = id, "Invalid factor id, skipping"),
                    }
                }
                _ => warn!(factor = %n, "Invalid factor id, skipping"),
            },
            other => warn!(factor = %other, "Unrecognized factor entry, skipping"),
        }
    }
    valid
}

/// Normalize explicit observation entries from the export
fn normalize_observations(raw: Option<&Value>) -> Vec<ObservationRecord> {
    let Some(Value::Array(items)) = raw else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for item in items.iter().take(MAX_OBSERVATIONS) {
        let Some(id) = observation_id(item) else {
            continue;
        };
        let Some(text) = field_as_str(item, &["observation_text", "text", "content"]) else {
            continue;
        };
        records.push(ObservationRecord {
            id,
            text: text.to_string(),
            timestamp: field_as_str(item, &["timestamp", "created_at"]).map(|s| s.to_string()),
            source: parse_source_tag(item.get("source").and_then(Value::as_str)),
        });
    }
    records
}

/// Synthesize observation records from previews and a total count
///
/// One truncated-preview record per available preview, then placeholder
/// records for any remaining count, both bounded at 5. Keeps the
/// downstream evidence list non-empty even when full content was not
/// exported.
fn synthesize_observations(prop_id: i64, raw: &Value) -> Vec<ObservationRecord> {
    let previews: Vec<&str> = raw
        .get("observation_previews")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if previews.is_empty() {
        return Vec::new();
    }
    let observation_count = raw
        .get("observation_count")
        .and_then(Value::as_u64)
        .unwrap_or(0) as usize;

    let mut records = Vec::new();
    for (i, preview) in previews.iter().take(MAX_OBSERVATIONS).enumerate() {
        records.push(ObservationRecord {
            id: format!("preview_{}_{}", prop_id, i),
            text: truncate_chars(preview, PREVIEW_TEXT_CAP),
            timestamp: None,
            source: ObservationSource::Preview,
        });
    }

    // Placeholders for observations beyond the exported previews
    for i in records.len()..observation_count.min(MAX_OBSERVATIONS) {
        records.push(ObservationRecord {
            id: format!("preview_{}_{}", prop_id, i),
            text: format!("[Observation {} - preview not available]", i + 1),
            timestamp: None,
            source: ObservationSource::Placeholder,
        });
    }

    records
}

/// First present field among synonymous keys, as a string
fn field_as_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| value.get(*k).and_then(Value::as_str))
}

/// First present field among synonymous keys, as an integer
///
/// Numeric strings are accepted; anything else is not.
fn field_as_i64(value: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Observation identifier, rendered as a string
fn observation_id(value: &Value) -> Option<String> {
    match value.get("id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn parse_source_tag(raw: Option<&str>) -> ObservationSource {
    match raw {
        Some("preview") => ObservationSource::Preview,
        Some("placeholder") => ObservationSource::Placeholder,
        _ => ObservationSource::Store,
    }
}

/// Truncate to a character budget without splitting a code point
fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
