//! Durable sink writer
//!
//! Newline-delimited JSON, one object per processed pair, in processing
//! order. The write is unconditional: it happens even when every pair
//! failed validation, so partial results stay inspectable.

use crate::types::PairResult;
use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Write results to a JSONL file, creating parent directories as needed
pub fn write_jsonl(path: &Path, results: &[PairResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    info!(count = results.len(), path = %path.display(), "Writing results to sink");

    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);

    for result in results {
        let line = serde_json::to_string(result).context("failed to serialize result")?;
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;

    info!(count = results.len(), "Sink write complete");
    Ok(())
}
