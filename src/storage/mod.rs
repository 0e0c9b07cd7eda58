//! Persistence layer.
//!
//! Reads and writes the pipeline's tables as JSON arrays of rows: the
//! historical bet table, match predictions, placed bets, match results,
//! and the Monte Carlo report summary. The simulator only sees history
//! through the [`HistorySource`] trait.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::{HistoricalBetRecord, OddsError};

/// Anything that can hand over the historical bet table.
#[cfg_attr(test, mockall::automock)]
pub trait HistorySource {
    fn load(&self) -> Result<Vec<HistoricalBetRecord>>;
}

/// Historical table stored as a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonHistoryFile {
    path: PathBuf,
}

impl JsonHistoryFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistorySource for JsonHistoryFile {
    fn load(&self) -> Result<Vec<HistoricalBetRecord>> {
        if !self.path.exists() {
            return Err(OddsError::Storage(format!(
                "History table not found: {}",
                self.path.display()
            ))
            .into());
        }
        let records: Vec<HistoricalBetRecord> = load_json(&self.path)?;
        info!(path = %self.path.display(), rows = records.len(), "Historical bets loaded");
        Ok(records)
    }
}

/// Serialise `value` as pretty JSON to `path`.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise {}", path.display()))?;

    std::fs::write(path, &json)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    debug!(path = %path.display(), bytes = json.len(), "JSON saved");
    Ok(())
}

/// Deserialize a JSON file.
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load a JSON array of rows, or an empty table if the file does not exist.
pub fn load_rows_or_empty<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    if !path.exists() {
        info!(path = %path.display(), "No table found, starting empty");
        return Ok(Vec::new());
    }
    load_json(path)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
