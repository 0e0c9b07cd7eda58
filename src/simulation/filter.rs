//! Historical filter.
//!
//! Turns the raw historical table into simulation-ready rows: drops rows
//! with missing required fields, derives the chosen-side odds, win rate
//! and hit flag, and keeps only rows above the EV threshold.

use tracing::debug;

use crate::types::{HistoricalBetRecord, OddsError, SimRow, REQUIRED_COLUMNS};

/// Reject tables the simulator cannot say anything meaningful about:
/// no rows at all, or a required column with no value in any row.
pub fn validate_table(records: &[HistoricalBetRecord]) -> Result<(), OddsError> {
    if records.is_empty() {
        return Err(OddsError::EmptyHistory);
    }

    for column in REQUIRED_COLUMNS {
        if !records.iter().any(|r| r.has_column(column)) {
            return Err(OddsError::MissingColumn(column));
        }
    }

    Ok(())
}

/// Filter raw records into rows with `ev > ev_threshold`.
///
/// Incomplete rows are dropped silently; this never fails.
pub fn filter_records(records: &[HistoricalBetRecord], ev_threshold: f64) -> Vec<SimRow> {
    let mut incomplete = 0usize;
    let mut below_threshold = 0usize;

    let rows: Vec<SimRow> = records
        .iter()
        .filter_map(|rec| {
            let row = rec.to_sim_row();
            if row.is_none() {
                incomplete += 1;
            }
            row
        })
        .filter(|row| {
            let keep = row.ev > ev_threshold;
            if !keep {
                below_threshold += 1;
            }
            keep
        })
        .collect();

    debug!(
        total = records.len(),
        kept = rows.len(),
        incomplete,
        below_threshold,
        ev_threshold,
        "Historical records filtered"
    );

    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
