//! Stratifier.
//!
//! Bins filtered rows into (EV bucket, odds bucket) cells with fixed
//! edges and assigns each non-empty cell a sampling weight proportional
//! to its share of the bucketed rows.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::types::SimRow;

/// EV bucket edges (5 right-inclusive buckets).
pub const EV_BUCKET_EDGES: [f64; 6] = [0.0, 0.01, 0.03, 0.07, 0.15, 1.0];

/// Odds bucket edges (4 right-inclusive buckets), applied within each EV bucket.
pub const ODDS_BUCKET_EDGES: [f64; 5] = [1.0, 2.5, 4.0, 7.0, 20.0];

/// Index of the bucket `(edges[i], edges[i + 1]]` containing `value`.
///
/// Values at or below the first edge, above the last edge, or non-finite
/// fall in no bucket.
pub fn bucket_index(value: f64, edges: &[f64]) -> Option<usize> {
    if !value.is_finite() {
        return None;
    }
    edges.windows(2).position(|w| value > w[0] && value <= w[1])
}

// ---------------------------------------------------------------------------
// Strata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StratumKey {
    pub ev_bucket: usize,
    pub odds_bucket: usize,
}

impl fmt::Display for StratumKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ev{}/odds{}", self.ev_bucket, self.odds_bucket)
    }
}

/// One non-empty (EV bucket, odds bucket) cell.
#[derive(Debug, Clone)]
pub struct Stratum {
    pub key: StratumKey,
    pub rows: Vec<SimRow>,
    /// `rows.len()` over the number of bucketed rows in the table.
    pub weight: f64,
}

/// Partition of the filtered rows into weighted strata.
///
/// Built once per simulation call and shared read-only by every run.
#[derive(Debug, Clone, Default)]
pub struct StrataTable {
    strata: Vec<Stratum>,
    total: usize,
    unbucketed: usize,
}

impl StrataTable {
    /// Bucket `rows`. Rows outside the EV or odds edge range are excluded.
    pub fn build(rows: &[SimRow]) -> Self {
        let mut cells: BTreeMap<StratumKey, Vec<SimRow>> = BTreeMap::new();
        let mut unbucketed = 0usize;

        for row in rows {
            let key = bucket_index(row.ev, &EV_BUCKET_EDGES).and_then(|ev_bucket| {
                bucket_index(row.bet_odds, &ODDS_BUCKET_EDGES)
                    .map(|odds_bucket| StratumKey { ev_bucket, odds_bucket })
            });
            match key {
                Some(key) => cells.entry(key).or_default().push(*row),
                None => unbucketed += 1,
            }
        }

        let total: usize = cells.values().map(Vec::len).sum();
        let strata: Vec<Stratum> = cells
            .into_iter()
            .map(|(key, rows)| Stratum {
                key,
                weight: rows.len() as f64 / total as f64,
                rows,
            })
            .collect();

        debug!(
            strata = strata.len(),
            bucketed = total,
            unbucketed,
            "Strata built"
        );

        Self { strata, total, unbucketed }
    }

    pub fn strata(&self) -> &[Stratum] {
        &self.strata
    }

    pub fn get(&self, key: StratumKey) -> Option<&Stratum> {
        self.strata.iter().find(|s| s.key == key)
    }

    /// Weights in the same order as `strata()`.
    pub fn weights(&self) -> Vec<f64> {
        self.strata.iter().map(|s| s.weight).collect()
    }

    /// Number of rows that landed in some stratum.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of rows outside the bucket edges.
    pub fn unbucketed(&self) -> usize {
        self.unbucketed
    }

    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
