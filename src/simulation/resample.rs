//! Stratified resampler.
//!
//! Draws a synthetic bet sequence for one run: pick a stratum by weight,
//! then a row from it uniformly with replacement. Long-shot rows
//! (odds above the high-odds threshold) are capped per run; draws past the
//! cap are discarded, not replaced.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::debug;

use super::stratify::StrataTable;
use crate::types::SimRow;

/// Bets drawn per run.
pub const SAMPLE_COUNT: usize = 600;
/// Odds above which a drawn row counts against the long-shot cap.
pub const HIGH_ODDS_THRESHOLD: f64 = 6.0;
/// Long-shot rows allowed per run.
pub const HIGH_ODDS_CAP: usize = 2;

#[derive(Debug, Clone)]
pub struct ResampleConfig {
    /// Draw iterations per run (upper bound on sequence length).
    pub sample_count: usize,
    pub high_odds_threshold: f64,
    pub high_odds_cap: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            sample_count: SAMPLE_COUNT,
            high_odds_threshold: HIGH_ODDS_THRESHOLD,
            high_odds_cap: HIGH_ODDS_CAP,
        }
    }
}

/// Weighted sampler over a fixed strata table.
///
/// Holds no per-run state, so one instance can serve every run of a batch
/// (including runs on other threads).
#[derive(Debug, Clone)]
pub struct Resampler<'a> {
    table: &'a StrataTable,
    index: WeightedIndex<f64>,
    config: ResampleConfig,
}

impl<'a> Resampler<'a> {
    /// Returns `None` when the table has nothing to sample from.
    pub fn new(table: &'a StrataTable, config: ResampleConfig) -> Option<Self> {
        let index = WeightedIndex::new(table.weights()).ok()?;
        Some(Self { table, index, config })
    }

    /// Draw one run's bet sequence, in draw order.
    ///
    /// Length is at most `sample_count`; every skipped or discarded draw
    /// still consumes an iteration.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<SimRow> {
        let strata = self.table.strata();
        let mut drawn = Vec::with_capacity(self.config.sample_count);
        let mut high_odds = 0usize;
        let mut discarded = 0usize;

        for _ in 0..self.config.sample_count {
            let stratum = &strata[self.index.sample(rng)];
            if stratum.rows.is_empty() {
                continue;
            }

            let row = stratum.rows[rng.gen_range(0..stratum.rows.len())];

            if row.bet_odds > self.config.high_odds_threshold {
                if high_odds >= self.config.high_odds_cap {
                    discarded += 1;
                    continue;
                }
                high_odds += 1;
            }

            drawn.push(row);
        }

        debug!(drawn = drawn.len(), high_odds, discarded, "Run sequence drawn");
        drawn
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
