//! Monte Carlo driver.
//!
//! Filters and stratifies the historical table once, then runs many
//! independent resample-and-replay runs and collects their summaries into
//! an [`AggregateReport`].
//!
//! Runs share nothing mutable. With [`MonteCarlo::run`] each run gets its
//! own ChaCha stream derived from `(seed, run_index)`, so the report is
//! identical whether runs execute on the rayon pool or one after another.
//! [`MonteCarlo::run_with_rng`] instead threads one caller-owned generator
//! through all runs sequentially.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::bankroll::{BankrollConfig, BankrollSimulator, RunResult, WINDOW_SIZE};
use super::filter::{filter_records, validate_table};
use super::resample::{ResampleConfig, Resampler};
use super::stratify::StrataTable;
use crate::storage::HistorySource;
use crate::types::{HistoricalBetRecord, OddsError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Simulation entry parameters.
#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    pub num_simulations: usize,
    pub initial_balance: f64,
    pub beta: f64,
    pub max_risk: f64,
    pub ruin_threshold: f64,
    /// Historical rows need `ev` strictly above this.
    pub ev_threshold: f64,
    pub seed: u64,
    /// Spread runs over the rayon pool.
    pub parallel: bool,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            initial_balance: 100.0,
            beta: 2.0,
            max_risk: 0.3,
            ruin_threshold: 0.5,
            ev_threshold: 0.1,
            seed: 2,
            parallel: true,
        }
    }
}

impl MonteCarloConfig {
    /// Check parameter ranges.
    pub fn validate(&self) -> Result<(), OddsError> {
        if self.num_simulations < 1 {
            return Err(OddsError::Config("num_simulations must be at least 1".into()));
        }
        if !(self.initial_balance > 0.0 && self.initial_balance.is_finite()) {
            return Err(OddsError::Config(format!(
                "initial_balance must be positive, got {}",
                self.initial_balance
            )));
        }
        if !self.beta.is_finite() {
            return Err(OddsError::Config("beta must be finite".into()));
        }
        if !(self.max_risk > 0.0 && self.max_risk <= 1.0) {
            return Err(OddsError::Config(format!(
                "max_risk must be in (0, 1], got {}",
                self.max_risk
            )));
        }
        if !(self.ruin_threshold >= 0.0 && self.ruin_threshold < 1.0) {
            return Err(OddsError::Config(format!(
                "ruin_threshold must be in [0, 1), got {}",
                self.ruin_threshold
            )));
        }
        if !self.ev_threshold.is_finite() {
            return Err(OddsError::Config("ev_threshold must be finite".into()));
        }
        Ok(())
    }

    fn bankroll_config(&self) -> BankrollConfig {
        BankrollConfig {
            initial_balance: self.initial_balance,
            beta: self.beta,
            max_risk: self.max_risk,
            ruin_threshold: self.ruin_threshold,
            window_size: WINDOW_SIZE,
        }
    }
}

/// Generator for run `run_index` of a batch seeded with `seed`.
pub fn run_rng(seed: u64, run_index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(run_index as u64);
    rng
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

pub struct MonteCarlo {
    config: MonteCarloConfig,
    resample: ResampleConfig,
    simulator: BankrollSimulator,
}

impl MonteCarlo {
    pub fn new(config: MonteCarloConfig) -> Result<Self, OddsError> {
        config.validate()?;
        let simulator = BankrollSimulator::new(config.bankroll_config());
        Ok(Self {
            config,
            resample: ResampleConfig::default(),
            simulator,
        })
    }

    /// Override sample count and long-shot cap.
    pub fn with_resample_config(mut self, resample: ResampleConfig) -> Self {
        self.resample = resample;
        self
    }

    /// Validate, filter and stratify the historical table.
    pub fn prepare(&self, records: &[HistoricalBetRecord]) -> Result<StrataTable, OddsError> {
        validate_table(records)?;
        let rows = filter_records(records, self.config.ev_threshold);
        let table = StrataTable::build(&rows);
        if table.is_empty() {
            return Err(OddsError::NoEligibleRecords {
                ev_threshold: self.config.ev_threshold,
            });
        }
        Ok(table)
    }

    /// Run the batch with per-run generators derived from the configured seed.
    pub fn run(&self, records: &[HistoricalBetRecord]) -> Result<AggregateReport, OddsError> {
        let table = self.prepare(records)?;
        let resampler = self.resampler(&table)?;
        self.log_start(&table);

        let seed = self.config.seed;
        let n = self.config.num_simulations;
        let runs: Vec<RunResult> = if self.config.parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.run_once(&resampler, &mut run_rng(seed, i)))
                .collect()
        } else {
            (0..n)
                .map(|i| self.run_once(&resampler, &mut run_rng(seed, i)))
                .collect()
        };

        Ok(self.finish(runs, &table))
    }

    /// Run the batch sequentially, drawing everything from `rng`.
    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        records: &[HistoricalBetRecord],
        rng: &mut R,
    ) -> Result<AggregateReport, OddsError> {
        let table = self.prepare(records)?;
        let resampler = self.resampler(&table)?;
        self.log_start(&table);

        let runs: Vec<RunResult> = (0..self.config.num_simulations)
            .map(|_| self.run_once(&resampler, rng))
            .collect();

        Ok(self.finish(runs, &table))
    }

    /// Load history from `source` and run the batch.
    pub fn run_source(&self, source: &dyn HistorySource) -> Result<AggregateReport> {
        let records = source.load().context("Failed to load historical bets")?;
        let report = self.run(&records)?;
        Ok(report)
    }

    fn resampler<'a>(&self, table: &'a StrataTable) -> Result<Resampler<'a>, OddsError> {
        Resampler::new(table, self.resample.clone()).ok_or(OddsError::NoEligibleRecords {
            ev_threshold: self.config.ev_threshold,
        })
    }

    fn run_once<R: Rng + ?Sized>(&self, resampler: &Resampler<'_>, rng: &mut R) -> RunResult {
        let drawn = resampler.draw(rng);
        self.simulator.replay(&drawn, rng).result
    }

    fn log_start(&self, table: &StrataTable) {
        info!(
            runs = self.config.num_simulations,
            eligible = table.total(),
            strata = table.strata().len(),
            initial_balance = self.config.initial_balance,
            beta = self.config.beta,
            max_risk = self.config.max_risk,
            ruin_threshold = self.config.ruin_threshold,
            parallel = self.config.parallel,
            "Starting Monte Carlo batch"
        );
        for s in table.strata() {
            debug!(stratum = %s.key, rows = s.rows.len(), weight = format!("{:.4}", s.weight), "Stratum");
        }
    }

    fn finish(&self, runs: Vec<RunResult>, table: &StrataTable) -> AggregateReport {
        let report = AggregateReport {
            runs,
            eligible_records: table.total(),
            strata: table.strata().len(),
        };
        info!(
            runs = report.len(),
            mean_roi = format!("{:.4}", report.mean_roi()),
            ruin_probability = format!("{:.4}", report.ruin_probability()),
            mean_final_bankroll = format!("{:.2}", report.mean_final_bankroll()),
            "Monte Carlo batch complete"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Aggregate report
// ---------------------------------------------------------------------------

/// All run summaries of one batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub runs: Vec<RunResult>,
    pub eligible_records: usize,
    pub strata: usize,
}

impl AggregateReport {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Column mean of `f` over all runs; 0 for an empty report.
    pub fn mean_of<F>(&self, f: F) -> f64
    where
        F: Fn(&RunResult) -> f64,
    {
        if self.runs.is_empty() {
            return 0.0;
        }
        self.runs.iter().map(f).sum::<f64>() / self.runs.len() as f64
    }

    pub fn mean_roi(&self) -> f64 {
        self.mean_of(|r| r.roi)
    }

    pub fn mean_max_drawdown(&self) -> f64 {
        self.mean_of(|r| r.max_drawdown)
    }

    pub fn mean_volatility(&self) -> f64 {
        self.mean_of(|r| r.volatility)
    }

    pub fn mean_sharpe(&self) -> f64 {
        self.mean_of(|r| r.sharpe_ratio)
    }

    pub fn mean_underwater_time(&self) -> f64 {
        self.mean_of(|r| r.underwater_time as f64)
    }

    /// Fraction of runs that ended in ruin.
    pub fn ruin_probability(&self) -> f64 {
        self.mean_of(|r| if r.ruined { 1.0 } else { 0.0 })
    }

    pub fn mean_final_bankroll(&self) -> f64 {
        self.mean_of(|r| r.final_bankroll)
    }

    pub fn mean_hit_rate(&self) -> f64 {
        self.mean_of(|r| r.simulated_hit_rate)
    }

    /// ROI at quantile `q` in [0, 1] (nearest rank).
    pub fn roi_quantile(&self, q: f64) -> f64 {
        let mut rois: Vec<f64> = self.runs.iter().map(|r| r.roi).collect();
        if rois.is_empty() {
            return 0.0;
        }
        rois.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = (q.clamp(0.0, 1.0) * (rois.len() - 1) as f64).round() as usize;
        rois[idx.min(rois.len() - 1)]
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            generated_at: Utc::now(),
            runs: self.len(),
            eligible_records: self.eligible_records,
            strata: self.strata,
            mean_roi: self.mean_roi(),
            roi_p05: self.roi_quantile(0.05),
            roi_p50: self.roi_quantile(0.50),
            roi_p95: self.roi_quantile(0.95),
            mean_max_drawdown: self.mean_max_drawdown(),
            mean_volatility: self.mean_volatility(),
            mean_sharpe: self.mean_sharpe(),
            mean_underwater_time: self.mean_underwater_time(),
            ruin_probability: self.ruin_probability(),
            mean_final_bankroll: self.mean_final_bankroll(),
            mean_hit_rate: self.mean_hit_rate(),
        }
    }
}

/// Column means of a report: the strategy's risk profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub generated_at: DateTime<Utc>,
    pub runs: usize,
    pub eligible_records: usize,
    pub strata: usize,
    pub mean_roi: f64,
    pub roi_p05: f64,
    pub roi_p50: f64,
    pub roi_p95: f64,
    pub mean_max_drawdown: f64,
    pub mean_volatility: f64,
    pub mean_sharpe: f64,
    pub mean_underwater_time: f64,
    pub ruin_probability: f64,
    pub mean_final_bankroll: f64,
    pub mean_hit_rate: f64,
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Monte Carlo results ({} runs, {} records in {} strata)", self.runs, self.eligible_records, self.strata)?;
        writeln!(f, "  Average ROI:              {:.4}", self.mean_roi)?;
        writeln!(f, "  ROI 5% / 50% / 95%:       {:.4} / {:.4} / {:.4}", self.roi_p05, self.roi_p50, self.roi_p95)?;
        writeln!(f, "  Average max drawdown:     {:.2}", self.mean_max_drawdown)?;
        writeln!(f, "  Average volatility:       {:.4}", self.mean_volatility)?;
        writeln!(f, "  Average Sharpe ratio:     {:.4}", self.mean_sharpe)?;
        writeln!(f, "  Average time underwater:  {:.2}", self.mean_underwater_time)?;
        writeln!(f, "  Ruined simulations:       {:.2}%", self.ruin_probability * 100.0)?;
        writeln!(f, "  Average final bankroll:   {:.2}", self.mean_final_bankroll)?;
        write!(f, "  Average simulated hit rate: {:.4}", self.mean_hit_rate)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockHistorySource;

    fn record(bet: &str, outcome: &str, odds: (f64, f64, f64), probs: (f64, f64, f64), ev: f64) -> HistoricalBetRecord {
        HistoricalBetRecord {
            bet: Some(bet.into()),
            outcome: Some(outcome.into()),
            odds_home: Some(odds.0),
            odds_draw: Some(odds.1),
            odds_away: Some(odds.2),
            home_win_pct: Some(probs.0),
            draw_win_pct: Some(probs.1),
            away_win_pct: Some(probs.2),
            ev: Some(ev),
        }
    }

    fn history() -> Vec<HistoricalBetRecord> {
        let mut rows = Vec::new();
        for i in 0..40 {
            let f = i as f64;
            rows.push(record("home", if i % 2 == 0 { "home" } else { "away" }, (1.8 + f * 0.01, 3.6, 4.5), (0.62, 0.22, 0.16), 0.11 + f * 0.002));
            rows.push(record("draw", if i % 4 == 0 { "draw" } else { "home" }, (2.2, 3.4 + f * 0.02, 3.3), (0.4, 0.34, 0.26), 0.16 + f * 0.003));
            rows.push(record("away", if i % 3 == 0 { "away" } else { "home" }, (1.5, 4.2, 6.5 + f * 0.1), (0.55, 0.25, 0.2), 0.3 + f * 0.004));
        }
        // Below the EV threshold and incomplete rows.
        rows.push(record("home", "home", (2.0, 3.0, 4.0), (0.5, 0.3, 0.2), 0.05));
        rows.push(HistoricalBetRecord { ev: Some(0.4), ..Default::default() });
        rows
    }

    fn config(num_simulations: usize) -> MonteCarloConfig {
        MonteCarloConfig {
            num_simulations,
            ..MonteCarloConfig::default()
        }
    }

    #[test]
    fn test_report_shape() {
        let mc = MonteCarlo::new(config(50)).unwrap();
        let report = mc.run(&history()).unwrap();
        assert_eq!(report.len(), 50);
        assert_eq!(report.eligible_records, 120);
        let p = report.ruin_probability();
        assert!((0.0..=1.0).contains(&p));
        for r in &report.runs {
            assert!(r.bets <= 600);
            assert_eq!(r.bets, r.windows * WINDOW_SIZE);
        }
    }

    #[test]
    fn test_ruin_probability_is_fraction_of_ruined_runs() {
        let mc = MonteCarlo::new(MonteCarloConfig {
            max_risk: 0.9,
            ruin_threshold: 0.7,
            ..config(80)
        })
        .unwrap();
        let report = mc.run(&history()).unwrap();
        let ruined = report.runs.iter().filter(|r| r.ruined).count();
        assert!((report.ruin_probability() - ruined as f64 / 80.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_ruin_threshold_never_ruins() {
        let mc = MonteCarlo::new(MonteCarloConfig {
            ruin_threshold: 0.0,
            max_risk: 0.5,
            ..config(40)
        })
        .unwrap();
        let report = mc.run(&history()).unwrap();
        assert_eq!(report.ruin_probability(), 0.0);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let parallel = MonteCarlo::new(MonteCarloConfig { parallel: true, ..config(30) }).unwrap();
        let sequential = MonteCarlo::new(MonteCarloConfig { parallel: false, ..config(30) }).unwrap();
        let a = parallel.run(&history()).unwrap();
        let b = sequential.run(&history()).unwrap();
        assert_eq!(a.runs, b.runs);
    }

    #[test]
    fn test_injected_rng_is_reproducible() {
        let mc = MonteCarlo::new(config(20)).unwrap();
        let a = mc.run_with_rng(&history(), &mut ChaCha8Rng::seed_from_u64(17)).unwrap();
        let b = mc.run_with_rng(&history(), &mut ChaCha8Rng::seed_from_u64(17)).unwrap();
        assert_eq!(a.runs, b.runs);
        // Runs are independent draws, not copies of each other.
        assert!(a.runs.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_resample_override_shortens_runs() {
        let mc = MonteCarlo::new(config(15))
            .unwrap()
            .with_resample_config(ResampleConfig {
                sample_count: 45,
                high_odds_threshold: 6.0,
                high_odds_cap: 0,
            });
        let report = mc.run(&history()).unwrap();
        for r in &report.runs {
            assert!(r.windows <= 2);
            assert!(r.bets <= 40);
        }
    }

    #[test]
    fn test_empty_history_is_fatal() {
        let mc = MonteCarlo::new(config(5)).unwrap();
        assert!(matches!(mc.run(&[]), Err(OddsError::EmptyHistory)));
    }

    #[test]
    fn test_nothing_above_threshold_is_fatal() {
        let mc = MonteCarlo::new(MonteCarloConfig { ev_threshold: 5.0, ..config(5) }).unwrap();
        assert!(matches!(
            mc.run(&history()),
            Err(OddsError::NoEligibleRecords { .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        for bad in [
            MonteCarloConfig { num_simulations: 0, ..config(1) },
            MonteCarloConfig { initial_balance: 0.0, ..config(1) },
            MonteCarloConfig { max_risk: 0.0, ..config(1) },
            MonteCarloConfig { max_risk: 1.5, ..config(1) },
            MonteCarloConfig { ruin_threshold: 1.0, ..config(1) },
            MonteCarloConfig { ruin_threshold: -0.1, ..config(1) },
            MonteCarloConfig { beta: f64::NAN, ..config(1) },
        ] {
            assert!(matches!(MonteCarlo::new(bad), Err(OddsError::Config(_))));
        }
    }

    #[test]
    fn test_run_source_uses_loaded_history() {
        let mut source = MockHistorySource::new();
        source.expect_load().times(1).returning(|| Ok(history()));
        let mc = MonteCarlo::new(config(10)).unwrap();
        let report = mc.run_source(&source).unwrap();
        assert_eq!(report.len(), 10);
    }

    #[test]
    fn test_run_source_propagates_load_error() {
        let mut source = MockHistorySource::new();
        source
            .expect_load()
            .returning(|| Err(anyhow::anyhow!("disk on fire")));
        let mc = MonteCarlo::new(config(10)).unwrap();
        let err = mc.run_source(&source).unwrap_err();
        assert!(format!("{err:#}").contains("disk on fire"));
    }

    #[test]
    fn test_summary_means() {
        let report = AggregateReport {
            runs: vec![
                RunResult {
                    final_bankroll: 150.0,
                    roi: 0.5,
                    ruined: false,
                    max_drawdown: 10.0,
                    volatility: 4.0,
                    sharpe_ratio: 0.5,
                    underwater_time: 2,
                    simulated_hit_rate: 0.5,
                    windows: 30,
                    bets: 600,
                    historical_profit: 12.0,
                },
                RunResult {
                    final_bankroll: 40.0,
                    roi: -0.6,
                    ruined: true,
                    max_drawdown: 70.0,
                    volatility: 8.0,
                    sharpe_ratio: -0.5,
                    underwater_time: 6,
                    simulated_hit_rate: 0.3,
                    windows: 6,
                    bets: 120,
                    historical_profit: -3.0,
                },
            ],
            eligible_records: 10,
            strata: 2,
        };
        let s = report.summary();
        assert!((s.mean_roi + 0.05).abs() < 1e-12);
        assert!((s.ruin_probability - 0.5).abs() < 1e-12);
        assert!((s.mean_final_bankroll - 95.0).abs() < 1e-12);
        assert!((s.mean_underwater_time - 4.0).abs() < 1e-12);
        assert!((s.mean_max_drawdown - 40.0).abs() < 1e-12);
        assert_eq!(s.roi_p05, -0.6);
        assert_eq!(s.roi_p95, 0.5);
        assert!(s.to_string().contains("Ruined simulations:       50.00%"));
    }

    #[test]
    fn test_empty_report_means_are_zero() {
        let report = AggregateReport { runs: vec![], eligible_records: 0, strata: 0 };
        assert_eq!(report.mean_roi(), 0.0);
        assert_eq!(report.ruin_probability(), 0.0);
        assert_eq!(report.roi_quantile(0.5), 0.0);
    }
}
