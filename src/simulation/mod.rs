//! Bankroll risk simulation.
//!
//! Historical filter → stratifier → (resampler → bankroll simulator) × N
//! runs → aggregate report. The historical table is read once per batch;
//! every run owns its own drawn sequence and bankroll state.

pub mod bankroll;
pub mod filter;
pub mod monte_carlo;
pub mod resample;
pub mod stratify;

pub use bankroll::{BankrollConfig, BankrollSimulator, RunOutcome, RunResult, WindowRecord, WINDOW_SIZE};
pub use monte_carlo::{run_rng, AggregateReport, MonteCarlo, MonteCarloConfig, ReportSummary};
pub use resample::{ResampleConfig, Resampler, HIGH_ODDS_CAP, HIGH_ODDS_THRESHOLD, SAMPLE_COUNT};
pub use stratify::{bucket_index, StrataTable, Stratum, StratumKey, EV_BUCKET_EDGES, ODDS_BUCKET_EDGES};
