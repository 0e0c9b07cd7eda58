//! OddsOptimizer: command-line entry point.
//!
//! Loads configuration, initialises structured logging and runs one of
//! four modes:
//!
//! - `simulate` (default): Monte Carlo risk profile of the staking policy
//!   over the historical bet table.
//! - `stake`: select and size this week's bets from match predictions.
//! - `settle`: resolve placed bets against match results and append them
//!   to the historical table.
//! - `run`: a full session, `settle` then `stake`.
//!
//! Usage: `odds-optimizer [-c config.toml] [simulate|stake|settle|run]`

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use odds_optimizer::cli::{Cli, Commands, StakeArgs};
use odds_optimizer::config::AppConfig;
use odds_optimizer::engine::settlement::settle_tables;
use odds_optimizer::simulation::MonteCarlo;
use odds_optimizer::storage::{self, JsonHistoryFile};
use odds_optimizer::strategy::selection::MatchPrediction;
use odds_optimizer::strategy::BetPlanner;

fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;
    init_logging();

    let mode = cli.mode();
    info!(mode = ?mode, config = %cli.config, "OddsOptimizer starting");

    match mode {
        Commands::Simulate => simulate(&cfg),
        Commands::Stake(args) => stake(&cfg, &args),
        Commands::Settle => settle_placed(&cfg),
        Commands::Run { stake: args, resolve_only } => {
            settle_placed(&cfg)?;
            if resolve_only {
                info!("Resolve-only session, no new bets staked");
                return Ok(());
            }
            stake(&cfg, &args)
        }
    }
}

/// Run the Monte Carlo batch and save its summary.
fn simulate(cfg: &AppConfig) -> Result<()> {
    let mc = MonteCarlo::new(cfg.simulation.monte_carlo())?;
    let source = JsonHistoryFile::new(&cfg.data.history_path);
    info!(path = %source.path().display(), "Simulating over historical bets");

    let report = mc.run_source(&source)?;
    let summary = report.summary();

    println!("{summary}");
    storage::save_json(&summary, &cfg.data.report_path)?;
    info!(path = %cfg.data.report_path, "Report saved");

    Ok(())
}

/// Turn predictions into sized pending bets.
fn stake(cfg: &AppConfig, args: &StakeArgs) -> Result<()> {
    let predictions: Vec<MatchPrediction> = storage::load_json(&cfg.data.predictions_path)?;
    let planner = BetPlanner::new(cfg.staking.ev_threshold, cfg.staking.policy())
        .with_min_stake_only(args.min_risk)
        .with_limit(args.limit);
    if args.min_risk {
        info!(stake = %cfg.staking.min_stake, "Overriding every stake to the minimum");
    }

    let pending = planner.plan(&predictions);
    if pending.is_empty() {
        warn!(predictions = predictions.len(), "No bets cleared the EV threshold");
    }

    for bet in &pending {
        info!(
            match_id = %bet.bet.match_id,
            side = %bet.bet.side,
            odds = bet.bet.bet_odds(),
            ev = format!("{:.4}", bet.bet.ev),
            stake = %bet.stake,
            "Pending bet"
        );
    }

    storage::save_json(&pending, &cfg.data.pending_path)?;
    Ok(())
}

/// Settle placed bets and move the settled ones into history.
fn settle_placed(cfg: &AppConfig) -> Result<()> {
    let report = settle_tables(
        &cfg.data.placed_path,
        &cfg.data.results_path,
        &cfg.data.history_path,
    )?;

    info!(
        settled = report.settled.len(),
        still_placed = report.pending.len(),
        hits = report.hits,
        roi = %report.roi().round_dp(4),
        "Settlement saved"
    );

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("odds_optimizer=info"));

    let json_logging = std::env::var("ODDS_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
