//! Command-line interface definition.

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "odds-optimizer")]
#[command(version)]
#[command(about = "EV staking and bankroll Monte Carlo for 1X2 football bets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file path
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: String,
}

impl Cli {
    /// Subcommand to run; `simulate` when none is given.
    pub fn mode(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Simulate)
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Monte Carlo risk profile of the staking policy over the bet history
    Simulate,
    /// Select and size this week's bets from match predictions
    Stake(StakeArgs),
    /// Resolve placed bets against match results and append them to history
    Settle,
    /// Settle placed bets, then stake new ones
    Run {
        #[command(flatten)]
        stake: StakeArgs,
        /// Only resolve past bets, no new staking
        #[arg(long)]
        resolve_only: bool,
    },
}

/// Options of the live staking step.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct StakeArgs {
    /// Stake every bet at the minimum stake instead of the EV-weighted size
    #[arg(long)]
    pub min_risk: bool,
    /// Max number of bets kept this run (after sizing)
    #[arg(long)]
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
