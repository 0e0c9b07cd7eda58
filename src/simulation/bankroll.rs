//! Bankroll simulator.
//!
//! Replays one run's drawn sequence in fixed windows of bets. Each window
//! is staked against the current bankroll, settled with Bernoulli draws on
//! the model win rate, and folded into bankroll, peak, drawdown and ruin
//! state. The historical `hit` flags are settled alongside as a
//! diagnostic only; they never touch the bankroll.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::strategy::staking::allocate;
use crate::types::SimRow;

/// Bets per staking window.
pub const WINDOW_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct BankrollConfig {
    pub initial_balance: f64,
    /// EV sensitivity of the staking weights.
    pub beta: f64,
    /// Fraction of the current bankroll staked per window.
    pub max_risk: f64,
    /// Fraction of the initial balance at or below which a run is ruined.
    pub ruin_threshold: f64,
    pub window_size: usize,
}

impl Default for BankrollConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100.0,
            beta: 2.0,
            max_risk: 0.3,
            ruin_threshold: 0.5,
            window_size: WINDOW_SIZE,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// State after one processed window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowRecord {
    /// Simulated profit of the window.
    pub profit: f64,
    /// Profit the same stakes would have made on the historical outcomes.
    pub historical_profit: f64,
    pub simulated_wins: usize,
    pub bankroll: f64,
    pub peak: f64,
    /// Largest peak-to-current shortfall so far in the run.
    pub drawdown: f64,
}

/// Per-run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub final_bankroll: f64,
    pub roi: f64,
    pub ruined: bool,
    pub max_drawdown: f64,
    /// Population standard deviation of window profits.
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Windows that closed below the initial balance.
    pub underwater_time: usize,
    pub simulated_hit_rate: f64,
    pub windows: usize,
    pub bets: usize,
    /// Sum of `WindowRecord::historical_profit`; diagnostic only.
    pub historical_profit: f64,
}

/// A run's summary together with its window-by-window trace.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: RunResult,
    pub windows: Vec<WindowRecord>,
}

struct WindowSettlement {
    profit: f64,
    historical_profit: f64,
    wins: usize,
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BankrollSimulator {
    config: BankrollConfig,
}

impl BankrollSimulator {
    pub fn new(config: BankrollConfig) -> Self {
        Self { config }
    }

    /// Replay `bets` window by window. A trailing partial window is not
    /// played; ruin stops the run immediately.
    pub fn replay<R: Rng + ?Sized>(&self, bets: &[SimRow], rng: &mut R) -> RunOutcome {
        let initial = self.config.initial_balance;
        let ruin_level = self.config.ruin_threshold * initial;

        let mut bankroll = initial;
        let mut peak = initial;
        let mut drawdown = 0.0_f64;
        let mut underwater_time = 0usize;
        let mut ruined = false;
        let mut profits: Vec<f64> = Vec::new();
        let mut windows: Vec<WindowRecord> = Vec::new();
        let mut simulated_wins = 0usize;
        let mut bets_played = 0usize;
        let mut historical_profit = 0.0_f64;

        for window in bets.chunks_exact(self.config.window_size.max(1)) {
            let settled = self.settle_window(window, bankroll, rng);

            profits.push(settled.profit);
            simulated_wins += settled.wins;
            bets_played += window.len();
            historical_profit += settled.historical_profit;

            bankroll += settled.profit;
            peak = peak.max(bankroll);
            drawdown = drawdown.max(peak - bankroll);

            if bankroll < initial {
                underwater_time += 1;
            }

            windows.push(WindowRecord {
                profit: settled.profit,
                historical_profit: settled.historical_profit,
                simulated_wins: settled.wins,
                bankroll,
                peak,
                drawdown,
            });

            if bankroll <= ruin_level {
                ruined = true;
                debug!(
                    window = windows.len(),
                    bankroll = format!("{bankroll:.2}"),
                    ruin_level = format!("{ruin_level:.2}"),
                    "Run ruined"
                );
                break;
            }
        }

        let volatility = population_std(&profits);
        let sharpe_ratio = if volatility > 0.0 {
            mean(&profits) / volatility
        } else {
            0.0
        };
        let simulated_hit_rate = if bets_played > 0 {
            simulated_wins as f64 / bets_played as f64
        } else {
            0.0
        };

        let result = RunResult {
            final_bankroll: bankroll,
            roi: (bankroll - initial) / initial,
            ruined,
            max_drawdown: drawdown,
            volatility,
            sharpe_ratio,
            underwater_time,
            simulated_hit_rate,
            windows: windows.len(),
            bets: bets_played,
            historical_profit,
        };

        RunOutcome { result, windows }
    }

    /// Stake one window against `bankroll` and settle it.
    fn settle_window<R: Rng + ?Sized>(
        &self,
        window: &[SimRow],
        bankroll: f64,
        rng: &mut R,
    ) -> WindowSettlement {
        let evs: Vec<f64> = window.iter().map(|b| b.ev).collect();
        let stakes = allocate(&evs, self.config.beta, self.config.max_risk * bankroll);

        let mut settled = WindowSettlement {
            profit: 0.0,
            historical_profit: 0.0,
            wins: 0,
        };

        for (bet, stake) in window.iter().zip(stakes) {
            let won = rng.gen::<f64>() < bet.bet_win_rate;
            let win_payout = stake * (bet.bet_odds - 1.0);

            if won {
                settled.wins += 1;
                settled.profit += win_payout;
            } else {
                settled.profit -= stake;
            }

            settled.historical_profit += if bet.hit { win_payout } else { -stake };
        }

        settled
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation; 0 for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
