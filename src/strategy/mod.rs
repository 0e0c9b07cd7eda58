//! Strategy engine: bet selection and EV-weighted staking.

pub mod selection;
pub mod staking;

use tracing::info;

use selection::{select_candidates, MatchPrediction};
use staking::{StakedBet, StakingPolicy};

/// Pipelines selection → staking for one weekly batch of predictions.
pub struct BetPlanner {
    ev_threshold: f64,
    policy: StakingPolicy,
    /// Stake every bet at `min_stake` instead of its EV-weighted size.
    min_stake_only: bool,
    /// Keep at most this many bets, after sizing.
    limit: Option<usize>,
}

impl BetPlanner {
    pub fn new(ev_threshold: f64, policy: StakingPolicy) -> Self {
        Self {
            ev_threshold,
            policy,
            min_stake_only: false,
            limit: None,
        }
    }

    pub fn with_min_stake_only(mut self, min_stake_only: bool) -> Self {
        self.min_stake_only = min_stake_only;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Select the bets worth placing and size them.
    ///
    /// The limit truncates the sized batch: kept bets retain the stakes
    /// computed against the full batch budget.
    pub fn plan(&self, predictions: &[MatchPrediction]) -> Vec<StakedBet> {
        let candidates = select_candidates(predictions, self.ev_threshold);
        let budget = self.policy.live_budget(candidates.len());
        let mut staked = self.policy.size_batch(candidates);

        if self.min_stake_only {
            for bet in &mut staked {
                bet.stake = self.policy.min_stake;
            }
        }
        if let Some(limit) = self.limit {
            staked.truncate(limit);
        }

        info!(
            predictions = predictions.len(),
            bets = staked.len(),
            budget = format!("{budget:.2}"),
            min_stake_only = self.min_stake_only,
            limit = ?self.limit,
            "Bet plan ready"
        );

        staked
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
