//! EV-weighted staking policy.
//!
//! Every candidate gets a raw weight `1 + ev * beta`; a capital budget is
//! split in proportion to those weights. The simulator budgets against the
//! current bankroll each window, the live path against a weekly slice of
//! the initial bankroll.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::selection::CandidateBet;

/// Batches this size or smaller get a proportionally reduced budget.
pub const FULL_BATCH: usize = 5;

/// Smallest stake the bookmaker accepts.
pub const MIN_STAKE: Decimal = dec!(0.1);

/// Split `budget` across bets in proportion to `1 + ev * beta`.
///
/// Stakes sum to `budget`. A non-positive weight sum can only come from a
/// negative `beta` and large EVs; it yields all-zero stakes.
pub fn allocate(evs: &[f64], beta: f64, budget: f64) -> Vec<f64> {
    if evs.is_empty() {
        return Vec::new();
    }

    let weights: Vec<f64> = evs.iter().map(|ev| 1.0 + ev * beta).collect();
    let total: f64 = weights.iter().sum();

    if !(total > 0.0 && total.is_finite()) {
        warn!(total, beta, bets = evs.len(), "Staking weights do not sum to a positive value");
        return vec![0.0; evs.len()];
    }

    weights.iter().map(|w| budget * w / total).collect()
}

// ---------------------------------------------------------------------------
// Live policy
// ---------------------------------------------------------------------------

/// A candidate bet with its stake attached; the unit handed to execution
/// and, once placed, to settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakedBet {
    #[serde(flatten)]
    pub bet: CandidateBet,
    pub stake: Decimal,
}

/// Live bet sizing for a weekly batch of candidates.
#[derive(Debug, Clone)]
pub struct StakingPolicy {
    /// EV sensitivity of the raw weights.
    pub beta: f64,
    /// Fraction of the initial bankroll deployed per week.
    pub weekly_exposure: f64,
    pub initial_bankroll: f64,
    /// Stakes below this are raised to it.
    pub min_stake: Decimal,
    /// Batch size at which the full weekly budget is used.
    pub full_batch: usize,
}

impl Default for StakingPolicy {
    fn default() -> Self {
        Self {
            beta: 2.0,
            weekly_exposure: 0.1,
            initial_bankroll: 100.0,
            min_stake: MIN_STAKE,
            full_batch: FULL_BATCH,
        }
    }
}

impl StakingPolicy {
    /// Budget for a batch of `batch_size` candidates.
    ///
    /// Small batches get `batch_size / full_batch` of the weekly budget
    /// instead of concentrating all of it on a few bets.
    pub fn live_budget(&self, batch_size: usize) -> f64 {
        let weekly = self.weekly_exposure * self.initial_bankroll;
        let full = self.full_batch.max(1);
        if batch_size > full {
            weekly
        } else {
            batch_size as f64 / full as f64 * weekly
        }
    }

    /// Stakes for a batch with the given EVs, rounded to cents and floored
    /// at `min_stake`. The floor can push the total above the budget.
    pub fn stakes(&self, evs: &[f64]) -> Vec<Decimal> {
        let budget = self.live_budget(evs.len());
        allocate(evs, self.beta, budget)
            .into_iter()
            .map(|stake| {
                let amount = Decimal::from_f64_retain(stake)
                    .unwrap_or(Decimal::ZERO)
                    .round_dp(2);
                amount.max(self.min_stake)
            })
            .collect()
    }

    /// Attach stakes to a batch of candidates.
    pub fn size_batch(&self, candidates: Vec<CandidateBet>) -> Vec<StakedBet> {
        let evs: Vec<f64> = candidates.iter().map(|c| c.ev).collect();
        let stakes = self.stakes(&evs);

        let sized: Vec<StakedBet> = candidates
            .into_iter()
            .zip(stakes)
            .map(|(bet, stake)| StakedBet { bet, stake })
            .collect();

        let total: Decimal = sized.iter().map(|s| s.stake).sum();
        debug!(
            bets = sized.len(),
            budget = format!("{:.2}", self.live_budget(sized.len())),
            total_stake = %total,
            "Batch sized"
        );

        sized
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BetSide, SideOdds, SideProbs};
    use chrono::NaiveDate;

    fn policy(beta: f64, weekly_exposure: f64, initial_bankroll: f64) -> StakingPolicy {
        StakingPolicy {
            beta,
            weekly_exposure,
            initial_bankroll,
            ..StakingPolicy::default()
        }
    }

    fn candidate(ev: f64) -> CandidateBet {
        CandidateBet {
            match_id: "Ajax vs PSV".into(),
            home_team: "Ajax".into(),
            away_team: "PSV".into(),
            side: BetSide::Home,
            kickoff: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            odds: SideOdds { home: 2.4, draw: 3.5, away: 2.9 },
            probs: SideProbs { home: 0.5, draw: 0.25, away: 0.25 },
            ev,
        }
    }

    #[test]
    fn test_allocate_proportional_to_weights() {
        let stakes = allocate(&[0.20, 0.10, 0.15], 2.0, 60.0);
        assert!((stakes[0] - 60.0 * 1.4 / 3.9).abs() < 1e-9);
        assert!((stakes[1] - 60.0 * 1.2 / 3.9).abs() < 1e-9);
        assert!((stakes[2] - 20.0).abs() < 1e-9);
        assert!((stakes.iter().sum::<f64>() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_allocate_zero_beta_is_uniform() {
        let stakes = allocate(&[0.5, 0.1, 0.9, 0.2], 0.0, 30.0);
        for s in stakes {
            assert!((s - 7.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_allocate_empty() {
        assert!(allocate(&[], 2.0, 100.0).is_empty());
    }

    #[test]
    fn test_allocate_degenerate_weights() {
        let stakes = allocate(&[1.0, 1.0], -1.0, 50.0);
        assert_eq!(stakes, vec![0.0, 0.0]);
    }

    #[test]
    fn test_live_budget_small_batch_scaled_down() {
        let p = policy(2.0, 0.1, 1000.0);
        assert!((p.live_budget(3) - 60.0).abs() < 1e-9);
        assert!((p.live_budget(5) - 100.0).abs() < 1e-9);
        assert!((p.live_budget(6) - 100.0).abs() < 1e-9);
        assert!((p.live_budget(40) - 100.0).abs() < 1e-9);
        assert_eq!(p.live_budget(0), 0.0);
    }

    #[test]
    fn test_three_bet_scenario() {
        let p = policy(2.0, 0.1, 1000.0);
        let stakes = p.stakes(&[0.20, 0.10, 0.15]);
        assert_eq!(stakes, vec![dec!(21.54), dec!(18.46), dec!(20.00)]);
        assert_eq!(stakes.iter().copied().sum::<Decimal>(), dec!(60.00));
    }

    #[test]
    fn test_min_stake_floor() {
        // 6 bets, budget 0.1 * 10 = 1.00; the five zero-EV bets get ~0.002 each.
        let p = policy(100.0, 0.1, 10.0);
        let stakes = p.stakes(&[5.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(stakes[0], dec!(0.99));
        for s in &stakes[1..] {
            assert_eq!(*s, dec!(0.1));
        }
        // Floor pushes deployment over budget.
        assert!(stakes.iter().copied().sum::<Decimal>() > dec!(1.00));
    }

    #[test]
    fn test_size_batch_keeps_order() {
        let p = policy(2.0, 0.1, 1000.0);
        let sized = p.size_batch(vec![candidate(0.20), candidate(0.10), candidate(0.15)]);
        assert_eq!(sized.len(), 3);
        assert_eq!(sized[0].bet.ev, 0.20);
        assert_eq!(sized[0].stake, dec!(21.54));
        assert_eq!(sized[2].stake, dec!(20.00));
    }

    #[test]
    fn test_staked_bet_json_is_flat() {
        let p = policy(2.0, 0.1, 1000.0);
        let sized = p.size_batch(vec![candidate(0.3)]);
        let json = serde_json::to_value(&sized[0]).unwrap();
        assert_eq!(json["side"], "home");
        assert!(json["stake"].is_number());
        assert_eq!(json["match_id"], "Ajax vs PSV");
    }
}
