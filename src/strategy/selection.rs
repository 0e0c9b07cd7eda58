//! Bet selection.
//!
//! Evaluates the expected value of all three sides of an upcoming match
//! from model probabilities and bookmaker odds, and turns the matches
//! whose best side clears the EV threshold into candidate bets.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{BetSide, SideOdds, SideProbs};

/// Model prediction for an upcoming match, linked to its bookmaker odds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPrediction {
    pub home_team: String,
    pub away_team: String,
    pub kickoff: NaiveDate,
    pub probs: SideProbs,
    pub odds: SideOdds,
}

/// A match side worth betting on, before staking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateBet {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub side: BetSide,
    pub kickoff: NaiveDate,
    pub odds: SideOdds,
    pub probs: SideProbs,
    pub ev: f64,
}

impl CandidateBet {
    /// Odds of the chosen side.
    pub fn bet_odds(&self) -> f64 {
        self.odds.for_side(self.side)
    }

    /// Model win probability of the chosen side.
    pub fn win_rate(&self) -> f64 {
        self.probs.for_side(self.side)
    }

    /// Team backed by this bet, or "draw".
    pub fn team(&self) -> &str {
        match self.side {
            BetSide::Home => &self.home_team,
            BetSide::Draw => "draw",
            BetSide::Away => &self.away_team,
        }
    }
}

/// `p * (odds - 1) - (1 - p)`: expected profit per unit staked.
pub fn expected_value(probability: f64, odds: f64) -> f64 {
    probability * (odds - 1.0) - (1.0 - probability)
}

/// Side with the highest EV. Ties go to the earlier of Home, Draw, Away.
pub fn best_side(prediction: &MatchPrediction) -> (BetSide, f64) {
    let mut best = (BetSide::Home, f64::NEG_INFINITY);
    for side in BetSide::ALL {
        let ev = expected_value(prediction.probs.for_side(side), prediction.odds.for_side(side));
        if ev > best.1 {
            best = (side, ev);
        }
    }
    best
}

/// Candidates for every prediction whose best EV is at least `ev_threshold`.
pub fn select_candidates(predictions: &[MatchPrediction], ev_threshold: f64) -> Vec<CandidateBet> {
    let candidates: Vec<CandidateBet> = predictions
        .iter()
        .filter_map(|p| {
            let (side, ev) = best_side(p);
            if ev < ev_threshold {
                debug!(
                    home = %p.home_team,
                    away = %p.away_team,
                    ev = format!("{ev:.4}"),
                    "Best side below EV threshold"
                );
                return None;
            }
            Some(CandidateBet {
                match_id: format!("{} vs {}", p.home_team, p.away_team),
                home_team: p.home_team.clone(),
                away_team: p.away_team.clone(),
                side,
                kickoff: p.kickoff,
                odds: p.odds,
                probs: p.probs,
                ev,
            })
        })
        .collect();

    debug!(
        predictions = predictions.len(),
        candidates = candidates.len(),
        ev_threshold,
        "Candidates selected"
    );

    candidates
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
