//! Settlement: resolves placed bets against finished matches.
//!
//! A placed bet settles against the first result played on its kickoff
//! date that involves either of its teams. Settled bets carry hit, payout
//! and profit, and convert back into historical rows so the next
//! simulation batch sees them.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::storage;
use crate::strategy::staking::StakedBet;
use crate::types::{BetSide, HistoricalBetRecord};

/// Final result of a played match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub home_team: String,
    pub away_team: String,
    pub date: NaiveDate,
    pub outcome: BetSide,
}

impl MatchResult {
    fn involves(&self, bet: &StakedBet) -> bool {
        self.date == bet.bet.kickoff
            && (self.home_team == bet.bet.home_team || self.away_team == bet.bet.away_team)
    }
}

/// A placed bet with its outcome applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledBet {
    #[serde(flatten)]
    pub placed: StakedBet,
    pub outcome: BetSide,
    pub hit: bool,
    /// Amount returned by the bookmaker (`stake * odds`), or `-stake` on a loss.
    pub payout: Decimal,
    /// Net result of the bet.
    pub profit: Decimal,
}

impl SettledBet {
    /// Row for the historical table.
    pub fn to_history_record(&self) -> HistoricalBetRecord {
        let bet = &self.placed.bet;
        HistoricalBetRecord {
            bet: Some(bet.side.to_string()),
            outcome: Some(self.outcome.to_string()),
            odds_home: Some(bet.odds.home),
            odds_draw: Some(bet.odds.draw),
            odds_away: Some(bet.odds.away),
            home_win_pct: Some(bet.probs.home),
            draw_win_pct: Some(bet.probs.draw),
            away_win_pct: Some(bet.probs.away),
            ev: Some(bet.ev),
        }
    }
}

/// Apply `outcome` to a placed bet.
pub fn settle_bet(placed: &StakedBet, outcome: BetSide) -> SettledBet {
    let stake = placed.stake;
    let odds = Decimal::from_f64_retain(placed.bet.bet_odds()).unwrap_or(Decimal::ZERO);
    let hit = placed.bet.side == outcome;

    let (payout, profit) = if hit {
        ((stake * odds).round_dp(2), (stake * (odds - Decimal::ONE)).round_dp(2))
    } else {
        (-stake, -stake)
    };

    SettledBet {
        placed: placed.clone(),
        outcome,
        hit,
        payout,
        profit,
    }
}

/// Outcome of one settlement pass.
#[derive(Debug, Clone, Default)]
pub struct SettlementReport {
    pub settled: Vec<SettledBet>,
    /// Bets with no matching result yet.
    pub pending: Vec<StakedBet>,
    pub total_staked: Decimal,
    pub total_profit: Decimal,
    pub hits: usize,
}

impl SettlementReport {
    /// Profit over stake of the settled bets; 0 when nothing settled.
    pub fn roi(&self) -> Decimal {
        if self.total_staked.is_zero() {
            Decimal::ZERO
        } else {
            self.total_profit / self.total_staked
        }
    }
}

/// Settle every placed bet that has a result; keep the rest pending.
pub fn settle(placed: Vec<StakedBet>, results: &[MatchResult]) -> SettlementReport {
    let mut report = SettlementReport::default();

    for bet in placed {
        match results.iter().find(|r| r.involves(&bet)) {
            Some(result) => {
                let settled = settle_bet(&bet, result.outcome);
                debug!(
                    match_id = %bet.bet.match_id,
                    side = %bet.bet.side,
                    outcome = %result.outcome,
                    profit = %settled.profit,
                    "Bet settled"
                );
                report.total_staked += settled.placed.stake;
                report.total_profit += settled.profit;
                if settled.hit {
                    report.hits += 1;
                }
                report.settled.push(settled);
            }
            None => report.pending.push(bet),
        }
    }

    info!(
        settled = report.settled.len(),
        pending = report.pending.len(),
        hits = report.hits,
        staked = %report.total_staked,
        profit = %report.total_profit,
        "Settlement complete"
    );

    report
}

/// Settle the placed table against the results table and append the
/// settled rows to the history table. Missing tables count as empty.
///
/// The placed table is rewritten before the history table, so a failed
/// history write never leaves settled bets behind to be settled twice.
pub fn settle_tables(
    placed_path: impl AsRef<Path>,
    results_path: impl AsRef<Path>,
    history_path: impl AsRef<Path>,
) -> Result<SettlementReport> {
    let placed: Vec<StakedBet> = storage::load_rows_or_empty(&placed_path)?;
    let results: Vec<MatchResult> = storage::load_rows_or_empty(&results_path)?;
    let mut history: Vec<HistoricalBetRecord> = storage::load_rows_or_empty(&history_path)?;

    let report = settle(placed, &results);
    history.extend(report.settled.iter().map(SettledBet::to_history_record));

    storage::save_json(&report.pending, &placed_path)?;
    storage::save_json(&history, &history_path)?;

    debug!(history_rows = history.len(), "History table updated");
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::selection::CandidateBet;
    use crate::types::{SideOdds, SideProbs};
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn placed(home: &str, away: &str, side: BetSide, kickoff: NaiveDate, stake: Decimal) -> StakedBet {
        StakedBet {
            bet: CandidateBet {
                match_id: format!("{home} vs {away}"),
                home_team: home.into(),
                away_team: away.into(),
                side,
                kickoff,
                odds: SideOdds { home: 2.5, draw: 3.2, away: 3.0 },
                probs: SideProbs { home: 0.48, draw: 0.27, away: 0.25 },
                ev: 0.2,
            },
            stake,
        }
    }

    fn result(home: &str, away: &str, d: NaiveDate, outcome: BetSide) -> MatchResult {
        MatchResult {
            home_team: home.into(),
            away_team: away.into(),
            date: d,
            outcome,
        }
    }

    #[test]
    fn test_settle_winning_bet() {
        let s = settle_bet(&placed("AZ", "Utrecht", BetSide::Home, date(3), dec!(10)), BetSide::Home);
        assert!(s.hit);
        assert_eq!(s.payout, dec!(25.00));
        assert_eq!(s.profit, dec!(15.00));
    }

    #[test]
    fn test_settle_losing_bet() {
        let s = settle_bet(&placed("AZ", "Utrecht", BetSide::Draw, date(3), dec!(4.5)), BetSide::Away);
        assert!(!s.hit);
        assert_eq!(s.payout, dec!(-4.5));
        assert_eq!(s.profit, dec!(-4.5));
    }

    #[test]
    fn test_settle_batch_matches_by_date_and_team() {
        let bets = vec![
            placed("AZ", "Utrecht", BetSide::Home, date(3), dec!(10)),
            placed("Ajax", "PSV", BetSide::Draw, date(4), dec!(5)),
            placed("Heerenveen", "Vitesse", BetSide::Away, date(4), dec!(2)),
        ];
        let results = vec![
            result("AZ", "Utrecht", date(3), BetSide::Home),
            result("Ajax", "PSV", date(4), BetSide::Draw),
            result("Heerenveen", "Vitesse", date(5), BetSide::Away), // different day
        ];

        let report = settle(bets, &results);
        assert_eq!(report.settled.len(), 2);
        assert_eq!(report.pending.len(), 1);
        assert_eq!(report.pending[0].bet.home_team, "Heerenveen");
        assert_eq!(report.hits, 2);
        assert_eq!(report.total_staked, dec!(15));
        // 10 * 1.5 + 5 * 2.2
        assert_eq!(report.total_profit, dec!(26.00));
    }

    #[test]
    fn test_settled_bet_feeds_history() {
        let s = settle_bet(&placed("AZ", "Utrecht", BetSide::Away, date(3), dec!(1)), BetSide::Home);
        let row = s.to_history_record().to_sim_row().unwrap();
        assert_eq!(row.bet_odds, 3.0);
        assert_eq!(row.bet_win_rate, 0.25);
        assert_eq!(row.ev, 0.2);
        assert!(!row.hit);
    }

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("odds_optimizer_{tag}_{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_settle_tables_moves_settled_bets_to_history() {
        let (placed_path, results_path, history_path) =
            (temp_path("placed"), temp_path("results"), temp_path("history"));
        let bets = vec![
            placed("AZ", "Utrecht", BetSide::Home, date(3), dec!(10)),
            placed("Ajax", "PSV", BetSide::Draw, date(9), dec!(5)),
        ];
        storage::save_json(&bets, &placed_path).unwrap();
        storage::save_json(&[result("AZ", "Utrecht", date(3), BetSide::Away)], &results_path).unwrap();

        let report = settle_tables(&placed_path, &results_path, &history_path).unwrap();
        assert_eq!(report.settled.len(), 1);

        let still_placed: Vec<StakedBet> = storage::load_json(&placed_path).unwrap();
        assert_eq!(still_placed, vec![bets[1].clone()]);
        let history: Vec<HistoricalBetRecord> = storage::load_json(&history_path).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].outcome.as_deref(), Some("away"));

        for p in [placed_path, results_path, history_path] {
            std::fs::remove_file(p).unwrap();
        }
    }

    #[test]
    fn test_failed_history_write_does_not_resettle() {
        let (placed_path, results_path) = (temp_path("placed"), temp_path("results"));
        // History under a directory that does not exist: reads as empty, write fails.
        let history_path = std::env::temp_dir()
            .join(format!("odds_optimizer_missing_{}", uuid::Uuid::new_v4()))
            .join("history.json");

        let bets = vec![placed("AZ", "Utrecht", BetSide::Home, date(3), dec!(10))];
        storage::save_json(&bets, &placed_path).unwrap();
        storage::save_json(&[result("AZ", "Utrecht", date(3), BetSide::Home)], &results_path).unwrap();

        assert!(settle_tables(&placed_path, &results_path, &history_path).is_err());

        // The settled bet already left the placed table.
        let still_placed: Vec<StakedBet> = storage::load_json(&placed_path).unwrap();
        assert!(still_placed.is_empty());

        std::fs::remove_file(placed_path).unwrap();
        std::fs::remove_file(results_path).unwrap();
    }

    #[test]
    fn test_empty_report_roi() {
        assert_eq!(SettlementReport::default().roi(), Decimal::ZERO);
    }
}
