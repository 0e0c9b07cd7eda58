//! Shared types for the OddsOptimizer pipeline.
//!
//! These types form the data model used across all modules: the
//! three-way match side, per-side odds and probabilities, raw historical
//! bet rows as delivered by the data-loading side, and the filtered rows
//! the simulator works on.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Outcome side of a 1X2 football market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetSide {
    Home,
    Draw,
    Away,
}

impl BetSide {
    /// All sides, in tie-break order.
    pub const ALL: [BetSide; 3] = [BetSide::Home, BetSide::Draw, BetSide::Away];

    /// Lowercase identifier as used in the historical table.
    pub fn as_str(&self) -> &'static str {
        match self {
            BetSide::Home => "home",
            BetSide::Draw => "draw",
            BetSide::Away => "away",
        }
    }
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a side identifier (case-insensitive, surrounding whitespace ignored).
impl std::str::FromStr for BetSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" => Ok(BetSide::Home),
            "draw" => Ok(BetSide::Draw),
            "away" => Ok(BetSide::Away),
            other => anyhow::bail!("Unknown bet side: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-side values
// ---------------------------------------------------------------------------

/// Decimal odds quoted for each side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideOdds {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl SideOdds {
    pub fn for_side(&self, side: BetSide) -> f64 {
        match side {
            BetSide::Home => self.home,
            BetSide::Draw => self.draw,
            BetSide::Away => self.away,
        }
    }
}

/// Model-estimated win probability for each side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl SideProbs {
    pub fn for_side(&self, side: BetSide) -> f64 {
        match side {
            BetSide::Home => self.home,
            BetSide::Draw => self.draw,
            BetSide::Away => self.away,
        }
    }
}

// ---------------------------------------------------------------------------
// Historical records
// ---------------------------------------------------------------------------

/// Columns a historical row must carry to be usable by the simulator.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "bet",
    "outcome",
    "odds_home",
    "odds_draw",
    "odds_away",
    "home_win_%",
    "draw_win_%",
    "away_win_%",
    "ev",
];

/// One resolved real-world bet, exactly as the data-loading side hands it
/// over. Every field may be absent; the historical filter decides what is
/// usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBetRecord {
    /// Chosen side ("home" | "draw" | "away").
    #[serde(default)]
    pub bet: Option<String>,
    /// Realized side.
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub odds_home: Option<f64>,
    #[serde(default)]
    pub odds_draw: Option<f64>,
    #[serde(default)]
    pub odds_away: Option<f64>,
    #[serde(default, rename = "home_win_%")]
    pub home_win_pct: Option<f64>,
    #[serde(default, rename = "draw_win_%")]
    pub draw_win_pct: Option<f64>,
    #[serde(default, rename = "away_win_%")]
    pub away_win_pct: Option<f64>,
    /// Expected value computed at bet time.
    #[serde(default)]
    pub ev: Option<f64>,
}

impl HistoricalBetRecord {
    /// Chosen side, if present and recognisable.
    pub fn bet_side(&self) -> Option<BetSide> {
        self.bet.as_deref().and_then(|s| s.parse().ok())
    }

    /// Realized side, if present and recognisable.
    pub fn outcome_side(&self) -> Option<BetSide> {
        self.outcome.as_deref().and_then(|s| s.parse().ok())
    }

    pub fn odds(&self) -> Option<SideOdds> {
        Some(SideOdds {
            home: self.odds_home?,
            draw: self.odds_draw?,
            away: self.odds_away?,
        })
    }

    pub fn probs(&self) -> Option<SideProbs> {
        Some(SideProbs {
            home: self.home_win_pct?,
            draw: self.draw_win_pct?,
            away: self.away_win_pct?,
        })
    }

    /// Whether the named column carries a value in this row.
    pub fn has_column(&self, column: &str) -> bool {
        match column {
            "bet" => self.bet.is_some(),
            "outcome" => self.outcome.is_some(),
            "odds_home" => self.odds_home.is_some(),
            "odds_draw" => self.odds_draw.is_some(),
            "odds_away" => self.odds_away.is_some(),
            "home_win_%" => self.home_win_pct.is_some(),
            "draw_win_%" => self.draw_win_pct.is_some(),
            "away_win_%" => self.away_win_pct.is_some(),
            "ev" => self.ev.is_some(),
            _ => false,
        }
    }

    /// Derive the simulation row. `None` if any required field is missing.
    pub fn to_sim_row(&self) -> Option<SimRow> {
        let side = self.bet_side()?;
        let outcome = self.outcome_side()?;
        let odds = self.odds()?;
        let probs = self.probs()?;
        let ev = self.ev?;

        Some(SimRow {
            bet_win_rate: probs.for_side(side),
            bet_odds: odds.for_side(side),
            ev,
            hit: side == outcome,
        })
    }
}

/// A filtered historical row reduced to what the simulator needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimRow {
    /// Model-estimated win probability of the chosen side.
    pub bet_win_rate: f64,
    /// Decimal odds of the chosen side.
    pub bet_odds: f64,
    pub ev: f64,
    /// Chosen side matched the realized outcome.
    pub hit: bool,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for OddsOptimizer.
#[derive(Debug, thiserror::Error)]
pub enum OddsError {
    #[error("Historical table is empty")]
    EmptyHistory,

    #[error("Required column absent from historical table: {0}")]
    MissingColumn(&'static str),

    #[error("No historical records usable for simulation (ev_threshold = {ev_threshold})")]
    NoEligibleRecords { ev_threshold: f64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
