//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs, then
//! checks the simulation and staking parameters for sane ranges.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;

use crate::simulation::MonteCarloConfig;
use crate::strategy::staking::{StakingPolicy, FULL_BATCH, MIN_STAKE};
use crate::types::OddsError;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub staking: StakingConfig,
    pub data: DataConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SimulationConfig {
    pub num_simulations: usize,
    pub initial_balance: f64,
    pub beta: f64,
    pub max_risk: f64,
    pub ruin_threshold: f64,
    #[serde(default = "default_ev_threshold")]
    pub ev_threshold: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StakingConfig {
    pub beta: f64,
    pub weekly_exposure: f64,
    pub initial_bankroll: f64,
    #[serde(default = "default_min_stake")]
    pub min_stake: Decimal,
    #[serde(default = "default_ev_threshold")]
    pub ev_threshold: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub history_path: String,
    pub report_path: String,
    pub predictions_path: String,
    pub pending_path: String,
    pub placed_path: String,
    pub results_path: String,
}

fn default_ev_threshold() -> f64 {
    0.1
}

fn default_seed() -> u64 {
    2
}

fn default_parallel() -> bool {
    true
}

fn default_min_stake() -> Decimal {
    MIN_STAKE
}

impl SimulationConfig {
    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            num_simulations: self.num_simulations,
            initial_balance: self.initial_balance,
            beta: self.beta,
            max_risk: self.max_risk,
            ruin_threshold: self.ruin_threshold,
            ev_threshold: self.ev_threshold,
            seed: self.seed,
            parallel: self.parallel,
        }
    }
}

impl StakingConfig {
    pub fn policy(&self) -> StakingPolicy {
        StakingPolicy {
            beta: self.beta,
            weekly_exposure: self.weekly_exposure,
            initial_bankroll: self.initial_bankroll,
            min_stake: self.min_stake,
            full_batch: FULL_BATCH,
        }
    }

    pub fn validate(&self) -> Result<(), OddsError> {
        if !(self.initial_bankroll > 0.0 && self.initial_bankroll.is_finite()) {
            return Err(OddsError::Config(format!(
                "staking.initial_bankroll must be positive, got {}",
                self.initial_bankroll
            )));
        }
        if !(self.weekly_exposure > 0.0 && self.weekly_exposure <= 1.0) {
            return Err(OddsError::Config(format!(
                "staking.weekly_exposure must be in (0, 1], got {}",
                self.weekly_exposure
            )));
        }
        if !self.beta.is_finite() {
            return Err(OddsError::Config("staking.beta must be finite".into()));
        }
        if self.min_stake < Decimal::ZERO {
            return Err(OddsError::Config("staking.min_stake must not be negative".into()));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Invalid config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), OddsError> {
        self.simulation.monte_carlo().validate()?;
        self.staking.validate()
    }
}
