//! OddsOptimizer: EV staking and bankroll risk simulation for 1X2 football bets.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod cli;
pub mod config;
pub mod types;
pub mod simulation;
pub mod strategy;
pub mod engine;
pub mod storage;
