//! Engine: post-execution bookkeeping for placed bets.

pub mod settlement;
