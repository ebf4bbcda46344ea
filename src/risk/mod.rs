//! Expiry payoff analysis and risk/reward reporting.
//!
//! Everything here reads a [`crate::portfolio::Portfolio`] snapshot and never
//! mutates it.

pub mod analyzer;
pub mod payoff;
pub mod probability;

pub use analyzer::{RiskRewardAnalyzer, RiskRewardConfig, RiskRewardSummary};
pub use payoff::{
    ExpiryPayoff, Extremum, PayoffLeg, breakevens, linspace, max_pnl, min_pnl,
};
pub use probability::{MIN_RELIABLE_SIMULATIONS, ProfitProbability};
