//! Monte Carlo probability of profit at expiry.
//!
//! Terminal spots follow the risk-neutral lognormal law over the horizon; the
//! estimate and its standard errors shrink as `1 / sqrt(simulations)`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::PricingError;
use crate::market::DAYS_PER_YEAR;
use crate::mc::{GbmTerminal, NormalSampler, summarize};
use crate::risk::ExpiryPayoff;

/// Draw count below which estimates are flagged as noisy.
pub const MIN_RELIABLE_SIMULATIONS: usize = 1_000;

/// Monte Carlo estimate of the expiry P&L distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitProbability {
    /// Fraction of draws with strictly positive P&L.
    pub probability: f64,
    /// Sample mean P&L.
    pub expected_pnl: f64,
    pub probability_std_error: f64,
    pub expected_pnl_std_error: f64,
    pub simulations: usize,
    pub horizon_days: f64,
}

impl ExpiryPayoff {
    /// Estimates the probability of a positive expiry P&L after `horizon_days`.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for zero simulations, a negative or
    /// non-finite horizon, or a sampler that runs dry.
    pub fn probability_of_profit<S: NormalSampler + ?Sized>(
        &self,
        simulations: usize,
        include_underlying: bool,
        horizon_days: f64,
        sampler: &mut S,
    ) -> Result<ProfitProbability, PricingError> {
        if simulations == 0 {
            return Err(PricingError::InvalidArgument(
                "number of simulations must be > 0".to_string(),
            ));
        }
        if !horizon_days.is_finite() || horizon_days < 0.0 {
            return Err(PricingError::InvalidArgument(format!(
                "days to expiry must be finite and >= 0, got {horizon_days}"
            )));
        }
        if simulations < MIN_RELIABLE_SIMULATIONS {
            warn!(
                simulations,
                "probability of profit from few draws; standard error is large"
            );
        }

        let market = self.market();
        let model = GbmTerminal {
            spot: market.spot,
            rate: market.rate,
            dividend_yield: market.dividend_yield,
            volatility: market.volatility,
            horizon: horizon_days / DAYS_PER_YEAR,
        };
        let terminals = model.simulate(simulations, sampler)?;
        let sample = summarize(&terminals, |s| self.pnl_at_expiry(s, include_underlying))?;

        debug!(
            simulations,
            horizon_days,
            probability = sample.positive_fraction,
            std_error = sample.positive_fraction_std_error,
            "probability of profit"
        );

        Ok(ProfitProbability {
            probability: sample.positive_fraction,
            expected_pnl: sample.mean,
            probability_std_error: sample.positive_fraction_std_error,
            expected_pnl_std_error: sample.mean_std_error,
            simulations: sample.simulations,
            horizon_days,
        })
    }
}
