//! Spot/volatility sweeps over a portfolio under a scoped market shock.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::core::PricingError;
use crate::market::{MarketState, validate_spot, validate_volatility};
use crate::portfolio::Portfolio;

/// Temporarily moves a portfolio's spot and volatility.
///
/// The original market is put back on every engine when the guard drops, so
/// an early return through `?` cannot leave the portfolio shocked.
#[derive(Debug)]
pub struct MarketShock<'a> {
    portfolio: &'a mut Portfolio,
    original: MarketState,
}

impl<'a> MarketShock<'a> {
    pub fn new(portfolio: &'a mut Portfolio) -> Self {
        let original = portfolio.market;
        Self {
            portfolio,
            original,
        }
    }

    /// Moves spot and volatility on the portfolio and every engine.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an invalid spot or volatility; the
    /// previous shock stays in place.
    pub fn apply(&mut self, spot: f64, volatility: f64) -> Result<(), PricingError> {
        validate_spot(spot)?;
        validate_volatility(volatility)?;
        let shocked = MarketState {
            spot,
            volatility,
            ..self.original
        };
        for position in &mut self.portfolio.positions {
            position.option_mut().restore_market(shocked);
        }
        self.portfolio.market = shocked;
        Ok(())
    }

    /// Market in force before the shock.
    pub fn original(&self) -> &MarketState {
        &self.original
    }
}

impl Deref for MarketShock<'_> {
    type Target = Portfolio;

    fn deref(&self) -> &Portfolio {
        self.portfolio
    }
}

impl Drop for MarketShock<'_> {
    fn drop(&mut self) {
        for position in &mut self.portfolio.positions {
            position.option_mut().restore_market(self.original);
        }
        self.portfolio.market = self.original;
    }
}

/// Portfolio aggregates at one shocked (spot, volatility) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPoint {
    pub spot: f64,
    pub volatility: f64,
    /// Option value only, excluding the underlying.
    pub portfolio_value: f64,
    pub total_delta: f64,
    pub net_delta: f64,
    pub total_gamma: f64,
    pub total_vega: f64,
}

impl Portfolio {
    /// Revalues the portfolio at every spot, and at every volatility when given
    /// (spot-major order). Without `volatilities` the current volatility is used.
    ///
    /// The portfolio's market is restored afterwards, including on error.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an invalid spot or volatility and
    /// propagates pricing failures.
    pub fn scenario_analysis(
        &mut self,
        spots: &[f64],
        volatilities: Option<&[f64]>,
    ) -> Result<Vec<ScenarioPoint>, PricingError> {
        let current_vol = [self.market.volatility];
        let vols = volatilities.unwrap_or(&current_vol);
        let mut points = Vec::with_capacity(spots.len() * vols.len());

        let mut shock = MarketShock::new(self);
        for &spot in spots {
            for &volatility in vols {
                shock.apply(spot, volatility)?;
                let greeks = shock.total_greeks()?;
                points.push(ScenarioPoint {
                    spot,
                    volatility,
                    portfolio_value: shock.total_value()?,
                    total_delta: greeks.delta,
                    net_delta: greeks.delta + shock.underlying_quantity(),
                    total_gamma: greeks.gamma,
                    total_vega: greeks.vega,
                });
            }
        }
        Ok(points)
    }
}
