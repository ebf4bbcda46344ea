//! Position aggregator with a shared market snapshot and an underlying hedge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Greeks, PricingError};
use crate::instruments::{AmericanOption, EngineConfig, OptionContract};
use crate::market::{MarketState, MarketUpdate};
use crate::portfolio::position::{
    Position, PositionRecord, PositionRow, PositionSpec, PositionUpdate,
};

/// Ordered option positions plus a share hedge, all priced off one market.
///
/// Every position's engine always carries the portfolio's market state.
///
/// # Examples
/// ```
/// use chrono::{Days, NaiveDate};
/// use hedgeferric::core::OptionType;
/// use hedgeferric::market::MarketState;
/// use hedgeferric::portfolio::{Portfolio, PositionSpec};
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
/// let market = MarketState::builder()
///     .spot(100.0)
///     .volatility(0.25)
///     .rate(0.05)
///     .valuation_date(today)
///     .build()
///     .unwrap();
///
/// let mut book = Portfolio::new(market).unwrap();
/// book.add_position(PositionSpec::new(OptionType::Put, 95.0, today + Days::new(30), 5))
///     .unwrap();
/// book.set_underlying_quantity(1_000.0).unwrap();
///
/// let net = book.net_delta().unwrap();
/// assert_eq!(book.delta_adjustment_needed().unwrap(), -net);
/// ```
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub(crate) market: MarketState,
    config: EngineConfig,
    pub(crate) positions: Vec<Position>,
    underlying_quantity: f64,
}

impl Portfolio {
    /// Empty portfolio with default engine settings.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an invalid market.
    pub fn new(market: MarketState) -> Result<Self, PricingError> {
        Self::with_config(market, EngineConfig::default())
    }

    /// Empty portfolio whose engines use `config`.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an invalid market or config.
    pub fn with_config(market: MarketState, config: EngineConfig) -> Result<Self, PricingError> {
        market.validate()?;
        config.validate()?;
        Ok(Self {
            market,
            config,
            positions: Vec::new(),
            underlying_quantity: 0.0,
        })
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// # Errors
    /// Returns [`PricingError::IndexOutOfRange`] when `index >= len()`.
    pub fn position(&self, index: usize) -> Result<&Position, PricingError> {
        self.positions.get(index).ok_or(PricingError::IndexOutOfRange {
            index,
            len: self.positions.len(),
        })
    }

    /// Shares held outside of options; negative for short.
    pub fn underlying_quantity(&self) -> f64 {
        self.underlying_quantity
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when `quantity` is not finite.
    pub fn set_underlying_quantity(&mut self, quantity: f64) -> Result<(), PricingError> {
        if !quantity.is_finite() {
            return Err(PricingError::InvalidArgument(format!(
                "underlying quantity must be finite, got {quantity}"
            )));
        }
        self.underlying_quantity = quantity;
        Ok(())
    }

    fn build_engine(
        &self,
        contract: OptionContract,
        market: MarketState,
    ) -> Result<AmericanOption, PricingError> {
        AmericanOption::with_config(contract, market, self.config)
    }

    /// Prices a new position off the current market and appends it.
    ///
    /// Returns the new position's index.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for invalid terms, an expired maturity
    /// or a zero multiplier; the portfolio is unchanged.
    pub fn add_position(&mut self, spec: PositionSpec) -> Result<usize, PricingError> {
        let contract = OptionContract::new(spec.option_type, spec.strike, spec.maturity)?;
        let option = self.build_engine(contract, self.market)?;
        self.positions
            .push(Position::new(option, spec.quantity, spec.multiplier, spec.label)?);
        Ok(self.positions.len() - 1)
    }

    /// Removes and returns the position at `index`.
    ///
    /// # Errors
    /// Returns [`PricingError::IndexOutOfRange`] when `index >= len()`.
    pub fn remove_position(&mut self, index: usize) -> Result<Position, PricingError> {
        self.position(index)?;
        Ok(self.positions.remove(index))
    }

    /// Edits the position at `index`.
    ///
    /// A changed strike, maturity or kind builds a fresh engine; otherwise only the
    /// holding fields are touched. Nothing is modified when the update fails.
    ///
    /// # Errors
    /// Returns [`PricingError::IndexOutOfRange`] for a bad index and
    /// [`PricingError::InvalidArgument`] for invalid terms.
    pub fn update_position(
        &mut self,
        index: usize,
        update: PositionUpdate,
    ) -> Result<(), PricingError> {
        let current = self.position(index)?;
        let terms = *current.option().contract();
        let next_terms = OptionContract::new(
            update.option_type.unwrap_or(terms.option_type()),
            update.strike.unwrap_or(terms.strike()),
            update.maturity.unwrap_or(terms.maturity()),
        )?;

        let mut next = if next_terms != terms {
            current.with_option(self.build_engine(next_terms, self.market)?)
        } else {
            current.clone()
        };
        if let Some(quantity) = update.quantity {
            next.set_quantity(quantity);
        }
        if let Some(multiplier) = update.multiplier {
            next.set_multiplier(multiplier)?;
        }
        if let Some(label) = update.label {
            next.set_label(label);
        }

        self.positions[index] = next;
        Ok(())
    }

    /// Removes every position; the underlying hedge is kept.
    pub fn clear_positions(&mut self) {
        self.positions.clear();
    }

    /// Applies a market change to the portfolio and every position.
    ///
    /// Spot and volatility are hot-swapped into the existing engines. Rate,
    /// dividend yield or valuation date changes rebuild every engine into a new
    /// collection that replaces the old one only once all builds succeed.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for invalid inputs or when a position
    /// would be expired at the new valuation date. The portfolio is unchanged on error.
    pub fn update_market_conditions(&mut self, update: MarketUpdate) -> Result<(), PricingError> {
        let next_market = update.apply_to(&self.market)?;

        if update.requires_rebuild() {
            debug!(
                positions = self.positions.len(),
                rate = next_market.rate,
                dividend_yield = next_market.dividend_yield,
                valuation_date = %next_market.valuation_date,
                "rebuilding position engines"
            );
            let rebuilt = self
                .positions
                .iter()
                .map(|p| {
                    self.build_engine(*p.option().contract(), next_market)
                        .map(|option| p.with_option(option))
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.positions = rebuilt;
        } else {
            // `apply_to` validated both values, so no swap can fail part way.
            for position in &mut self.positions {
                let option = position.option_mut();
                if let Some(spot) = update.spot {
                    option.update_spot(spot)?;
                }
                if let Some(volatility) = update.volatility {
                    option.update_volatility(volatility)?;
                }
            }
        }

        self.market = next_market;
        Ok(())
    }

    /// Sum of position values.
    pub fn total_value(&self) -> Result<f64, PricingError> {
        self.positions.iter().map(Position::position_value).sum()
    }

    pub fn total_delta(&self) -> Result<f64, PricingError> {
        self.positions.iter().map(Position::position_delta).sum()
    }

    pub fn total_gamma(&self) -> Result<f64, PricingError> {
        self.positions.iter().map(Position::position_gamma).sum()
    }

    pub fn total_vega(&self) -> Result<f64, PricingError> {
        self.positions.iter().map(Position::position_vega).sum()
    }

    /// Per calendar day.
    pub fn total_theta(&self) -> Result<f64, PricingError> {
        self.positions.iter().map(Position::position_theta).sum()
    }

    pub fn total_rho(&self) -> Result<f64, PricingError> {
        self.positions.iter().map(Position::position_rho).sum()
    }

    /// All five totals in one pass over the engines.
    pub fn total_greeks(&self) -> Result<Greeks, PricingError> {
        self.positions.iter().map(Position::position_greeks).sum()
    }

    /// `underlying_quantity * spot`.
    pub fn total_underlying_value(&self) -> f64 {
        self.underlying_quantity * self.market.spot
    }

    /// Options plus underlying.
    pub fn total_portfolio_value(&self) -> Result<f64, PricingError> {
        Ok(self.total_value()? + self.total_underlying_value())
    }

    /// Option delta plus the underlying hedge, in shares.
    pub fn net_delta(&self) -> Result<f64, PricingError> {
        Ok(self.total_delta()? + self.underlying_quantity)
    }

    /// Percentage of the underlying exposure offset by option delta; 0 with no underlying.
    pub fn hedge_ratio(&self) -> Result<f64, PricingError> {
        if self.underlying_quantity == 0.0 {
            return Ok(0.0);
        }
        Ok(-(self.total_delta()? / self.underlying_quantity) * 100.0)
    }

    /// Shares to trade for delta neutrality; positive means buy.
    pub fn delta_adjustment_needed(&self) -> Result<f64, PricingError> {
        Ok(-self.net_delta()?)
    }

    /// Every aggregate in one record.
    pub fn summary_stats(&self) -> Result<PortfolioSummary, PricingError> {
        let greeks = self.total_greeks()?;
        let total_value = self.total_value()?;
        let total_underlying_value = self.total_underlying_value();
        let net_delta = greeks.delta + self.underlying_quantity;
        let hedge_ratio = if self.underlying_quantity == 0.0 {
            0.0
        } else {
            -(greeks.delta / self.underlying_quantity) * 100.0
        };

        Ok(PortfolioSummary {
            total_positions: self.positions.len(),
            total_value,
            total_underlying_value,
            total_portfolio_value: total_value + total_underlying_value,
            underlying_quantity: self.underlying_quantity,
            net_delta,
            hedge_ratio,
            delta_adjustment: -net_delta,
            total_greeks: greeks,
        })
    }

    /// Terms-only listing in insertion order.
    pub fn position_rows(&self) -> Vec<PositionRow> {
        self.positions.iter().map(Position::to_row).collect()
    }

    /// Export records in insertion order.
    pub fn records(&self) -> Result<Vec<PositionRecord>, PricingError> {
        self.positions.iter().map(Position::to_record).collect()
    }
}

/// Portfolio-level aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_positions: usize,
    pub total_value: f64,
    pub total_underlying_value: f64,
    pub total_portfolio_value: f64,
    pub underlying_quantity: f64,
    pub net_delta: f64,
    pub hedge_ratio: f64,
    pub delta_adjustment: f64,
    #[serde(flatten)]
    pub total_greeks: Greeks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use crate::engines::pde::CrankNicolsonSolver;
    use approx::assert_relative_eq;
    use chrono::{Days, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    fn book() -> Portfolio {
        let market = MarketState::builder()
            .spot(100.0)
            .volatility(0.25)
            .rate(0.05)
            .dividend_yield(0.02)
            .valuation_date(today())
            .build()
            .unwrap();
        let config =
            EngineConfig::default().with_solver(CrankNicolsonSolver::new(100, 100));
        let mut book = Portfolio::with_config(market, config).unwrap();
        book.add_position(PositionSpec::new(
            OptionType::Put,
            95.0,
            today() + Days::new(30),
            5,
        ))
        .unwrap();
        book.add_position(PositionSpec::new(
            OptionType::Call,
            105.0,
            today() + Days::new(60),
            -5,
        ))
        .unwrap();
        book
    }

    #[test]
    fn bad_indexes_report_length() {
        let mut book = book();
        assert_eq!(
            book.remove_position(2).unwrap_err(),
            PricingError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert!(matches!(
            book.update_position(7, PositionUpdate::new().quantity(1)),
            Err(PricingError::IndexOutOfRange { index: 7, len: 2 })
        ));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn hedge_ratio_is_zero_without_underlying() {
        let book = book();
        assert_eq!(book.underlying_quantity(), 0.0);
        assert_eq!(book.hedge_ratio().unwrap(), 0.0);
    }

    #[test]
    fn holding_update_keeps_engine_terms_update_rebuilds() {
        let mut book = book();
        let before = book.position(0).unwrap().option().price().unwrap();

        book.update_position(0, PositionUpdate::new().quantity(-2).label("HEDGE"))
            .unwrap();
        let p = book.position(0).unwrap();
        assert_eq!(p.quantity(), -2);
        assert_eq!(p.label(), "HEDGE");
        assert_eq!(p.option().price().unwrap(), before);

        book.update_position(0, PositionUpdate::new().strike(100.0)).unwrap();
        let p = book.position(0).unwrap();
        assert_eq!(p.option().strike(), 100.0);
        assert_eq!(p.quantity(), -2);
        assert!(p.option().price().unwrap() > before);
    }

    #[test]
    fn failed_position_update_changes_nothing() {
        let mut book = book();
        let before = book.position_rows();
        assert!(
            book.update_position(0, PositionUpdate::new().quantity(9).strike(-1.0))
                .is_err()
        );
        assert!(
            book.update_position(0, PositionUpdate::new().quantity(9).multiplier(0))
                .is_err()
        );
        assert_eq!(book.position_rows(), before);
    }

    #[test]
    fn hot_swap_and_rebuild_keep_positions_in_sync() {
        let mut book = book();
        book.update_market_conditions(MarketUpdate::new().spot(97.0).volatility(0.3))
            .unwrap();
        book.update_market_conditions(MarketUpdate::new().rate(0.04)).unwrap();
        for p in book.positions() {
            assert_eq!(p.option().market(), book.market());
        }
        assert_eq!(book.market().spot, 97.0);
        assert_eq!(book.market().rate, 0.04);
    }

    #[test]
    fn summary_matches_individual_getters() {
        let mut book = book();
        book.set_underlying_quantity(250.0).unwrap();
        let s = book.summary_stats().unwrap();
        assert_eq!(s.total_positions, 2);
        assert_relative_eq!(s.net_delta, book.net_delta().unwrap(), epsilon = 1.0e-9);
        assert_relative_eq!(s.hedge_ratio, book.hedge_ratio().unwrap(), epsilon = 1.0e-9);
        assert_relative_eq!(s.total_underlying_value, 25_000.0);
        assert_relative_eq!(
            s.total_greeks.theta,
            book.total_theta().unwrap(),
            epsilon = 1.0e-9
        );
    }

    #[test]
    fn clear_keeps_underlying() {
        let mut book = book();
        book.set_underlying_quantity(10.0).unwrap();
        book.clear_positions();
        assert!(book.is_empty());
        assert_eq!(book.total_value().unwrap(), 0.0);
        assert_eq!(book.net_delta().unwrap(), 10.0);
    }
}
