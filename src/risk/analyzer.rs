//! Risk/reward analytics over a portfolio snapshot.

use serde::{Deserialize, Serialize};

use crate::core::PricingError;
use crate::mc::NormalSampler;
use crate::portfolio::Portfolio;
use crate::risk::payoff::{Extremum, ExpiryPayoff, breakevens, linspace, max_pnl, min_pnl};
use crate::risk::probability::ProfitProbability;

/// Grid and sampling defaults for [`RiskRewardAnalyzer`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardConfig {
    /// Points in the default extrema grid.
    pub extrema_points: usize,
    /// Points in the default breakeven grid.
    pub breakeven_points: usize,
    /// Lower grid bound as a multiple of spot.
    pub lower_multiplier: f64,
    /// Upper grid bound as a multiple of spot.
    pub upper_multiplier: f64,
    /// Horizon used when the portfolio holds no options.
    pub default_horizon_days: f64,
    /// Draws used by [`RiskRewardAnalyzer::risk_reward_summary`].
    pub num_simulations: usize,
}

impl Default for RiskRewardConfig {
    fn default() -> Self {
        Self {
            extrema_points: 200,
            breakeven_points: 500,
            lower_multiplier: 0.5,
            upper_multiplier: 2.0,
            default_horizon_days: 30.0,
            num_simulations: 10_000,
        }
    }
}

impl RiskRewardConfig {
    pub fn with_extrema_points(mut self, points: usize) -> Self {
        self.extrema_points = points;
        self
    }

    pub fn with_breakeven_points(mut self, points: usize) -> Self {
        self.breakeven_points = points;
        self
    }

    pub fn with_bounds(mut self, lower_multiplier: f64, upper_multiplier: f64) -> Self {
        self.lower_multiplier = lower_multiplier;
        self.upper_multiplier = upper_multiplier;
        self
    }

    pub fn with_num_simulations(mut self, num_simulations: usize) -> Self {
        self.num_simulations = num_simulations;
        self
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for empty grids, inverted or negative bounds,
    /// or zero simulations.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.extrema_points == 0 || self.breakeven_points < 2 {
            return Err(PricingError::InvalidArgument(
                "extrema grid needs >= 1 point and breakeven grid >= 2 points".to_string(),
            ));
        }
        if !(self.lower_multiplier >= 0.0 && self.upper_multiplier > self.lower_multiplier)
            || !self.upper_multiplier.is_finite()
        {
            return Err(PricingError::InvalidArgument(format!(
                "grid bounds must satisfy 0 <= lower < upper, got [{}, {}]",
                self.lower_multiplier, self.upper_multiplier
            )));
        }
        if !self.default_horizon_days.is_finite() || self.default_horizon_days < 0.0 {
            return Err(PricingError::InvalidArgument(
                "default horizon must be finite and >= 0".to_string(),
            ));
        }
        if self.num_simulations == 0 {
            return Err(PricingError::InvalidArgument(
                "number of simulations must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Combined risk/reward report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRewardSummary {
    /// Premium outlay; positive is a net debit.
    pub net_debit_credit: f64,
    pub underlying_quantity: f64,
    pub current_spot: f64,
    pub options_max_loss: Extremum,
    pub options_max_profit: Extremum,
    pub total_max_loss: Extremum,
    pub total_max_profit: Extremum,
    pub options_breakevens: Vec<f64>,
    pub total_breakevens: Vec<f64>,
    /// Including the underlying hedge.
    pub probability_of_profit: ProfitProbability,
}

/// Read-only risk/reward analytics for one portfolio snapshot.
///
/// # Examples
/// ```
/// use chrono::{Days, NaiveDate};
/// use hedgeferric::core::OptionType;
/// use hedgeferric::market::MarketState;
/// use hedgeferric::mc::SeededNormalSampler;
/// use hedgeferric::portfolio::{Portfolio, PositionSpec};
/// use hedgeferric::risk::RiskRewardAnalyzer;
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
/// let market = MarketState::builder()
///     .spot(100.0)
///     .volatility(0.25)
///     .rate(0.05)
///     .valuation_date(today)
///     .build()
///     .unwrap();
/// let mut book = Portfolio::new(market).unwrap();
/// book.add_position(PositionSpec::new(OptionType::Call, 100.0, today + Days::new(30), 1))
///     .unwrap();
///
/// let analyzer = RiskRewardAnalyzer::new(&book).unwrap();
/// let worst = analyzer.max_loss(None, false).unwrap();
/// assert!(worst.value < 0.0 && !worst.is_unlimited);
///
/// let mut sampler = SeededNormalSampler::new(7);
/// let pop = analyzer
///     .probability_of_profit(5_000, false, None, &mut sampler)
///     .unwrap();
/// assert!(pop.probability > 0.0 && pop.probability < 0.5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RiskRewardAnalyzer {
    payoff: ExpiryPayoff,
    config: RiskRewardConfig,
}

impl RiskRewardAnalyzer {
    /// Snapshots `portfolio` with default grids.
    ///
    /// # Errors
    /// Propagates pricing failures from the position engines.
    pub fn new(portfolio: &Portfolio) -> Result<Self, PricingError> {
        Self::with_config(portfolio, RiskRewardConfig::default())
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an invalid config and propagates
    /// pricing failures.
    pub fn with_config(
        portfolio: &Portfolio,
        config: RiskRewardConfig,
    ) -> Result<Self, PricingError> {
        config.validate()?;
        Ok(Self {
            payoff: ExpiryPayoff::from_portfolio(portfolio)?,
            config,
        })
    }

    pub fn payoff(&self) -> &ExpiryPayoff {
        &self.payoff
    }

    pub fn config(&self) -> &RiskRewardConfig {
        &self.config
    }

    fn default_grid(&self, points: usize) -> Vec<f64> {
        let spot = self.payoff.market().spot;
        linspace(
            self.config.lower_multiplier * spot,
            self.config.upper_multiplier * spot,
            points,
        )
    }

    /// See [`ExpiryPayoff::pnl_at_expiry`].
    pub fn pnl_at_expiry(&self, terminal_spot: f64, include_underlying: bool) -> f64 {
        self.payoff.pnl_at_expiry(terminal_spot, include_underlying)
    }

    /// Worst expiry P&L over `grid`, or the default extrema grid.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an empty or invalid grid.
    pub fn max_loss(
        &self,
        grid: Option<&[f64]>,
        include_underlying: bool,
    ) -> Result<Extremum, PricingError> {
        match grid {
            Some(grid) => min_pnl(&self.payoff, grid, include_underlying),
            None => min_pnl(
                &self.payoff,
                &self.default_grid(self.config.extrema_points),
                include_underlying,
            ),
        }
    }

    /// Best expiry P&L over `grid`, or the default extrema grid.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an empty or invalid grid.
    pub fn max_profit(
        &self,
        grid: Option<&[f64]>,
        include_underlying: bool,
    ) -> Result<Extremum, PricingError> {
        match grid {
            Some(grid) => max_pnl(&self.payoff, grid, include_underlying),
            None => max_pnl(
                &self.payoff,
                &self.default_grid(self.config.extrema_points),
                include_underlying,
            ),
        }
    }

    /// Grid spots just after each P&L sign change, over `grid` or the default
    /// breakeven grid.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for an empty or invalid grid.
    pub fn breakeven_points(
        &self,
        grid: Option<&[f64]>,
        include_underlying: bool,
    ) -> Result<Vec<f64>, PricingError> {
        match grid {
            Some(grid) => breakevens(&self.payoff, grid, include_underlying),
            None => breakevens(
                &self.payoff,
                &self.default_grid(self.config.breakeven_points),
                include_underlying,
            ),
        }
    }

    /// Days from valuation to the nearest maturity, or the configured default.
    pub fn default_horizon_days(&self) -> f64 {
        self.payoff
            .nearest_maturity()
            .map(|maturity| (maturity - self.payoff.market().valuation_date).num_days() as f64)
            .unwrap_or(self.config.default_horizon_days)
    }

    /// Monte Carlo probability of a positive expiry P&L.
    ///
    /// # Errors
    /// See [`ExpiryPayoff::probability_of_profit`].
    pub fn probability_of_profit<S: NormalSampler + ?Sized>(
        &self,
        simulations: usize,
        include_underlying: bool,
        days_to_expiry: Option<f64>,
        sampler: &mut S,
    ) -> Result<ProfitProbability, PricingError> {
        let days = days_to_expiry.unwrap_or_else(|| self.default_horizon_days());
        self.payoff
            .probability_of_profit(simulations, include_underlying, days, sampler)
    }

    /// Extrema, breakevens (options-only and total) and probability of profit.
    ///
    /// # Errors
    /// Propagates grid and sampling errors.
    pub fn risk_reward_summary<S: NormalSampler + ?Sized>(
        &self,
        sampler: &mut S,
    ) -> Result<RiskRewardSummary, PricingError> {
        Ok(RiskRewardSummary {
            net_debit_credit: self.payoff.net_debit_credit(),
            underlying_quantity: self.payoff.underlying_quantity(),
            current_spot: self.payoff.market().spot,
            options_max_loss: self.max_loss(None, false)?,
            options_max_profit: self.max_profit(None, false)?,
            total_max_loss: self.max_loss(None, true)?,
            total_max_profit: self.max_profit(None, true)?,
            options_breakevens: self.breakeven_points(None, false)?,
            total_breakevens: self.breakeven_points(None, true)?,
            probability_of_profit: self.probability_of_profit(
                self.config.num_simulations,
                true,
                None,
                sampler,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OptionType;
    use crate::engines::pde::CrankNicolsonSolver;
    use crate::instruments::EngineConfig;
    use crate::market::MarketState;
    use crate::mc::{ReplayNormalSampler, SeededNormalSampler};
    use crate::portfolio::PositionSpec;
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
        let config = EngineConfig::default().with_solver(CrankNicolsonSolver::new(100, 100));
        Portfolio::with_config(market, config).unwrap()
    }

    #[test]
    fn horizon_defaults_to_nearest_maturity_or_thirty_days() {
        let mut book = book();
        assert_eq!(RiskRewardAnalyzer::new(&book).unwrap().default_horizon_days(), 30.0);

        book.add_position(PositionSpec::new(OptionType::Put, 95.0, today() + Days::new(45), 1))
            .unwrap();
        book.add_position(PositionSpec::new(OptionType::Call, 105.0, today() + Days::new(20), -1))
            .unwrap();
        assert_eq!(RiskRewardAnalyzer::new(&book).unwrap().default_horizon_days(), 20.0);
    }

    #[test]
    fn replayed_draws_give_exact_fraction() {
        let mut book = book();
        book.set_underlying_quantity(1.0).unwrap();
        let analyzer = RiskRewardAnalyzer::new(&book).unwrap();

        // Long stock only: profit exactly when the terminal spot ends above 100.
        let mut sampler = ReplayNormalSampler::new(vec![3.0, 2.0, -2.0, -3.0]);
        let pop = analyzer
            .probability_of_profit(4, true, Some(30.0), &mut sampler)
            .unwrap();
        assert_eq!(pop.probability, 0.5);
        assert_eq!(pop.simulations, 4);
    }

    #[test]
    fn zero_simulations_rejected() {
        let analyzer = RiskRewardAnalyzer::new(&book()).unwrap();
        let mut sampler = SeededNormalSampler::new(1);
        assert!(matches!(
            analyzer.probability_of_profit(0, true, None, &mut sampler),
            Err(PricingError::InvalidArgument(_))
        ));
        assert!(
            analyzer
                .probability_of_profit(10, true, Some(-1.0), &mut sampler)
                .is_err()
        );
    }

    #[test]
    fn summary_combines_both_variants() {
        let mut book = book();
        book.add_position(PositionSpec::new(OptionType::Call, 105.0, today() + Days::new(30), -5))
            .unwrap();
        book.set_underlying_quantity(500.0).unwrap();

        let analyzer = RiskRewardAnalyzer::with_config(
            &book,
            RiskRewardConfig::default().with_num_simulations(2_000),
        )
        .unwrap();
        let mut sampler = SeededNormalSampler::new(3);
        let summary = analyzer.risk_reward_summary(&mut sampler).unwrap();

        // Covered call: flat above the strike in total, naked short call alone.
        assert!(summary.options_max_loss.is_unlimited);
        assert!(!summary.total_max_loss.is_unlimited);
        assert!(!summary.total_max_profit.is_unlimited);
        assert!(summary.net_debit_credit < 0.0);
        assert_eq!(summary.current_spot, 100.0);
        assert_eq!(summary.total_breakevens.len(), 1);
        assert_eq!(summary.probability_of_profit.simulations, 2_000);
    }

    #[test]
    fn invalid_config_rejected() {
        let bad = RiskRewardConfig::default().with_bounds(2.0, 0.5);
        assert!(RiskRewardAnalyzer::with_config(&book(), bad).is_err());
    }
}
