//! Valuation engine for one American option.
//!
//! [`AmericanOption`] couples immutable [`OptionContract`] terms with a mutable
//! [`MarketState`] snapshot and a lazily solved Crank-Nicolson grid. Any market
//! mutation drops the cached solution, so every observation is a pure function
//! of the current (contract, market) pair.
//!
//! Delta and gamma come off the solved grid when the solver advertises them.
//! Vega, rho and theta (and delta/gamma when the solver does not expose them)
//! are bump-and-reprice estimates computed on copies of the market state; the
//! engine's own state is never touched while bumping, so nothing has to be
//! rolled back on any path.

use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{Greeks, OptionType, PricingError};
use crate::engines::pde::{CrankNicolsonSolver, FdProblem, GridSolution};
use crate::greeks::{
    BumpSizes, Sensitivity, SensitivityCapabilities, SensitivitySource, central_difference,
    forward_difference, per_percentage_point,
};
use crate::instruments::OptionContract;
use crate::market::{MarketState, validate_spot, validate_volatility};
use crate::math::GridArena;

/// Solver and bump settings shared by every engine of a portfolio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub solver: CrankNicolsonSolver,
    pub bumps: BumpSizes,
}

impl EngineConfig {
    pub fn with_solver(mut self, solver: CrankNicolsonSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_bumps(mut self, bumps: BumpSizes) -> Self {
        self.bumps = bumps;
        self
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for unusable grid or bump settings.
    pub fn validate(&self) -> Result<(), PricingError> {
        self.solver.validate()?;
        self.bumps.validate()
    }
}

/// Price and the five sensitivities of one option, per share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksReport {
    pub price: f64,
    #[serde(flatten)]
    pub greeks: Greeks,
}

/// American option valuation engine.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use hedgeferric::instruments::{AmericanOption, OptionContract};
/// use hedgeferric::market::MarketState;
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
/// let market = MarketState::builder()
///     .spot(100.0)
///     .volatility(0.25)
///     .rate(0.05)
///     .dividend_yield(0.02)
///     .valuation_date(today)
///     .build()
///     .unwrap();
/// let contract = OptionContract::put(95.0, today + chrono::Days::new(30)).unwrap();
///
/// let option = AmericanOption::new(contract, market).unwrap();
/// let price = option.price().unwrap();
/// assert!(price > 0.0);
/// assert!(option.delta().unwrap() < 0.0);
/// ```
#[derive(Debug)]
pub struct AmericanOption {
    contract: OptionContract,
    market: MarketState,
    config: EngineConfig,
    capabilities: SensitivityCapabilities,
    solution: OnceLock<GridSolution>,
    arena: Mutex<GridArena>,
}

impl Clone for AmericanOption {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract,
            market: self.market,
            config: self.config,
            capabilities: self.capabilities,
            solution: self.solution.clone(),
            arena: Mutex::new(GridArena::with_capacity(self.config.solver.space_steps)),
        }
    }
}

impl AmericanOption {
    /// Builds an engine with the default grid and bump sizes.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for invalid terms or market inputs, or
    /// when the maturity is not strictly after the valuation date.
    pub fn new(contract: OptionContract, market: MarketState) -> Result<Self, PricingError> {
        Self::with_config(contract, market, EngineConfig::default())
    }

    /// Builds an engine with explicit solver and bump settings.
    ///
    /// # Errors
    /// See [`AmericanOption::new`].
    pub fn with_config(
        contract: OptionContract,
        market: MarketState,
        config: EngineConfig,
    ) -> Result<Self, PricingError> {
        contract.validate()?;
        market.validate()?;
        config.validate()?;
        ensure_live(&contract, market.valuation_date)?;

        Ok(Self {
            contract,
            market,
            config,
            capabilities: config.solver.capabilities(),
            solution: OnceLock::new(),
            arena: Mutex::new(GridArena::with_capacity(config.solver.space_steps)),
        })
    }

    pub fn contract(&self) -> &OptionContract {
        &self.contract
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn option_type(&self) -> OptionType {
        self.contract.option_type()
    }

    pub fn strike(&self) -> f64 {
        self.contract.strike()
    }

    pub fn maturity(&self) -> NaiveDate {
        self.contract.maturity()
    }

    /// Act/365 year fraction from valuation date to maturity.
    pub fn time_to_maturity(&self) -> f64 {
        self.market.time_to(self.contract.maturity())
    }

    /// Whether `sensitivity` is read off the grid or bumped.
    pub fn sensitivity_source(&self, sensitivity: Sensitivity) -> SensitivitySource {
        self.capabilities.source(sensitivity)
    }

    /// Hot-swaps the spot price.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when `spot` is not finite and positive;
    /// the engine is left unchanged.
    pub fn update_spot(&mut self, spot: f64) -> Result<(), PricingError> {
        validate_spot(spot)?;
        self.market.spot = spot;
        self.invalidate();
        Ok(())
    }

    /// Hot-swaps the volatility.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when `volatility` is negative or not finite.
    pub fn update_volatility(&mut self, volatility: f64) -> Result<(), PricingError> {
        validate_volatility(volatility)?;
        self.market.volatility = volatility;
        self.invalidate();
        Ok(())
    }

    /// Moves the valuation date.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when the option would be expired.
    pub fn update_valuation_date(&mut self, valuation_date: NaiveDate) -> Result<(), PricingError> {
        ensure_live(&self.contract, valuation_date)?;
        self.market.valuation_date = valuation_date;
        self.invalidate();
        Ok(())
    }

    /// Puts back a previously validated market snapshot.
    pub(crate) fn restore_market(&mut self, market: MarketState) {
        if self.market != market {
            self.market = market;
            self.invalidate();
        }
    }

    fn invalidate(&mut self) {
        self.solution = OnceLock::new();
    }

    /// Solved grid at the current market, computed once per market state.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solve.
    pub fn solution(&self) -> Result<GridSolution, PricingError> {
        if let Some(solution) = self.solution.get() {
            return Ok(*solution);
        }
        let solution = self.solve_at(&self.market)?;
        let _ = self.solution.set(solution);
        Ok(solution)
    }

    fn solve_at(&self, market: &MarketState) -> Result<GridSolution, PricingError> {
        let problem = FdProblem {
            option_type: self.contract.option_type(),
            exercise: self.contract.exercise(),
            strike: self.contract.strike(),
            expiry: market.time_to(self.contract.maturity()),
            spot: market.spot,
            volatility: market.volatility,
            rate: market.rate,
            dividend_yield: market.dividend_yield,
        };
        let mut arena = self.arena.lock().unwrap_or_else(PoisonError::into_inner);
        self.config.solver.solve(&problem, &mut arena)
    }

    /// Price under `market`; at or past maturity this is the exercise payoff.
    fn price_at(&self, market: &MarketState) -> Result<f64, PricingError> {
        if market.valuation_date >= self.contract.maturity() {
            return Ok(self.contract.intrinsic(market.spot));
        }
        Ok(self.solve_at(market)?.price)
    }

    fn delta_at(&self, market: &MarketState) -> Result<f64, PricingError> {
        if self.capabilities.delta {
            return Ok(self.solve_at(market)?.delta);
        }
        let h = market.spot * self.config.bumps.spot_relative;
        let up = self.price_at(&MarketState {
            spot: market.spot + h,
            ..*market
        })?;
        let down = self.price_at(&MarketState {
            spot: market.spot - h,
            ..*market
        })?;
        Ok(central_difference(up, down, h))
    }

    /// Option price per share.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solve.
    pub fn price(&self) -> Result<f64, PricingError> {
        Ok(self.solution()?.price)
    }

    /// `d price / d spot`.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solve.
    pub fn delta(&self) -> Result<f64, PricingError> {
        if self.capabilities.delta {
            return Ok(self.solution()?.delta);
        }
        debug!(sensitivity = "delta", "bump-and-reprice fallback");
        self.delta_at(&self.market)
    }

    /// `d^2 price / d spot^2`.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solve.
    pub fn gamma(&self) -> Result<f64, PricingError> {
        if self.capabilities.gamma {
            return Ok(self.solution()?.gamma);
        }
        debug!(sensitivity = "gamma", "bump-and-reprice fallback");
        let h = self.market.spot * self.config.bumps.spot_relative;
        let up = self.delta_at(&MarketState {
            spot: self.market.spot + h,
            ..self.market
        })?;
        let down = self.delta_at(&MarketState {
            spot: self.market.spot - h,
            ..self.market
        })?;
        Ok(central_difference(up, down, h))
    }

    /// Price change per 1 percentage point of volatility.
    ///
    /// Uses a forward difference when volatility is below the bump size.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solves.
    pub fn vega(&self) -> Result<f64, PricingError> {
        trace!(sensitivity = "vega", "bump-and-reprice");
        let h = self.config.bumps.vol;
        let sigma = self.market.volatility;
        let up = self.price_at(&MarketState {
            volatility: sigma + h,
            ..self.market
        })?;
        let raw = if sigma >= h {
            let down = self.price_at(&MarketState {
                volatility: sigma - h,
                ..self.market
            })?;
            central_difference(up, down, h)
        } else {
            forward_difference(up, self.price()?, h)
        };
        Ok(per_percentage_point(raw))
    }

    /// One-calendar-day change in price (forward difference, not annualized).
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solves.
    pub fn theta(&self) -> Result<f64, PricingError> {
        trace!(sensitivity = "theta", "bump-and-reprice");
        let days = self.config.bumps.theta_days;
        let rolled = self
            .market
            .valuation_date
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                PricingError::InvalidArgument("valuation date overflow in theta".to_string())
            })?;
        let later = self.price_at(&MarketState {
            valuation_date: rolled,
            ..self.market
        })?;
        Ok(forward_difference(later, self.price()?, f64::from(days)))
    }

    /// Price change per 1 percentage point of the risk-free rate.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solves.
    pub fn rho(&self) -> Result<f64, PricingError> {
        trace!(sensitivity = "rho", "bump-and-reprice");
        let h = self.config.bumps.rate;
        let up = self.price_at(&MarketState {
            rate: self.market.rate + h,
            ..self.market
        })?;
        let down = self.price_at(&MarketState {
            rate: self.market.rate - h,
            ..self.market
        })?;
        Ok(per_percentage_point(central_difference(up, down, h)))
    }

    /// All five sensitivities.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solves.
    pub fn greeks(&self) -> Result<Greeks, PricingError> {
        Ok(Greeks {
            delta: self.delta()?,
            gamma: self.gamma()?,
            vega: self.vega()?,
            theta: self.theta()?,
            rho: self.rho()?,
        })
    }

    /// Price plus all five sensitivities.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solves.
    pub fn report(&self) -> Result<GreeksReport, PricingError> {
        Ok(GreeksReport {
            price: self.price()?,
            greeks: self.greeks()?,
        })
    }

    /// `max(0, S - K)` for calls, `max(0, K - S)` for puts.
    pub fn intrinsic_value(&self) -> f64 {
        self.contract.intrinsic(self.market.spot)
    }

    /// `price - intrinsic`, reported as-is. Never negative for American exercise,
    /// because the solved price is projected onto the exercise payoff.
    ///
    /// # Errors
    /// Propagates [`PricingError::NumericalFailure`] from the grid solve.
    pub fn time_value(&self) -> Result<f64, PricingError> {
        Ok(self.price()? - self.intrinsic_value())
    }
}

fn ensure_live(contract: &OptionContract, valuation_date: NaiveDate) -> Result<(), PricingError> {
    if contract.maturity() <= valuation_date {
        return Err(PricingError::InvalidArgument(format!(
            "maturity {} must be after valuation date {}",
            contract.maturity(),
            valuation_date
        )));
    }
    Ok(())
}
