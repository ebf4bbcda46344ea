//! Flat market snapshot shared by every option in a portfolio.
//!
//! Volatility, rate and dividend yield are term-structure-free constants. The
//! valuation date is an explicit field threaded through every pricing call;
//! there is no process-wide evaluation date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::PricingError;

/// Days per year used by the Act/365 Fixed day count.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Act/365 Fixed year fraction between two dates.
///
/// Negative when `end` precedes `start`.
///
/// # Examples
/// ```rust
/// use chrono::NaiveDate;
/// use hedgeferric::market::year_fraction;
///
/// let s = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let e = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
/// assert!((year_fraction(s, e) - 1.0).abs() < 1.0e-12);
/// ```
pub fn year_fraction(start: NaiveDate, end: NaiveDate) -> f64 {
    (end - start).num_days() as f64 / DAYS_PER_YEAR
}

/// Market snapshot used by the valuation engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Spot price of the underlying.
    pub spot: f64,
    /// Annualized Black-Scholes volatility.
    pub volatility: f64,
    /// Continuously compounded risk-free rate.
    pub rate: f64,
    /// Continuously compounded dividend yield.
    pub dividend_yield: f64,
    /// Date on which prices are observed.
    pub valuation_date: NaiveDate,
}

impl MarketState {
    /// Starts a market builder.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use hedgeferric::market::MarketState;
    ///
    /// let market = MarketState::builder()
    ///     .spot(100.0)
    ///     .volatility(0.25)
    ///     .rate(0.05)
    ///     .dividend_yield(0.02)
    ///     .valuation_date(NaiveDate::from_ymd_opt(2025, 1, 2).unwrap())
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(market.spot, 100.0);
    /// ```
    #[inline]
    pub fn builder() -> MarketStateBuilder {
        MarketStateBuilder::default()
    }

    /// Checks the domain constraints on every field.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when spot is not strictly positive,
    /// volatility is negative, or any field is not finite.
    pub fn validate(&self) -> Result<(), PricingError> {
        validate_spot(self.spot)?;
        validate_volatility(self.volatility)?;
        if !self.rate.is_finite() {
            return Err(PricingError::InvalidArgument(
                "risk-free rate must be finite".to_string(),
            ));
        }
        if !self.dividend_yield.is_finite() {
            return Err(PricingError::InvalidArgument(
                "dividend yield must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Year fraction from the valuation date to `date`.
    #[inline]
    pub fn time_to(&self, date: NaiveDate) -> f64 {
        year_fraction(self.valuation_date, date)
    }
}

pub(crate) fn validate_spot(spot: f64) -> Result<(), PricingError> {
    if !spot.is_finite() || spot <= 0.0 {
        return Err(PricingError::InvalidArgument(format!(
            "spot must be finite and > 0, got {spot}"
        )));
    }
    Ok(())
}

pub(crate) fn validate_volatility(volatility: f64) -> Result<(), PricingError> {
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(PricingError::InvalidArgument(format!(
            "volatility must be finite and >= 0, got {volatility}"
        )));
    }
    Ok(())
}

/// Builder for [`MarketState`].
#[derive(Debug, Clone, Default)]
pub struct MarketStateBuilder {
    spot: Option<f64>,
    volatility: Option<f64>,
    rate: Option<f64>,
    dividend_yield: Option<f64>,
    valuation_date: Option<NaiveDate>,
}

impl MarketStateBuilder {
    /// Sets the spot price.
    #[inline]
    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    /// Sets the flat volatility.
    #[inline]
    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// Sets the flat risk-free rate.
    #[inline]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Sets the continuous dividend yield.
    #[inline]
    pub fn dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    /// Sets the valuation date.
    #[inline]
    pub fn valuation_date(mut self, valuation_date: NaiveDate) -> Self {
        self.valuation_date = Some(valuation_date);
        self
    }

    /// Validates and builds a [`MarketState`].
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when spot, volatility or the
    /// valuation date are missing, or the state violates [`MarketState::validate`].
    /// Rate and dividend yield default to zero.
    pub fn build(self) -> Result<MarketState, PricingError> {
        let spot = self
            .spot
            .ok_or_else(|| PricingError::InvalidArgument("market spot is required".to_string()))?;
        let volatility = self.volatility.ok_or_else(|| {
            PricingError::InvalidArgument("market volatility is required".to_string())
        })?;
        let valuation_date = self.valuation_date.ok_or_else(|| {
            PricingError::InvalidArgument("market valuation date is required".to_string())
        })?;

        let market = MarketState {
            spot,
            volatility,
            rate: self.rate.unwrap_or(0.0),
            dividend_yield: self.dividend_yield.unwrap_or(0.0),
            valuation_date,
        };
        market.validate()?;
        Ok(market)
    }
}

/// Partial market change applied to a whole portfolio.
///
/// Spot and volatility are hot-swapped on existing engines; rate, dividend
/// yield and valuation date force every engine to be rebuilt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketUpdate {
    pub spot: Option<f64>,
    pub volatility: Option<f64>,
    pub rate: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub valuation_date: Option<NaiveDate>,
}

impl MarketUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    pub fn valuation_date(mut self, valuation_date: NaiveDate) -> Self {
        self.valuation_date = Some(valuation_date);
        self
    }

    /// True when the update touches a parameter that cannot be hot-swapped.
    pub fn requires_rebuild(&self) -> bool {
        self.rate.is_some() || self.dividend_yield.is_some() || self.valuation_date.is_some()
    }

    /// Returns `base` with every provided field replaced, validated.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when the merged state is invalid.
    pub fn apply_to(&self, base: &MarketState) -> Result<MarketState, PricingError> {
        let merged = MarketState {
            spot: self.spot.unwrap_or(base.spot),
            volatility: self.volatility.unwrap_or(base.volatility),
            rate: self.rate.unwrap_or(base.rate),
            dividend_yield: self.dividend_yield.unwrap_or(base.dividend_yield),
            valuation_date: self.valuation_date.unwrap_or(base.valuation_date),
        };
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn builder_rejects_non_positive_spot_and_negative_vol() {
        let err = MarketState::builder()
            .spot(0.0)
            .volatility(0.2)
            .valuation_date(date(2025, 1, 2))
            .build();
        assert!(matches!(err, Err(PricingError::InvalidArgument(_))));

        let err = MarketState::builder()
            .spot(100.0)
            .volatility(-0.01)
            .valuation_date(date(2025, 1, 2))
            .build();
        assert!(matches!(err, Err(PricingError::InvalidArgument(_))));
    }

    #[test]
    fn builder_requires_an_explicit_valuation_date() {
        let err = MarketState::builder().spot(100.0).volatility(0.2).build();
        assert_eq!(
            err,
            Err(PricingError::InvalidArgument(
                "market valuation date is required".to_string()
            ))
        );
    }

    #[test]
    fn zero_volatility_is_accepted() {
        let market = MarketState::builder()
            .spot(100.0)
            .volatility(0.0)
            .valuation_date(date(2025, 1, 2))
            .build()
            .unwrap();
        assert_eq!(market.volatility, 0.0);
        assert_eq!(market.rate, 0.0);
    }

    #[test]
    fn update_merges_and_flags_rebuilds() {
        let base = MarketState::builder()
            .spot(100.0)
            .volatility(0.2)
            .rate(0.05)
            .valuation_date(date(2025, 1, 2))
            .build()
            .unwrap();

        let hot = MarketUpdate::new().spot(101.0).volatility(0.3);
        assert!(!hot.requires_rebuild());
        let merged = hot.apply_to(&base).unwrap();
        assert_eq!(merged.spot, 101.0);
        assert_eq!(merged.rate, 0.05);

        assert!(MarketUpdate::new().rate(0.04).requires_rebuild());
        assert!(MarketUpdate::new().spot(-1.0).apply_to(&base).is_err());
    }

    #[test]
    fn year_fraction_is_act_365() {
        assert_eq!(year_fraction(date(2025, 1, 1), date(2025, 1, 31)), 30.0 / 365.0);
        assert_eq!(year_fraction(date(2025, 1, 31), date(2025, 1, 1)), -30.0 / 365.0);
    }
}
