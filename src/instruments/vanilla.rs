//! Immutable contract terms of a listed equity option.
//!
//! [`OptionContract`] stores side, strike and maturity date. Exercise is always
//! American for contracts priced by [`crate::instruments::AmericanOption`];
//! changing any term means building a new engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{ExerciseStyle, OptionType, PricingError};

/// Option contract terms.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use hedgeferric::core::OptionType;
/// use hedgeferric::instruments::OptionContract;
///
/// let put = OptionContract::new(
///     OptionType::Put,
///     95.0,
///     NaiveDate::from_ymd_opt(2025, 3, 21).unwrap(),
/// )
/// .unwrap();
/// assert_eq!(put.strike(), 95.0);
/// assert!(OptionContract::new(OptionType::Call, 0.0, put.maturity()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    option_type: OptionType,
    strike: f64,
    maturity: NaiveDate,
}

impl OptionContract {
    /// Validates and builds contract terms.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when `strike` is not finite and positive.
    pub fn new(
        option_type: OptionType,
        strike: f64,
        maturity: NaiveDate,
    ) -> Result<Self, PricingError> {
        let contract = Self {
            option_type,
            strike,
            maturity,
        };
        contract.validate()?;
        Ok(contract)
    }

    /// American call.
    pub fn call(strike: f64, maturity: NaiveDate) -> Result<Self, PricingError> {
        Self::new(OptionType::Call, strike, maturity)
    }

    /// American put.
    pub fn put(strike: f64, maturity: NaiveDate) -> Result<Self, PricingError> {
        Self::new(OptionType::Put, strike, maturity)
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn maturity(&self) -> NaiveDate {
        self.maturity
    }

    pub fn exercise(&self) -> ExerciseStyle {
        ExerciseStyle::American
    }

    /// Immediate-exercise value per share at `spot`.
    #[inline]
    pub fn intrinsic(&self, spot: f64) -> f64 {
        self.option_type.intrinsic(spot, self.strike)
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when `strike <= 0` or not finite.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(PricingError::InvalidArgument(format!(
                "strike must be finite and > 0, got {}",
                self.strike
            )));
        }
        Ok(())
    }
}
