//! Signed, multiplied holding of one option.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{Greeks, OptionType, PricingError};
use crate::instruments::AmericanOption;

/// Default shares per contract.
pub const DEFAULT_MULTIPLIER: u32 = 100;

/// Default display label.
pub const DEFAULT_LABEL: &str = "UNKNOWN";

/// Terms for a new portfolio position.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use hedgeferric::core::OptionType;
/// use hedgeferric::portfolio::PositionSpec;
///
/// let spec = PositionSpec::new(
///     OptionType::Put,
///     95.0,
///     NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
///     5,
/// )
/// .with_label("SPY");
/// assert_eq!(spec.multiplier, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSpec {
    pub option_type: OptionType,
    pub strike: f64,
    pub maturity: NaiveDate,
    /// Contracts held; negative for short.
    pub quantity: i64,
    pub multiplier: u32,
    pub label: String,
}

impl PositionSpec {
    pub fn new(option_type: OptionType, strike: f64, maturity: NaiveDate, quantity: i64) -> Self {
        Self {
            option_type,
            strike,
            maturity,
            quantity,
            multiplier: DEFAULT_MULTIPLIER,
            label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn with_multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Partial change to an existing position.
///
/// Changing strike, maturity or kind rebuilds the valuation engine; quantity,
/// multiplier and label are edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub option_type: Option<OptionType>,
    pub strike: Option<f64>,
    pub maturity: Option<NaiveDate>,
    pub quantity: Option<i64>,
    pub multiplier: Option<u32>,
    pub label: Option<String>,
}

impl PositionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = Some(option_type);
        self
    }

    pub fn strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    pub fn maturity(mut self, maturity: NaiveDate) -> Self {
        self.maturity = Some(maturity);
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn multiplier(mut self, multiplier: u32) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One option holding. Position metrics are per-share metrics times
/// `quantity * multiplier`.
#[derive(Debug, Clone)]
pub struct Position {
    option: AmericanOption,
    quantity: i64,
    multiplier: u32,
    label: String,
}

impl Position {
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for a zero multiplier.
    pub fn new(
        option: AmericanOption,
        quantity: i64,
        multiplier: u32,
        label: impl Into<String>,
    ) -> Result<Self, PricingError> {
        validate_multiplier(multiplier)?;
        Ok(Self {
            option,
            quantity,
            multiplier,
            label: label.into(),
        })
    }

    pub fn option(&self) -> &AmericanOption {
        &self.option
    }

    pub(crate) fn option_mut(&mut self) -> &mut AmericanOption {
        &mut self.option
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Shares controlled: `quantity * multiplier`.
    #[inline]
    pub fn scale(&self) -> f64 {
        self.quantity as f64 * f64::from(self.multiplier)
    }

    /// Same holding on a different engine.
    pub(crate) fn with_option(&self, option: AmericanOption) -> Self {
        Self {
            option,
            quantity: self.quantity,
            multiplier: self.multiplier,
            label: self.label.clone(),
        }
    }

    pub(crate) fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    pub(crate) fn set_multiplier(&mut self, multiplier: u32) -> Result<(), PricingError> {
        validate_multiplier(multiplier)?;
        self.multiplier = multiplier;
        Ok(())
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub fn position_value(&self) -> Result<f64, PricingError> {
        Ok(self.option.price()? * self.scale())
    }

    pub fn position_delta(&self) -> Result<f64, PricingError> {
        Ok(self.option.delta()? * self.scale())
    }

    pub fn position_gamma(&self) -> Result<f64, PricingError> {
        Ok(self.option.gamma()? * self.scale())
    }

    pub fn position_vega(&self) -> Result<f64, PricingError> {
        Ok(self.option.vega()? * self.scale())
    }

    /// Per calendar day.
    pub fn position_theta(&self) -> Result<f64, PricingError> {
        Ok(self.option.theta()? * self.scale())
    }

    pub fn position_rho(&self) -> Result<f64, PricingError> {
        Ok(self.option.rho()? * self.scale())
    }

    /// All five position-level sensitivities.
    pub fn position_greeks(&self) -> Result<Greeks, PricingError> {
        Ok(self.option.greeks()?.scaled(self.scale()))
    }

    /// Flat export record with per-share and position-level figures.
    ///
    /// # Errors
    /// Propagates pricing failures from the engine.
    pub fn to_record(&self) -> Result<PositionRecord, PricingError> {
        let report = self.option.report()?;
        let scale = self.scale();
        let per_share = report.greeks;
        let position = per_share.scaled(scale);
        let contract = self.option.contract();

        Ok(PositionRecord {
            label: self.label.clone(),
            kind: contract.option_type(),
            strike: contract.strike(),
            maturity: contract.maturity(),
            quantity: self.quantity,
            multiplier: self.multiplier,
            price: report.price,
            position_value: report.price * scale,
            delta: per_share.delta,
            gamma: per_share.gamma,
            vega: per_share.vega,
            theta: per_share.theta,
            rho: per_share.rho,
            position_delta: position.delta,
            position_gamma: position.gamma,
            position_vega: position.vega,
            position_theta: position.theta,
            position_rho: position.rho,
        })
    }

    /// Terms-only listing row.
    pub fn to_row(&self) -> PositionRow {
        let contract = self.option.contract();
        PositionRow {
            label: self.label.clone(),
            kind: contract.option_type(),
            strike: contract.strike(),
            maturity: contract.maturity(),
            quantity: self.quantity,
            multiplier: self.multiplier,
        }
    }
}

fn validate_multiplier(multiplier: u32) -> Result<(), PricingError> {
    if multiplier == 0 {
        return Err(PricingError::InvalidArgument(
            "contract multiplier must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// Export record for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub label: String,
    pub kind: OptionType,
    pub strike: f64,
    pub maturity: NaiveDate,
    pub quantity: i64,
    pub multiplier: u32,
    pub price: f64,
    pub position_value: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub rho: f64,
    pub position_delta: f64,
    pub position_gamma: f64,
    pub position_vega: f64,
    pub position_theta: f64,
    pub position_rho: f64,
}

/// Contract terms and holding size without any pricing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRow {
    pub label: String,
    pub kind: OptionType,
    pub strike: f64,
    pub maturity: NaiveDate,
    pub quantity: i64,
    pub multiplier: u32,
}
