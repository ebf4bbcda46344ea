use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::PricingError;

/// Plain-vanilla option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// Call option payoff profile.
    Call,
    /// Put option payoff profile.
    Put,
}

impl OptionType {
    /// Immediate-exercise payoff per share: `max(0, S - K)` or `max(0, K - S)`.
    #[inline]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }

    /// Lowercase label used in export records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    /// Parses `"call"` / `"put"` case-insensitively.
    ///
    /// # Examples
    /// ```
    /// use hedgeferric::core::OptionType;
    ///
    /// assert_eq!("Put".parse::<OptionType>().unwrap(), OptionType::Put);
    /// assert!("straddle".parse::<OptionType>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(PricingError::InvalidArgument(format!(
                "invalid option type `{other}`, expected `call` or `put`"
            ))),
        }
    }
}

/// Exercise rights for an option contract.
///
/// Portfolio contracts are always American; the grid solver also accepts European.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    /// Exercise only at expiry.
    European,
    /// Exercise at any time up to expiry.
    #[default]
    American,
}
