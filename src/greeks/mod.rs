//! Sensitivity bookkeeping for the valuation engine.
//!
//! A solver advertises which sensitivities it reads straight off its solved grid
//! through [`SensitivityCapabilities`]; everything else is estimated by
//! bump-and-reprice with the fixed [`BumpSizes`]. The choice is made once per
//! engine, never by trying the analytic path and recovering from a failure.

use serde::{Deserialize, Serialize};

use crate::core::PricingError;

/// One of the five standard sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Delta,
    Gamma,
    Vega,
    Theta,
    Rho,
}

impl Sensitivity {
    pub const ALL: [Self; 5] = [Self::Delta, Self::Gamma, Self::Vega, Self::Theta, Self::Rho];
}

/// Where a reported sensitivity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivitySource {
    /// Read from the solved grid's finite-difference stencil.
    Grid,
    /// Centered (or one-day forward) bump-and-reprice.
    BumpAndReprice,
}

/// Sensitivities a solver exposes directly.
///
/// Only spot derivatives can come off a single solved grid; vega, theta and
/// rho always need a second solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensitivityCapabilities {
    pub delta: bool,
    pub gamma: bool,
}

impl SensitivityCapabilities {
    /// No direct sensitivities; every Greek is bumped.
    pub fn bump_only() -> Self {
        Self::default()
    }

    /// Delta and gamma from the spot stencil.
    pub fn spot_stencil() -> Self {
        Self {
            delta: true,
            gamma: true,
        }
    }

    pub fn supports(&self, sensitivity: Sensitivity) -> bool {
        match sensitivity {
            Sensitivity::Delta => self.delta,
            Sensitivity::Gamma => self.gamma,
            Sensitivity::Vega | Sensitivity::Theta | Sensitivity::Rho => false,
        }
    }

    pub fn source(&self, sensitivity: Sensitivity) -> SensitivitySource {
        if self.supports(sensitivity) {
            SensitivitySource::Grid
        } else {
            SensitivitySource::BumpAndReprice
        }
    }
}

/// Fixed bump sizes for the bump-and-reprice fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BumpSizes {
    /// Spot bump as a fraction of spot.
    pub spot_relative: f64,
    /// Absolute volatility bump.
    pub vol: f64,
    /// Absolute rate bump.
    pub rate: f64,
    /// Calendar days rolled forward for theta.
    pub theta_days: u32,
}

impl Default for BumpSizes {
    fn default() -> Self {
        Self {
            spot_relative: 0.01,
            vol: 0.01,
            rate: 0.01,
            theta_days: 1,
        }
    }
}

impl BumpSizes {
    pub fn with_spot_relative(mut self, spot_relative: f64) -> Self {
        self.spot_relative = spot_relative;
        self
    }

    pub fn with_vol(mut self, vol: f64) -> Self {
        self.vol = vol;
        self
    }

    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_theta_days(mut self, theta_days: u32) -> Self {
        self.theta_days = theta_days;
        self
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for non-positive or non-finite bumps.
    pub fn validate(&self) -> Result<(), PricingError> {
        let positive = |x: f64| x.is_finite() && x > 0.0;
        if !positive(self.spot_relative) || self.spot_relative >= 1.0 {
            return Err(PricingError::InvalidArgument(
                "spot bump must lie in (0, 1)".to_string(),
            ));
        }
        if !positive(self.vol) || !positive(self.rate) {
            return Err(PricingError::InvalidArgument(
                "vol and rate bumps must be finite and > 0".to_string(),
            ));
        }
        if self.theta_days == 0 {
            return Err(PricingError::InvalidArgument(
                "theta bump must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

/// `(f(x + h) - f(x - h)) / 2h`.
#[inline]
pub fn central_difference(up: f64, down: f64, step: f64) -> f64 {
    (up - down) / (2.0 * step)
}

/// `(f(x + h) - f(x)) / h`.
#[inline]
pub fn forward_difference(bumped: f64, base: f64, step: f64) -> f64 {
    (bumped - base) / step
}

/// Converts a per-unit sensitivity to a per-percentage-point one.
#[inline]
pub fn per_percentage_point(raw: f64) -> f64 {
    raw / 100.0
}
