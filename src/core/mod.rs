//! Core domain types and the library-wide error structure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod types;

pub use types::*;

/// Standardized Greeks container.
///
/// Units follow desk conventions: `vega` and `rho` per 1 percentage point
/// move in volatility/rate, `theta` per calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// First derivative to spot.
    pub delta: f64,
    /// Second derivative to spot.
    pub gamma: f64,
    /// First derivative to volatility, per 1% absolute.
    pub vega: f64,
    /// One-day change in value.
    pub theta: f64,
    /// First derivative to rate, per 1% absolute.
    pub rho: f64,
}

impl Greeks {
    /// Multiplies every sensitivity by `factor`.
    pub fn scaled(self, factor: f64) -> Self {
        Self {
            delta: self.delta * factor,
            gamma: self.gamma * factor,
            vega: self.vega * factor,
            theta: self.theta * factor,
            rho: self.rho * factor,
        }
    }
}

impl std::ops::Add for Greeks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            delta: self.delta + rhs.delta,
            gamma: self.gamma + rhs.gamma,
            vega: self.vega + rhs.vega,
            theta: self.theta + rhs.theta,
            rho: self.rho + rhs.rho,
        }
    }
}

impl std::iter::Sum for Greeks {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, g| acc + g)
    }
}

/// Engine and portfolio errors surfaced by the API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Bad contract terms or market inputs.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Position index outside `[0, len)`.
    #[error("position index {index} out of range for portfolio of {len} positions")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of positions held.
        len: usize,
    },
    /// The pricing grid could not be solved.
    #[error("numerical failure: {0}")]
    NumericalFailure(String),
}
