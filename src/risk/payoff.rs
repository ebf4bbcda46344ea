//! Closed-form expiry P&L of a portfolio snapshot.
//!
//! Each option leg pays its intrinsic value at the terminal spot less the
//! premium it is carried at today; the underlying hedge contributes
//! `(S_T - S_0) * quantity`. No solver is involved.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::{OptionType, PricingError};
use crate::market::MarketState;
use crate::portfolio::Portfolio;

/// One option leg frozen at its current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayoffLeg {
    pub option_type: OptionType,
    pub strike: f64,
    pub maturity: NaiveDate,
    /// `quantity * multiplier`.
    pub scale: f64,
    /// Per-share price paid (or received) today.
    pub premium: f64,
}

impl PayoffLeg {
    #[inline]
    pub fn pnl_at(&self, terminal_spot: f64) -> f64 {
        (self.option_type.intrinsic(terminal_spot, self.strike) - self.premium) * self.scale
    }
}

/// Expiry payoff of a portfolio, priced once at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryPayoff {
    legs: Vec<PayoffLeg>,
    underlying_quantity: f64,
    market: MarketState,
}

impl ExpiryPayoff {
    /// Snapshots the legs, premiums and market of `portfolio`.
    ///
    /// # Errors
    /// Propagates pricing failures from the position engines.
    pub fn from_portfolio(portfolio: &Portfolio) -> Result<Self, PricingError> {
        let legs = portfolio
            .positions()
            .iter()
            .map(|p| {
                let contract = p.option().contract();
                Ok(PayoffLeg {
                    option_type: contract.option_type(),
                    strike: contract.strike(),
                    maturity: contract.maturity(),
                    scale: p.scale(),
                    premium: p.option().price()?,
                })
            })
            .collect::<Result<Vec<_>, PricingError>>()?;

        Ok(Self {
            legs,
            underlying_quantity: portfolio.underlying_quantity(),
            market: *portfolio.market(),
        })
    }

    pub fn legs(&self) -> &[PayoffLeg] {
        &self.legs
    }

    pub fn underlying_quantity(&self) -> f64 {
        self.underlying_quantity
    }

    pub fn market(&self) -> &MarketState {
        &self.market
    }

    /// Sum of premiums times scale; positive is a net debit.
    pub fn net_debit_credit(&self) -> f64 {
        self.legs.iter().map(|leg| leg.premium * leg.scale).sum()
    }

    /// Earliest leg maturity, if any legs are held.
    pub fn nearest_maturity(&self) -> Option<NaiveDate> {
        self.legs.iter().map(|leg| leg.maturity).min()
    }

    /// P&L if every leg expired with the underlying at `terminal_spot`.
    pub fn pnl_at_expiry(&self, terminal_spot: f64, include_underlying: bool) -> f64 {
        let options: f64 = self.legs.iter().map(|leg| leg.pnl_at(terminal_spot)).sum();
        if include_underlying {
            options + (terminal_spot - self.market.spot) * self.underlying_quantity
        } else {
            options
        }
    }

    /// `d pnl / d S_T` as `S_T -> infinity`: long calls and long stock add,
    /// short calls and short stock subtract, puts vanish.
    pub fn asymptotic_slope(&self, include_underlying: bool) -> f64 {
        let calls: f64 = self
            .legs
            .iter()
            .filter(|leg| leg.option_type == OptionType::Call)
            .map(|leg| leg.scale)
            .sum();
        if include_underlying {
            calls + self.underlying_quantity
        } else {
            calls
        }
    }
}

/// Extreme value of the expiry P&L over a spot grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub value: f64,
    /// Grid spot where `value` was first reached.
    pub spot: f64,
    /// The P&L grows without bound in this direction as spot rises.
    pub is_unlimited: bool,
}

/// `points` evenly spaced values on `[lower, upper]`.
pub fn linspace(lower: f64, upper: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![lower],
        _ => {
            let step = (upper - lower) / (points - 1) as f64;
            (0..points).map(|i| lower + step * i as f64).collect()
        }
    }
}

pub(crate) fn validate_grid(grid: &[f64]) -> Result<(), PricingError> {
    if grid.is_empty() {
        return Err(PricingError::InvalidArgument(
            "spot grid must not be empty".to_string(),
        ));
    }
    if let Some(bad) = grid.iter().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(PricingError::InvalidArgument(format!(
            "spot grid values must be finite and >= 0, got {bad}"
        )));
    }
    Ok(())
}

/// Minimum P&L over `grid`.
///
/// # Errors
/// Returns [`PricingError::InvalidArgument`] for an empty grid or negative/non-finite spots.
pub fn min_pnl(
    payoff: &ExpiryPayoff,
    grid: &[f64],
    include_underlying: bool,
) -> Result<Extremum, PricingError> {
    validate_grid(grid)?;
    let (spot, value) = scan(payoff, grid, include_underlying, |candidate, best| candidate < best);
    Ok(Extremum {
        value,
        spot,
        is_unlimited: payoff.asymptotic_slope(include_underlying) < 0.0,
    })
}

/// Maximum P&L over `grid`.
///
/// # Errors
/// Returns [`PricingError::InvalidArgument`] for an empty grid or negative/non-finite spots.
pub fn max_pnl(
    payoff: &ExpiryPayoff,
    grid: &[f64],
    include_underlying: bool,
) -> Result<Extremum, PricingError> {
    validate_grid(grid)?;
    let (spot, value) = scan(payoff, grid, include_underlying, |candidate, best| candidate > best);
    Ok(Extremum {
        value,
        spot,
        is_unlimited: payoff.asymptotic_slope(include_underlying) > 0.0,
    })
}

fn scan(
    payoff: &ExpiryPayoff,
    grid: &[f64],
    include_underlying: bool,
    better: impl Fn(f64, f64) -> bool,
) -> (f64, f64) {
    let first = grid[0];
    grid[1..].iter().fold(
        (first, payoff.pnl_at_expiry(first, include_underlying)),
        |(best_spot, best), &spot| {
            let pnl = payoff.pnl_at_expiry(spot, include_underlying);
            if better(pnl, best) {
                (spot, pnl)
            } else {
                (best_spot, best)
            }
        },
    )
}

/// Spots just after each sign change of the P&L along `grid` (sorted ascending first).
///
/// Resolution is limited to the grid spacing.
///
/// # Errors
/// Returns [`PricingError::InvalidArgument`] for an empty grid or negative/non-finite spots.
pub fn breakevens(
    payoff: &ExpiryPayoff,
    grid: &[f64],
    include_underlying: bool,
) -> Result<Vec<f64>, PricingError> {
    validate_grid(grid)?;
    let mut spots = grid.to_vec();
    spots.sort_by(f64::total_cmp);

    let pnl: Vec<f64> = spots
        .iter()
        .map(|&s| payoff.pnl_at_expiry(s, include_underlying))
        .collect();

    Ok(pnl
        .windows(2)
        .zip(spots.iter().skip(1))
        .filter(|(w, _)| (w[0] < 0.0 && w[1] >= 0.0) || (w[0] > 0.0 && w[1] <= 0.0))
        .map(|(_, &spot)| spot)
        .collect())
}
