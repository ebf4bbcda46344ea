//! HedgeFerric prices American-style equity options on a Crank-Nicolson grid and
//! aggregates them into a hedged portfolio with risk/reward analytics.
//!
//! The crate has two numerical cores:
//! - a per-option valuation engine ([`instruments::AmericanOption`]) that solves the
//!   Black-Scholes-Merton PDE with an early-exercise projection at every time step and
//!   derives delta, gamma, vega, theta and rho;
//! - a portfolio layer ([`portfolio::Portfolio`], [`risk::RiskRewardAnalyzer`]) that sums
//!   position Greeks, sizes the delta hedge, searches the expiry payoff for extrema and
//!   breakevens, and estimates the probability of profit by Monte Carlo.
//!
//! Volatility, rate and dividend yield are flat constants. The valuation date is a field of
//! [`market::MarketState`] passed to every engine; there is no global evaluation date.
//!
//! Numerical considerations:
//! - Grid resolution is fixed per engine ([`engines::pde::CrankNicolsonSolver`], 200x200 by
//!   default); changing it changes prices, so it is never adjusted silently.
//! - Delta and gamma come off the solved grid; vega, theta and rho are bump-and-reprice.
//! - Monte Carlo standard errors shrink as `1 / sqrt(n)`; draws come from an injectable
//!   [`mc::NormalSampler`] so results are reproducible.
//!
//! # Feature Flags
//! - `parallel`: evaluates Monte Carlo draws in fixed-size Rayon chunks merged in order,
//!   giving the same results as the serial path.
//!
//! # Quick Start
//! Price one American put:
//! ```rust
//! use chrono::{Days, NaiveDate};
//! use hedgeferric::instruments::{AmericanOption, OptionContract};
//! use hedgeferric::market::MarketState;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
//! let market = MarketState::builder()
//!     .spot(100.0)
//!     .volatility(0.25)
//!     .rate(0.05)
//!     .dividend_yield(0.02)
//!     .valuation_date(today)
//!     .build()
//!     .unwrap();
//! let put = AmericanOption::new(OptionContract::put(105.0, today + Days::new(90)).unwrap(), market)
//!     .unwrap();
//!
//! let px = put.price().unwrap();
//! assert!(px >= put.intrinsic_value());
//! assert!((put.intrinsic_value() + put.time_value().unwrap() - px).abs() < 1.0e-12);
//! ```
//!
//! Hedge a small book:
//! ```rust
//! use chrono::{Days, NaiveDate};
//! use hedgeferric::prelude::*;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
//! let market = MarketState::builder()
//!     .spot(100.0)
//!     .volatility(0.25)
//!     .rate(0.05)
//!     .dividend_yield(0.02)
//!     .valuation_date(today)
//!     .build()
//!     .unwrap();
//!
//! let mut book = Portfolio::new(market).unwrap();
//! book.add_position(PositionSpec::new(OptionType::Put, 95.0, today + Days::new(30), 5))
//!     .unwrap();
//! book.add_position(PositionSpec::new(OptionType::Call, 105.0, today + Days::new(30), -5))
//!     .unwrap();
//! book.set_underlying_quantity(1_000.0).unwrap();
//!
//! let net = book.net_delta().unwrap();
//! assert!(net < 1_000.0);
//! assert_eq!(book.delta_adjustment_needed().unwrap(), -net);
//! ```
//!
//! Analyze the expiry payoff:
//! ```rust
//! use chrono::{Days, NaiveDate};
//! use hedgeferric::prelude::*;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
//! let market = MarketState::builder()
//!     .spot(100.0)
//!     .volatility(0.2)
//!     .valuation_date(today)
//!     .build()
//!     .unwrap();
//! let mut book = Portfolio::new(market).unwrap();
//! book.add_position(PositionSpec::new(OptionType::Call, 100.0, today + Days::new(60), 1))
//!     .unwrap();
//!
//! let analyzer = RiskRewardAnalyzer::new(&book).unwrap();
//! let premium = book.positions()[0].option().price().unwrap();
//! assert!(analyzer.pnl_at_expiry(100.0 + premium, false).abs() < 1.0e-9);
//! assert!(analyzer.max_profit(None, false).unwrap().is_unlimited);
//! ```

pub mod core;
pub mod engines;
pub mod greeks;
pub mod instruments;
pub mod market;
pub mod math;
pub mod mc;
pub mod portfolio;
pub mod risk;

/// Common imports for ergonomic usage.
pub mod prelude {
    pub use crate::core::*;
    pub use crate::greeks::{BumpSizes, Sensitivity, SensitivitySource};
    pub use crate::instruments::*;
    pub use crate::market::*;
    pub use crate::mc::{NormalSampler, ReplayNormalSampler, SeededNormalSampler};
    pub use crate::portfolio::*;
    pub use crate::risk::{
        Extremum, ProfitProbability, RiskRewardAnalyzer, RiskRewardConfig, RiskRewardSummary,
    };
}
