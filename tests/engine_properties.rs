//! Structural properties of the valuation engine across a grid of inputs.
//!
//! - intrinsic lower bound holds exactly
//! - American >= European >= discounted-strike bound, also at high vol and long dates
//! - default-grid price and delta against a binomial tree
//! - price == intrinsic + time value
//! - grid spot Greeks agree with bump-and-reprice
//! - market mutations never leave a stale price behind

use approx::assert_relative_eq;
use chrono::{Days, NaiveDate};
use hedgeferric::core::{OptionType, PricingError};
use hedgeferric::engines::analytic::black_scholes_merton_price;
use hedgeferric::engines::pde::CrankNicolsonSolver;
use hedgeferric::greeks::{Sensitivity, SensitivitySource};
use hedgeferric::instruments::{AmericanOption, EngineConfig, OptionContract};
use hedgeferric::market::MarketState;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date")
}

fn market(spot: f64, vol: f64, rate: f64, q: f64) -> MarketState {
    MarketState::builder()
        .spot(spot)
        .volatility(vol)
        .rate(rate)
        .dividend_yield(q)
        .valuation_date(today())
        .build()
        .expect("market build failed")
}

fn engine(
    option_type: OptionType,
    strike: f64,
    days: u64,
    market: MarketState,
    solver: CrankNicolsonSolver,
) -> AmericanOption {
    let contract = OptionContract::new(option_type, strike, today() + Days::new(days))
        .expect("valid contract");
    AmericanOption::with_config(contract, market, EngineConfig::default().with_solver(solver))
        .expect("engine build failed")
}

const SPOTS: [f64; 5] = [60.0, 90.0, 100.0, 110.0, 150.0];
const STRIKES: [f64; 3] = [80.0, 100.0, 120.0];
const DAYS: [u64; 3] = [7, 90, 365];

#[test]
fn price_bounds_hold_for_every_case() {
    let solver = CrankNicolsonSolver::new(100, 120);
    for option_type in [OptionType::Call, OptionType::Put] {
        for &spot in &SPOTS {
            for &strike in &STRIKES {
                for &days in &DAYS {
                    let m = market(spot, 0.3, 0.04, 0.01);
                    let option = engine(option_type, strike, days, m, solver);
                    let price = option.price().expect("pricing failed");
                    let intrinsic = option.intrinsic_value();
                    let t = option.time_to_maturity();

                    assert!(
                        price >= intrinsic,
                        "{option_type} S={spot} K={strike} d={days}: {price} < {intrinsic}"
                    );

                    let european =
                        black_scholes_merton_price(option_type, spot, strike, 0.04, 0.01, 0.3, t);
                    assert!(
                        price >= european - 0.05,
                        "{option_type} S={spot} K={strike} d={days}: american {price} < european {european}"
                    );

                    let time_value = option.time_value().expect("pricing failed");
                    assert_relative_eq!(intrinsic + time_value, price, epsilon = 1.0e-12);
                    assert!(time_value >= 0.0);
                }
            }
        }
    }
}

#[test]
fn price_bounds_hold_at_high_volatility_and_long_maturity() {
    let solver = CrankNicolsonSolver::default();
    for option_type in [OptionType::Call, OptionType::Put] {
        for spot in [60.0, 100.0, 150.0] {
            for &strike in &STRIKES {
                for vol in [0.6, 1.0] {
                    for days in [90, 365, 730] {
                        let m = market(spot, vol, 0.05, 0.02);
                        let option = engine(option_type, strike, days, m, solver);
                        let price = option.price().expect("pricing failed");
                        let t = option.time_to_maturity();
                        let european =
                            black_scholes_merton_price(option_type, spot, strike, 0.05, 0.02, vol, t);
                        assert!(
                            price >= option.intrinsic_value() && price >= european - 0.05,
                            "{option_type} S={spot} K={strike} vol={vol} d={days}: \
                             american {price} european {european}"
                        );
                        let time_value = option.time_value().expect("pricing failed");
                        assert_relative_eq!(
                            option.intrinsic_value() + time_value,
                            price,
                            epsilon = 1.0e-12
                        );
                    }
                }
            }
        }
    }
}

struct BinomialCase {
    option_type: OptionType,
    vol: f64,
    days: u64,
    price: f64,
    delta: f64,
}

// CRR binomial, 2000 steps: S=K=100, r=5%, q=2%.
const HIGH_VOL_CASES: &[BinomialCase] = &[
    BinomialCase {
        option_type: OptionType::Put,
        vol: 0.6,
        days: 365,
        price: 21.776,
        delta: -0.3674,
    },
    BinomialCase {
        option_type: OptionType::Put,
        vol: 0.8,
        days: 730,
        price: 38.555,
        delta: -0.2749,
    },
    BinomialCase {
        option_type: OptionType::Put,
        vol: 1.0,
        days: 365,
        price: 36.097,
        delta: -0.3004,
    },
    BinomialCase {
        option_type: OptionType::Call,
        vol: 0.8,
        days: 730,
        price: 43.023,
        delta: 0.7088,
    },
    BinomialCase {
        option_type: OptionType::Call,
        vol: 1.0,
        days: 365,
        price: 38.513,
        delta: 0.6901,
    },
];

#[test]
fn default_grid_matches_binomial_at_high_volatility() {
    for case in HIGH_VOL_CASES {
        let option = engine(
            case.option_type,
            100.0,
            case.days,
            market(100.0, case.vol, 0.05, 0.02),
            CrankNicolsonSolver::default(),
        );
        let price = option.price().expect("pricing failed");
        let delta = option.delta().expect("delta");
        assert!(
            (price - case.price).abs() < 0.06,
            "{} vol={} d={}: price {price} vs {}",
            case.option_type,
            case.vol,
            case.days,
            case.price
        );
        assert!(
            (delta - case.delta).abs() < 0.005,
            "{} vol={} d={}: delta {delta} vs {}",
            case.option_type,
            case.vol,
            case.days,
            case.delta
        );
    }
}

#[test]
fn american_call_above_discounted_strike_bound() {
    let solver = CrankNicolsonSolver::new(100, 120);
    for &spot in &SPOTS {
        let option = engine(OptionType::Call, 100.0, 180, market(spot, 0.25, 0.05, 0.0), solver);
        let t = option.time_to_maturity();
        let bound = (spot - 100.0 * (-0.05 * t).exp()).max(0.0);
        assert!(option.price().expect("pricing failed") >= bound - 0.02, "S={spot}");
    }
}

#[test]
fn grid_and_bumped_delta_gamma_agree() {
    let grid = CrankNicolsonSolver::default();
    let bumped = CrankNicolsonSolver::default().with_grid_greeks(false);
    for option_type in [OptionType::Call, OptionType::Put] {
        for &strike in &STRIKES {
            let m = market(100.0, 0.25, 0.05, 0.02);
            let a = engine(option_type, strike, 120, m, grid);
            let b = engine(option_type, strike, 120, m, bumped);
            assert_eq!(a.sensitivity_source(Sensitivity::Delta), SensitivitySource::Grid);
            assert_eq!(
                b.sensitivity_source(Sensitivity::Delta),
                SensitivitySource::BumpAndReprice
            );
            assert_eq!(
                a.sensitivity_source(Sensitivity::Vega),
                SensitivitySource::BumpAndReprice
            );

            let (da, db) = (a.delta().expect("delta"), b.delta().expect("delta"));
            let (ga, gb) = (a.gamma().expect("gamma"), b.gamma().expect("gamma"));
            assert!((da - db).abs() < 0.01, "{option_type} K={strike}: {da} vs {db}");
            assert!((ga - gb).abs() < 0.004, "{option_type} K={strike}: {ga} vs {gb}");
        }
    }
}

#[test]
fn delta_signs_and_ranges() {
    let m = market(100.0, 0.25, 0.05, 0.02);
    let call = engine(OptionType::Call, 100.0, 90, m, CrankNicolsonSolver::default());
    let put = engine(OptionType::Put, 100.0, 90, m, CrankNicolsonSolver::default());
    let dc = call.delta().expect("delta");
    let dp = put.delta().expect("delta");
    assert!(dc > 0.4 && dc < 0.7, "call delta {dc}");
    assert!(dp < -0.3 && dp > -0.6, "put delta {dp}");
    assert!(call.gamma().expect("gamma") > 0.0);
}

#[test]
fn vega_and_rho_are_per_percentage_point() {
    let m = market(100.0, 0.2, 0.05, 0.0);
    let option = engine(OptionType::Call, 100.0, 365, m, CrankNicolsonSolver::default());
    // Black-Scholes ATM one-year vega is about 0.375 per vol point, rho about 0.53.
    let vega = option.vega().expect("vega");
    let rho = option.rho().expect("rho");
    assert!((vega - 0.375).abs() < 0.02, "vega {vega}");
    assert!((rho - 0.53).abs() < 0.03, "rho {rho}");
    let theta = option.theta().expect("theta");
    assert!(theta < 0.0 && theta > -0.05, "theta per day {theta}");
}

#[test]
fn hot_swaps_match_fresh_engines() {
    let solver = CrankNicolsonSolver::new(120, 120);
    let mut option = engine(OptionType::Put, 100.0, 60, market(100.0, 0.2, 0.03, 0.0), solver);
    let _ = option.price().expect("pricing failed");

    option.update_spot(92.0).expect("valid spot");
    option.update_volatility(0.35).expect("valid vol");
    let fresh = engine(OptionType::Put, 100.0, 60, market(92.0, 0.35, 0.03, 0.0), solver);
    assert_eq!(
        option.price().expect("pricing failed"),
        fresh.price().expect("pricing failed")
    );
    assert_eq!(
        option.delta().expect("delta"),
        fresh.delta().expect("delta")
    );

    let later = today() + Days::new(20);
    option.update_valuation_date(later).expect("still live");
    assert!(option.time_to_maturity() < fresh.time_to_maturity());
    assert!(option.price().expect("pricing failed") < fresh.price().expect("pricing failed"));
}

#[test]
fn invalid_inputs_rejected_at_construction() {
    let m = market(100.0, 0.2, 0.03, 0.0);
    let maturity = today() + Days::new(30);
    assert!(matches!(
        OptionContract::new(OptionType::Call, -5.0, maturity),
        Err(PricingError::InvalidArgument(_))
    ));
    let contract = OptionContract::call(100.0, today()).expect("valid terms");
    assert!(matches!(
        AmericanOption::new(contract, m),
        Err(PricingError::InvalidArgument(_))
    ));
    assert!("straddle".parse::<OptionType>().is_err());
    assert!(
        MarketState::builder()
            .spot(-1.0)
            .volatility(0.2)
            .valuation_date(today())
            .build()
            .is_err()
    );
}
