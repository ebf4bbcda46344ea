//! Closed-form Black-Scholes-Merton European prices.
//!
//! Used as the no-early-exercise reference: an American option is never worth
//! less than its European twin.

use crate::core::OptionType;
use crate::math::normal_cdf;

/// European option price under Black-Scholes-Merton with continuous dividend yield.
///
/// Degenerate inputs (`t <= 0` or `sigma <= 0`) return the discounted forward payoff.
///
/// # Examples
/// ```rust
/// use hedgeferric::core::OptionType;
/// use hedgeferric::engines::analytic::black_scholes_merton_price;
///
/// let px = black_scholes_merton_price(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 0.20, 1.0);
/// assert!(px > 10.0 && px < 11.0);
/// ```
pub fn black_scholes_merton_price(
    option_type: OptionType,
    s: f64,
    k: f64,
    r: f64,
    q: f64,
    sigma: f64,
    t: f64,
) -> f64 {
    let df_r = (-r * t.max(0.0)).exp();
    let df_q = (-q * t.max(0.0)).exp();
    if t <= 0.0 || sigma <= 0.0 {
        let forward_payoff = option_type.intrinsic(s * df_q / df_r, k);
        return df_r * forward_payoff;
    }

    let vt = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / vt;
    let d2 = d1 - vt;

    match option_type {
        OptionType::Call => s * df_q * normal_cdf(d1) - k * df_r * normal_cdf(d2),
        OptionType::Put => k * df_r * normal_cdf(-d2) - s * df_q * normal_cdf(-d1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_call_parity_holds() {
        let (s, k, r, q, v, t) = (100.0, 95.0, 0.03, 0.01, 0.22, 0.8);
        let c = black_scholes_merton_price(OptionType::Call, s, k, r, q, v, t);
        let p = black_scholes_merton_price(OptionType::Put, s, k, r, q, v, t);
        let parity = s * (-q * t).exp() - k * (-r * t).exp();
        assert!((c - p - parity).abs() < 1.0e-5);
    }

    #[test]
    fn atm_call_reference_value() {
        let c = black_scholes_merton_price(OptionType::Call, 100.0, 100.0, 0.05, 0.0, 0.20, 1.0);
        assert!((c - 10.4506).abs() < 1.0e-3);
    }
}
