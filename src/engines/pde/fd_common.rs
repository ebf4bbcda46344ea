use crate::core::{OptionType, PricingError};

/// Dirichlet values at `S = s_min` and `S = s_max` for time-to-expiry `tau`.
///
/// American boundaries never fall below the European ones.
#[allow(clippy::too_many_arguments)]
pub(super) fn boundary_values(
    option_type: OptionType,
    is_american: bool,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
    s_min: f64,
    s_max: f64,
    tau: f64,
) -> (f64, f64) {
    let forward_intrinsic = |s: f64| match option_type {
        OptionType::Call => s * (-dividend_yield * tau).exp() - strike * (-rate * tau).exp(),
        OptionType::Put => strike * (-rate * tau).exp() - s * (-dividend_yield * tau).exp(),
    };
    let edge = |s: f64| {
        let european = forward_intrinsic(s).max(0.0);
        if is_american {
            european.max(option_type.intrinsic(s, strike))
        } else {
            european
        }
    };
    match option_type {
        OptionType::Call => (0.0, edge(s_max)),
        OptionType::Put => (edge(s_min), 0.0),
    }
}

/// Fills `grid` with `S_i = spot * exp((i - spot_node) * dx)`.
///
/// The spot lands exactly on `grid[spot_node]`.
pub(super) fn build_log_spot_grid(grid: &mut [f64], spot: f64, spot_node: usize, dx: f64) {
    for (i, s) in grid.iter_mut().enumerate() {
        *s = spot * ((i as f64 - spot_node as f64) * dx).exp();
    }
    grid[spot_node] = spot;
}

/// Three-point first and second derivative weights at interior node `i`
/// of a non-uniform grid, as `([d1_m, d1_0, d1_p], [d2_m, d2_0, d2_p])`.
#[inline]
pub(super) fn stencil_weights(grid: &[f64], i: usize) -> ([f64; 3], [f64; 3]) {
    let h_m = grid[i] - grid[i - 1];
    let h_p = grid[i + 1] - grid[i];
    (
        [
            -h_p / (h_m * (h_m + h_p)),
            (h_p - h_m) / (h_m * h_p),
            h_m / (h_p * (h_m + h_p)),
        ],
        [
            2.0 / (h_m * (h_m + h_p)),
            -2.0 / (h_m * h_p),
            2.0 / (h_p * (h_m + h_p)),
        ],
    )
}

/// Fills theta-scheme bands for `(I - theta dt L) V_new = (I + (1 - theta) dt L) V_old`
/// where interior row `k` is node `k + 1` of `grid`.
#[allow(clippy::too_many_arguments)]
pub(super) fn fill_theta_scheme_bands(
    theta: f64,
    dt: f64,
    grid: &[f64],
    vol: f64,
    rate: f64,
    dividend_yield: f64,
    lhs: (&mut [f64], &mut [f64], &mut [f64]),
    rhs: (&mut [f64], &mut [f64], &mut [f64]),
) {
    let (lhs_lower, lhs_diag, lhs_upper) = lhs;
    let (rhs_lower, rhs_diag, rhs_upper) = rhs;
    let half_vol2 = 0.5 * vol * vol;
    let drift = rate - dividend_yield;
    let implicit_dt = theta * dt;
    let explicit_dt = (1.0 - theta) * dt;

    for k in 0..lhs_diag.len() {
        let i = k + 1;
        let s = grid[i];
        let (d1, d2) = stencil_weights(grid, i);
        let diffusion = half_vol2 * s * s;
        let convection = drift * s;

        let a = diffusion * d2[0] + convection * d1[0];
        let b = diffusion * d2[1] + convection * d1[1] - rate;
        let c = diffusion * d2[2] + convection * d1[2];

        lhs_lower[k] = -implicit_dt * a;
        lhs_diag[k] = 1.0 - implicit_dt * b;
        lhs_upper[k] = -implicit_dt * c;

        rhs_lower[k] = explicit_dt * a;
        rhs_diag[k] = 1.0 + explicit_dt * b;
        rhs_upper[k] = explicit_dt * c;
    }
}

/// In-place Thomas solve using caller-owned scratch buffers.
///
/// `lower[0]` and `upper[n - 1]` are ignored.
#[inline(always)]
pub(super) fn solve_tridiagonal_inplace(
    lower: &[f64],
    diag: &[f64],
    upper: &[f64],
    rhs: &[f64],
    c_star: &mut [f64],
    d_star: &mut [f64],
    x: &mut [f64],
) -> Result<(), PricingError> {
    let n = diag.len();
    if n == 0 {
        return Ok(());
    }

    let inv_denom0 = 1.0 / diag[0];
    if !inv_denom0.is_finite() {
        return Err(PricingError::NumericalFailure(
            "tridiagonal solver singular matrix".to_string(),
        ));
    }
    c_star[0] = if n > 1 { upper[0] * inv_denom0 } else { 0.0 };
    d_star[0] = rhs[0] * inv_denom0;

    for i in 1..n {
        let denom = (-lower[i]).mul_add(c_star[i - 1], diag[i]);
        if denom.abs() <= 1.0e-14 {
            return Err(PricingError::NumericalFailure(
                "tridiagonal solver singular matrix".to_string(),
            ));
        }
        let inv_denom = 1.0 / denom;
        c_star[i] = if i < n - 1 { upper[i] * inv_denom } else { 0.0 };
        d_star[i] = (-lower[i]).mul_add(d_star[i - 1], rhs[i]) * inv_denom;
    }

    x[n - 1] = d_star[n - 1];
    for i in (0..(n - 1)).rev() {
        x[i] = (-c_star[i]).mul_add(x[i + 1], d_star[i]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thomas_solver_matches_known_system() {
        // [2 1 0; 1 2 1; 0 1 2] x = [4 8 8] -> x = [1 2 3]
        let lower = [0.0, 1.0, 1.0];
        let diag = [2.0, 2.0, 2.0];
        let upper = [1.0, 1.0, 0.0];
        let rhs = [4.0, 8.0, 8.0];
        let mut c = [0.0; 3];
        let mut d = [0.0; 3];
        let mut x = [0.0; 3];

        solve_tridiagonal_inplace(&lower, &diag, &upper, &rhs, &mut c, &mut d, &mut x).unwrap();
        for (got, want) in x.iter().zip([1.0, 2.0, 3.0]) {
            assert!((got - want).abs() < 1.0e-12);
        }
    }

    #[test]
    fn singular_system_is_a_numerical_failure() {
        let zeros = [0.0; 2];
        let mut c = [0.0; 2];
        let mut d = [0.0; 2];
        let mut x = [0.0; 2];
        let err = solve_tridiagonal_inplace(&zeros, &zeros, &zeros, &zeros, &mut c, &mut d, &mut x);
        assert!(matches!(err, Err(PricingError::NumericalFailure(_))));
    }

    #[test]
    fn american_boundaries_dominate_european_ones() {
        let (lo, hi) = boundary_values(OptionType::Put, true, 100.0, 0.05, 0.0, 1.0, 400.0, 1.0);
        assert_eq!((lo, hi), (99.0, 0.0));
        let (lo, hi) = boundary_values(OptionType::Call, true, 100.0, 0.05, 0.0, 1.0, 400.0, 1.0);
        assert_eq!(lo, 0.0);
        // No dividends: the discounted strike beats immediate exercise.
        assert!((hi - (400.0 - 100.0 * (-0.05_f64).exp())).abs() < 1.0e-12);
        let (lo, _) = boundary_values(OptionType::Put, false, 100.0, 0.05, 0.0, 1.0, 400.0, 1.0);
        assert!((lo - (100.0 * (-0.05_f64).exp() - 1.0)).abs() < 1.0e-12);
    }

    #[test]
    fn log_grid_puts_spot_on_node_with_constant_log_spacing() {
        let mut grid = [0.0; 9];
        build_log_spot_grid(&mut grid, 97.3, 4, 0.1);
        assert_eq!(grid[4], 97.3);
        for w in grid.windows(2) {
            assert!(((w[1] / w[0]).ln() - 0.1).abs() < 1.0e-12);
        }
    }

    #[test]
    fn stencil_weights_are_exact_for_quadratics() {
        let grid = [1.0, 1.5, 2.5];
        let (d1, d2) = stencil_weights(&grid, 1);
        let f = |x: f64| 3.0 * x * x - x + 2.0;
        let values = grid.map(f);
        let first: f64 = d1.iter().zip(values).map(|(w, v)| w * v).sum();
        let second: f64 = d2.iter().zip(values).map(|(w, v)| w * v).sum();
        assert!((first - (6.0 * 1.5 - 1.0)).abs() < 1.0e-12);
        assert!((second - 6.0).abs() < 1.0e-12);
    }
}
