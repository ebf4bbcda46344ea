use serde::{Deserialize, Serialize};
use tracing::debug;

use super::fd_common::{
    boundary_values, build_log_spot_grid, fill_theta_scheme_bands, solve_tridiagonal_inplace,
    stencil_weights,
};
use crate::core::{ExerciseStyle, OptionType, PricingError};
use crate::greeks::SensitivityCapabilities;
use crate::math::{FdWorkspace, GridArena};

/// Inputs of one grid solve, all in year-fraction and per-share units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FdProblem {
    pub option_type: OptionType,
    pub exercise: ExerciseStyle,
    pub strike: f64,
    /// Time to expiry in years.
    pub expiry: f64,
    pub spot: f64,
    pub volatility: f64,
    pub rate: f64,
    pub dividend_yield: f64,
}

/// Price and spot-stencil sensitivities read off a solved grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSolution {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    /// Lower spot boundary used by the solve.
    pub s_min: f64,
    /// Upper spot boundary used by the solve.
    pub s_max: f64,
    /// Index of the spot node, which is also the number of nodes below spot.
    pub spot_node: usize,
    /// Log-spot spacing.
    pub dx: f64,
}

/// Crank-Nicolson finite-difference solver for the Black-Scholes-Merton PDE
/// with an early-exercise projection at every time step.
///
/// Spot nodes are uniform in `ln S` and centered on the current spot, so the
/// spot sits exactly on the middle node and half the grid always lies below it.
/// Delta and gamma come from the three-point stencil at that node without
/// interpolation. The first `rannacher_steps` steps away from expiry are fully
/// implicit to damp the payoff-kink oscillations Crank-Nicolson is prone to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrankNicolsonSolver {
    /// Number of time steps.
    pub time_steps: usize,
    /// Number of space steps.
    pub space_steps: usize,
    /// Minimum `S_max / max(K, S)`, and likewise `min(K, S) / S_min`.
    pub s_max_floor: f64,
    /// Lognormal standard deviations covered beyond `max(K, S)` and below `min(K, S)`.
    pub s_max_std_devs: f64,
    /// Leading fully implicit steps.
    pub rannacher_steps: usize,
    /// Expose delta/gamma from the stencil; when false every Greek is bumped.
    pub grid_greeks: bool,
}

impl Default for CrankNicolsonSolver {
    fn default() -> Self {
        Self {
            time_steps: 200,
            space_steps: 200,
            s_max_floor: 2.0,
            s_max_std_devs: 5.0,
            rannacher_steps: 2,
            grid_greeks: true,
        }
    }
}

impl CrankNicolsonSolver {
    /// Creates a solver with explicit grid sizes.
    pub fn new(time_steps: usize, space_steps: usize) -> Self {
        Self {
            time_steps,
            space_steps,
            ..Self::default()
        }
    }

    pub fn with_s_max_floor(mut self, s_max_floor: f64) -> Self {
        self.s_max_floor = s_max_floor;
        self
    }

    pub fn with_s_max_std_devs(mut self, s_max_std_devs: f64) -> Self {
        self.s_max_std_devs = s_max_std_devs;
        self
    }

    pub fn with_rannacher_steps(mut self, rannacher_steps: usize) -> Self {
        self.rannacher_steps = rannacher_steps;
        self
    }

    pub fn with_grid_greeks(mut self, grid_greeks: bool) -> Self {
        self.grid_greeks = grid_greeks;
        self
    }

    /// Sensitivities this solver reports without repricing.
    pub fn capabilities(&self) -> SensitivityCapabilities {
        if self.grid_greeks {
            SensitivityCapabilities::spot_stencil()
        } else {
            SensitivityCapabilities::bump_only()
        }
    }

    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for unusable grid settings.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.time_steps == 0 || self.space_steps < 4 {
            return Err(PricingError::InvalidArgument(
                "time_steps must be > 0 and space_steps must be >= 4".to_string(),
            ));
        }
        if !self.s_max_floor.is_finite() || self.s_max_floor <= 1.0 {
            return Err(PricingError::InvalidArgument(
                "s_max_floor must be finite and > 1".to_string(),
            ));
        }
        if !self.s_max_std_devs.is_finite() || self.s_max_std_devs < 0.0 {
            return Err(PricingError::InvalidArgument(
                "s_max_std_devs must be finite and >= 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Solves the grid for `problem`, reusing `arena` for every buffer.
    ///
    /// # Errors
    /// - [`PricingError::InvalidArgument`] for invalid inputs or solver settings.
    /// - [`PricingError::NumericalFailure`] when a time step cannot be solved.
    pub fn solve(
        &self,
        problem: &FdProblem,
        arena: &mut GridArena,
    ) -> Result<GridSolution, PricingError> {
        self.validate()?;
        if !problem.strike.is_finite() || problem.strike <= 0.0 {
            return Err(PricingError::InvalidArgument(
                "strike must be finite and > 0".to_string(),
            ));
        }
        if !problem.spot.is_finite() || problem.spot <= 0.0 {
            return Err(PricingError::InvalidArgument(
                "spot must be finite and > 0".to_string(),
            ));
        }
        if !problem.expiry.is_finite() || problem.expiry <= 0.0 {
            return Err(PricingError::InvalidArgument(
                "time to expiry must be finite and > 0".to_string(),
            ));
        }
        if !problem.volatility.is_finite() || problem.volatility < 0.0 {
            return Err(PricingError::InvalidArgument(
                "volatility must be finite and >= 0".to_string(),
            ));
        }

        let n_t = self.time_steps;
        let n_s = self.space_steps;
        let dt = problem.expiry / n_t as f64;
        let is_american = matches!(problem.exercise, ExerciseStyle::American);

        // Log half-width covers the strike plus the diffusion reach on either side.
        let reach = (self.s_max_std_devs * problem.volatility * problem.expiry.sqrt())
            .max(self.s_max_floor.ln());
        let half_width = reach + (problem.strike / problem.spot).ln().abs();
        let spot_idx = n_s / 2;
        let dx = half_width / spot_idx as f64;

        let FdWorkspace {
            grid,
            values,
            next_values,
            lhs_lower,
            lhs_diag,
            lhs_upper,
            rhs_lower,
            rhs_diag,
            rhs_upper,
            rhs,
            c_star,
            d_star,
        } = arena.workspace(n_s);
        let interior_n = n_s - 1;
        let (mut values, mut next_values) = (values, next_values);

        build_log_spot_grid(grid, problem.spot, spot_idx, dx);
        let (s_min, s_max) = (grid[0], grid[n_s]);
        if !(s_min > 0.0 && s_max.is_finite()) {
            return Err(PricingError::NumericalFailure(
                "spot grid bounds are not finite".to_string(),
            ));
        }

        for (v, &s) in values.iter_mut().zip(grid.iter()) {
            *v = problem.option_type.intrinsic(s, problem.strike);
        }

        let mut bands_theta = f64::NAN;
        for n in (0..n_t).rev() {
            let step_from_expiry = n_t - 1 - n;
            let theta = if step_from_expiry < self.rannacher_steps { 1.0 } else { 0.5 };
            if theta != bands_theta {
                fill_theta_scheme_bands(
                    theta,
                    dt,
                    grid,
                    problem.volatility,
                    problem.rate,
                    problem.dividend_yield,
                    (&mut *lhs_lower, &mut *lhs_diag, &mut *lhs_upper),
                    (&mut *rhs_lower, &mut *rhs_diag, &mut *rhs_upper),
                );
                bands_theta = theta;
            }

            let tau_new = problem.expiry - n as f64 * dt;
            let (lower_new, upper_new) = boundary_values(
                problem.option_type,
                is_american,
                problem.strike,
                problem.rate,
                problem.dividend_yield,
                s_min,
                s_max,
                tau_new,
            );

            for k in 0..interior_n {
                let i = k + 1;
                rhs[k] = rhs_diag[k].mul_add(
                    values[i],
                    rhs_lower[k].mul_add(values[i - 1], rhs_upper[k] * values[i + 1]),
                );
            }
            rhs[0] -= lhs_lower[0] * lower_new;
            rhs[interior_n - 1] -= lhs_upper[interior_n - 1] * upper_new;

            next_values[0] = lower_new;
            next_values[n_s] = upper_new;
            solve_tridiagonal_inplace(
                lhs_lower,
                lhs_diag,
                lhs_upper,
                rhs,
                c_star,
                d_star,
                &mut next_values[1..n_s],
            )?;

            if is_american {
                for (v, &s) in next_values.iter_mut().zip(grid.iter()) {
                    *v = v.max(problem.option_type.intrinsic(s, problem.strike));
                }
            }

            std::mem::swap(&mut values, &mut next_values);
        }

        let (v_dn, v_0, v_up) = (values[spot_idx - 1], values[spot_idx], values[spot_idx + 1]);
        if !(v_dn.is_finite() && v_0.is_finite() && v_up.is_finite()) {
            return Err(PricingError::NumericalFailure(
                "grid solve produced non-finite values".to_string(),
            ));
        }

        let mut price = v_0;
        if is_american {
            price = price.max(problem.option_type.intrinsic(problem.spot, problem.strike));
        }
        let (d1, d2) = stencil_weights(grid, spot_idx);
        let delta = d1[0] * v_dn + d1[1] * v_0 + d1[2] * v_up;
        let gamma = d2[0] * v_dn + d2[1] * v_0 + d2[2] * v_up;

        debug!(
            time_steps = n_t,
            space_steps = n_s,
            s_min,
            s_max,
            spot_node = spot_idx,
            price,
            "crank-nicolson grid solved"
        );

        Ok(GridSolution {
            price,
            delta,
            gamma,
            s_min,
            s_max,
            spot_node: spot_idx,
            dx,
        })
    }
}
