//! Monte Carlo terminal-price simulation under risk-neutral GBM.
//!
//! Normals are drawn sequentially from an injected [`NormalSampler`]; the
//! payoff evaluation is then split into fixed-size chunks (in parallel under
//! the `parallel` feature) whose partial statistics are merged in chunk order,
//! so a fixed seed gives bit-identical output with or without threads.

pub mod sampler;

pub use sampler::{NormalSampler, ReplayNormalSampler, SeededNormalSampler};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::PricingError;

/// Paths per evaluation chunk.
pub const CHUNK_SIZE: usize = 4_096;

/// One-step risk-neutral GBM to a fixed horizon.
///
/// `S_T = S_0 exp((r - q - sigma^2/2) T + sigma sqrt(T) Z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbmTerminal {
    pub spot: f64,
    pub rate: f64,
    pub dividend_yield: f64,
    pub volatility: f64,
    /// Horizon in years.
    pub horizon: f64,
}

impl GbmTerminal {
    /// Terminal spot for one standard normal draw.
    #[inline]
    pub fn terminal_spot(&self, z: f64) -> f64 {
        let drift =
            (self.rate - self.dividend_yield - 0.5 * self.volatility * self.volatility) * self.horizon;
        let diffusion = self.volatility * self.horizon.max(0.0).sqrt();
        self.spot * (drift + diffusion * z).exp()
    }

    /// Draws `simulations` terminal spots.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] for zero simulations or an exhausted sampler.
    pub fn simulate<S: NormalSampler + ?Sized>(
        &self,
        simulations: usize,
        sampler: &mut S,
    ) -> Result<Vec<f64>, PricingError> {
        if simulations == 0 {
            return Err(PricingError::InvalidArgument(
                "number of simulations must be > 0".to_string(),
            ));
        }
        let mut normals = vec![0.0_f64; simulations];
        sampler.fill(&mut normals)?;
        Ok(normals.into_iter().map(|z| self.terminal_spot(z)).collect())
    }
}

/// Running count, mean and M2 of a sample plus the number of strictly positive values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Moments {
    count: usize,
    positive: usize,
    mean: f64,
    m2: f64,
}

impl Moments {
    fn push(&mut self, x: f64) {
        self.count += 1;
        if x > 0.0 {
            self.positive += 1;
        }
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn merge(self, other: Self) -> Self {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        let count = self.count + other.count;
        let n = count as f64;
        let delta = other.mean - self.mean;
        Self {
            count,
            positive: self.positive + other.positive,
            mean: self.mean + delta * other.count as f64 / n,
            m2: self.m2 + other.m2 + delta * delta * (self.count as f64 * other.count as f64) / n,
        }
    }
}

/// Summary of a simulated P&L sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub simulations: usize,
    /// Fraction of paths with strictly positive value.
    pub positive_fraction: f64,
    pub mean: f64,
    /// Standard error of `positive_fraction`.
    pub positive_fraction_std_error: f64,
    /// Standard error of `mean`.
    pub mean_std_error: f64,
}

/// Evaluates `value` on each terminal spot and summarizes the results.
///
/// # Errors
/// Returns [`PricingError::InvalidArgument`] for an empty sample and
/// [`PricingError::NumericalFailure`] when any value is not finite.
pub fn summarize<F>(terminals: &[f64], value: F) -> Result<SampleSummary, PricingError>
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    if terminals.is_empty() {
        return Err(PricingError::InvalidArgument(
            "cannot summarize an empty sample".to_string(),
        ));
    }

    let chunk_moments = |chunk: &[f64]| {
        let mut m = Moments::default();
        for &s in chunk {
            m.push(value(s));
        }
        m
    };

    #[cfg(feature = "parallel")]
    let partials: Vec<Moments> = terminals
        .par_chunks(CHUNK_SIZE)
        .map(chunk_moments)
        .collect();
    #[cfg(not(feature = "parallel"))]
    let partials: Vec<Moments> = terminals.chunks(CHUNK_SIZE).map(chunk_moments).collect();

    let total = partials
        .into_iter()
        .fold(Moments::default(), Moments::merge);
    if !total.mean.is_finite() || !total.m2.is_finite() {
        return Err(PricingError::NumericalFailure(
            "non-finite value in simulated sample".to_string(),
        ));
    }

    let n = total.count as f64;
    let p = total.positive as f64 / n;
    let variance = if total.count > 1 {
        total.m2 / (n - 1.0)
    } else {
        0.0
    };

    Ok(SampleSummary {
        simulations: total.count,
        positive_fraction: p,
        mean: total.mean,
        positive_fraction_std_error: (p * (1.0 - p) / n).sqrt(),
        mean_std_error: (variance / n).sqrt(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn gbm(horizon: f64) -> GbmTerminal {
        GbmTerminal {
            spot: 100.0,
            rate: 0.05,
            dividend_yield: 0.02,
            volatility: 0.25,
            horizon,
        }
    }

    #[test]
    fn zero_normal_gives_drifted_spot() {
        let g = gbm(1.0);
        let expected = 100.0 * (0.05 - 0.02 - 0.5 * 0.0625_f64).exp();
        assert_relative_eq!(g.terminal_spot(0.0), expected, epsilon = 1.0e-12);
    }

    #[test]
    fn risk_neutral_mean_matches_forward() {
        let g = gbm(0.5);
        let mut sampler = SeededNormalSampler::new(11);
        let spots = g.simulate(200_000, &mut sampler).unwrap();
        let summary = summarize(&spots, |s| s).unwrap();
        let forward = 100.0 * ((0.05 - 0.02) * 0.5_f64).exp();
        assert!(
            (summary.mean - forward).abs() < 3.0 * summary.mean_std_error,
            "mean={} forward={forward}",
            summary.mean
        );
    }

    #[test]
    fn chunked_merge_matches_direct_moments() {
        let xs: Vec<f64> = (0..10_000).map(|i| ((i * 37) % 101) as f64 - 50.0).collect();
        let summary = summarize(&xs, |x| x).unwrap();
        let n = xs.len() as f64;
        let mean = xs.iter().sum::<f64>() / n;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert_relative_eq!(summary.mean, mean, epsilon = 1.0e-9);
        assert_relative_eq!(summary.mean_std_error, (var / n).sqrt(), epsilon = 1.0e-9);
        let positive = xs.iter().filter(|x| **x > 0.0).count() as f64 / n;
        assert_relative_eq!(summary.positive_fraction, positive, epsilon = 1.0e-15);
    }

    #[test]
    fn zero_simulations_rejected() {
        let mut sampler = SeededNormalSampler::new(1);
        assert!(matches!(
            gbm(0.1).simulate(0, &mut sampler),
            Err(PricingError::InvalidArgument(_))
        ));
        assert!(summarize(&[], |x| x).is_err());
    }

    #[test]
    fn replayed_normals_reproduce_paths() {
        let g = gbm(0.25);
        let mut replay = ReplayNormalSampler::new(vec![0.0, 1.0, -1.0]);
        let spots = g.simulate(3, &mut replay).unwrap();
        assert_relative_eq!(spots[0], g.terminal_spot(0.0));
        assert!(spots[1] > spots[0] && spots[2] < spots[0]);
    }
}
