//! Injectable standard-normal sources.
//!
//! Simulations draw every normal they need up front from a [`NormalSampler`],
//! so a seeded or replayed source fixes the result regardless of how the
//! evaluation is later split across threads.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

use crate::core::PricingError;

/// Source of i.i.d. standard normal variates.
pub trait NormalSampler {
    /// Fills `out` with the next `out.len()` variates.
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidArgument`] when the source cannot supply enough draws.
    fn fill(&mut self, out: &mut [f64]) -> Result<(), PricingError>;
}

impl<S: NormalSampler + ?Sized> NormalSampler for &mut S {
    fn fill(&mut self, out: &mut [f64]) -> Result<(), PricingError> {
        (**self).fill(out)
    }
}

/// Pseudo-random normals from a seedable [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededNormalSampler {
    rng: StdRng,
}

impl SeededNormalSampler {
    /// Reproducible stream for `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream seeded from the operating system.
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }
}

impl NormalSampler for SeededNormalSampler {
    fn fill(&mut self, out: &mut [f64]) -> Result<(), PricingError> {
        for z in out.iter_mut() {
            *z = StandardNormal.sample(&mut self.rng);
        }
        Ok(())
    }
}

/// Replays a fixed sequence of variates, for tests and audit reruns.
#[derive(Debug, Clone, Default)]
pub struct ReplayNormalSampler {
    normals: Vec<f64>,
    cursor: usize,
}

impl ReplayNormalSampler {
    pub fn new(normals: Vec<f64>) -> Self {
        Self { normals, cursor: 0 }
    }

    /// Variates not yet handed out.
    pub fn remaining(&self) -> usize {
        self.normals.len() - self.cursor
    }
}

impl NormalSampler for ReplayNormalSampler {
    fn fill(&mut self, out: &mut [f64]) -> Result<(), PricingError> {
        if out.len() > self.remaining() {
            return Err(PricingError::InvalidArgument(format!(
                "replay sampler has {} variates left, {} requested",
                self.remaining(),
                out.len()
            )));
        }
        let end = self.cursor + out.len();
        out.copy_from_slice(&self.normals[self.cursor..end]);
        self.cursor = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = SeededNormalSampler::new(42);
        let mut b = SeededNormalSampler::new(42);
        let mut xa = [0.0; 16];
        let mut xb = [0.0; 16];
        a.fill(&mut xa).unwrap();
        b.fill(&mut xb).unwrap();
        assert_eq!(xa, xb);
        assert!(xa.iter().any(|z| *z != 0.0));
    }

    #[test]
    fn replay_hands_out_in_order_then_errors() {
        let mut s = ReplayNormalSampler::new(vec![0.5, -1.0, 2.0]);
        let mut out = [0.0; 2];
        s.fill(&mut out).unwrap();
        assert_eq!(out, [0.5, -1.0]);
        assert_eq!(s.remaining(), 1);
        assert!(s.fill(&mut out).is_err());
        assert_eq!(s.remaining(), 1);
    }

    #[test]
    fn seeded_moments_are_standard() {
        let mut s = SeededNormalSampler::new(7);
        let mut z = vec![0.0; 50_000];
        s.fill(&mut z).unwrap();
        let n = z.len() as f64;
        let mean = z.iter().sum::<f64>() / n;
        let var = z.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(mean.abs() < 0.02, "mean={mean}");
        assert!((var - 1.0).abs() < 0.03, "var={var}");
    }
}
