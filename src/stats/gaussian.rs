//! Multivariate Gaussian sampling.

use super::distributions::standard_normal;
use super::estimator::MultivariateGaussianParameters;
use crate::error::{Result, TrustError};
use crate::primitives::{Matrix, Vector};
use rand::Rng;
use tracing::debug;

const MAX_JITTER_ATTEMPTS: usize = 10;

/// Sampler for `N(mean, covariance)`.
///
/// The covariance is factored once with Cholesky. A positive semi-definite but
/// singular covariance (e.g. a constant feature) gets an increasing diagonal
/// jitter until the factorization succeeds.
#[derive(Debug, Clone)]
pub struct MultivariateGaussian {
    mean: Vector<f64>,
    factor: Matrix<f64>,
}

impl MultivariateGaussian {
    /// Factors the covariance of `params`.
    ///
    /// # Errors
    ///
    /// Returns `NumericalDegeneracy` if the covariance contains non-finite
    /// values or cannot be factored even with jitter.
    pub fn new(params: &MultivariateGaussianParameters) -> Result<Self> {
        let cov = &params.covariance;
        if !cov.is_finite() || !params.mean.is_finite() {
            return Err(TrustError::NumericalDegeneracy(
                "Gaussian parameters contain NaN or infinite values".to_string(),
            ));
        }

        let d = params.dimension();
        let scale = (0..d).map(|i| cov.get(i, i).abs()).fold(0.0_f64, f64::max);
        let mut jitter = 0.0;
        let mut base = if scale > 0.0 { scale * 1e-10 } else { 1e-10 };

        for attempt in 0..=MAX_JITTER_ATTEMPTS {
            let candidate = if jitter > 0.0 {
                cov.add(&Matrix::eye(d).mul_scalar(jitter))?
            } else {
                cov.clone()
            };
            if let Ok(factor) = candidate.cholesky() {
                if attempt > 0 {
                    debug!(jitter, attempt, "Covariance factored with diagonal jitter");
                }
                return Ok(Self {
                    mean: params.mean.clone(),
                    factor,
                });
            }
            jitter = base;
            base *= 10.0;
        }

        Err(TrustError::NumericalDegeneracy(
            "covariance is not positive semi-definite".to_string(),
        ))
    }

    /// Dimensionality of generated samples.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }

    /// Draws one sample.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector<f64> {
        let d = self.dimension();
        let z: Vec<f64> = (0..d).map(|_| standard_normal(rng)).collect();
        let mut out = self.mean.clone();
        for i in 0..d {
            let mut acc = 0.0;
            for (k, zk) in z.iter().enumerate().take(i + 1) {
                acc += self.factor.get(i, k) * zk;
            }
            out[i] += acc;
        }
        out
    }

    /// Draws `n` samples.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Vector<f64>> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}
