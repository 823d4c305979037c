//! Online (single-pass) multivariate estimators.
//!
//! [`WelfordEstimator`] tracks the running mean and covariance of a stream of
//! observations without keeping any history.

use crate::error::{Result, TrustError};
use crate::primitives::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Variance placed on the diagonal before enough observations exist.
pub const DEFAULT_VARIANCE: f64 = 100.0;

/// Parameters of a multivariate Gaussian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultivariateGaussianParameters {
    /// Mean vector.
    pub mean: Vector<f64>,
    /// Covariance matrix (symmetric, positive semi-definite).
    pub covariance: Matrix<f64>,
}

impl MultivariateGaussianParameters {
    /// Creates parameters after checking that shapes agree.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the covariance is not `d x d`.
    pub fn new(mean: Vector<f64>, covariance: Matrix<f64>) -> Result<Self> {
        let d = mean.len();
        if covariance.shape() != (d, d) {
            return Err(TrustError::DimensionMismatch {
                expected: format!("{d}x{d} covariance"),
                actual: format!("{}x{}", covariance.n_rows(), covariance.n_cols()),
            });
        }
        Ok(Self { mean, covariance })
    }

    /// Dimensionality of the distribution.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.mean.len()
    }
}

/// An estimator updated one observation at a time.
pub trait OnlineEstimator {
    /// Estimated parameter type.
    type Parameters;

    /// Consumes one observation.
    ///
    /// # Errors
    ///
    /// Returns an error if the observation has the wrong dimension or is not finite.
    fn update(&mut self, observation: &Vector<f64>) -> Result<()>;

    /// Returns the current estimate. Always well defined.
    fn parameters(&self) -> Self::Parameters;

    /// Number of observations consumed so far.
    fn n_samples_seen(&self) -> usize;
}

/// Serializable snapshot of a [`WelfordEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelfordState {
    /// Running mean.
    pub mean: Vec<f64>,
    /// Running (biased) covariance, row-major `d x d`.
    pub covariance: Vec<f64>,
    /// Observations consumed.
    pub count: usize,
}

/// Welford's online mean/covariance estimator.
///
/// Update rule for the `n+1`-th observation `x` (with `delta = x - mean`):
///
/// ```text
/// mean <- mean + delta / (n + 1)
/// cov  <- cov * n / (n + 1) + n / (n + 1)^2 * delta * delta'
/// ```
///
/// [`OnlineEstimator::parameters`] reports the unbiased covariance
/// `cov * n / (n - 1)`. With fewer than two observations the covariance is
/// `DEFAULT_VARIANCE * I` so downstream samplers never see a singular matrix.
///
/// # Examples
///
/// ```
/// use trustkit::primitives::Vector;
/// use trustkit::stats::{OnlineEstimator, WelfordEstimator};
///
/// let mut est = WelfordEstimator::new(2).expect("positive dimension");
/// est.update(&Vector::from_slice(&[1.0, 2.0])).expect("matching dimension");
/// est.update(&Vector::from_slice(&[3.0, 4.0])).expect("matching dimension");
///
/// let params = est.parameters();
/// assert!((params.mean[0] - 2.0).abs() < 1e-12);
/// assert!((params.covariance.get(0, 0) - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct WelfordEstimator {
    dimension: usize,
    count: usize,
    mean: Vector<f64>,
    covariance: Matrix<f64>,
}

impl WelfordEstimator {
    /// Creates an estimator for observations of the given dimension.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` if `dimension == 0`.
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(TrustError::invalid_param("dimension", dimension, ">0"));
        }
        Ok(Self {
            dimension,
            count: 0,
            mean: Vector::zeros(dimension),
            covariance: Matrix::zeros(dimension, dimension),
        })
    }

    /// Dimensionality of accepted observations.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Snapshot of the internal state.
    #[must_use]
    pub fn state(&self) -> WelfordState {
        WelfordState {
            mean: self.mean.as_slice().to_vec(),
            covariance: self.covariance.as_slice().to_vec(),
            count: self.count,
        }
    }

    /// Restores an estimator from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot is empty or its shapes disagree.
    pub fn from_state(state: WelfordState) -> Result<Self> {
        let d = state.mean.len();
        if d == 0 {
            return Err(TrustError::invalid_param("dimension", 0, ">0"));
        }
        if state.covariance.len() != d * d {
            return Err(TrustError::dimension_mismatch(
                "covariance entries",
                d * d,
                state.covariance.len(),
            ));
        }
        let covariance = Matrix::from_vec(d, d, state.covariance)?;
        Ok(Self {
            dimension: d,
            count: state.count,
            mean: Vector::from_vec(state.mean),
            covariance,
        })
    }
}

impl OnlineEstimator for WelfordEstimator {
    type Parameters = MultivariateGaussianParameters;

    fn update(&mut self, observation: &Vector<f64>) -> Result<()> {
        if observation.len() != self.dimension {
            return Err(TrustError::dimension_mismatch(
                "dimension",
                self.dimension,
                observation.len(),
            ));
        }
        if !observation.is_finite() {
            return Err(TrustError::NumericalDegeneracy(
                "observation contains NaN or infinite values".to_string(),
            ));
        }

        let n = self.count as f64;
        let delta = observation - &self.mean;
        self.mean = &self.mean + &delta.mul_scalar(1.0 / (n + 1.0));

        if self.count > 0 {
            let scaled = self.covariance.mul_scalar(n / (n + 1.0));
            let spread = Matrix::outer(&delta, &delta).mul_scalar(n / ((n + 1.0) * (n + 1.0)));
            self.covariance = scaled.add(&spread)?;
            // Round-off must not break symmetry or push variances negative
            self.covariance.symmetrize();
            for i in 0..self.dimension {
                if self.covariance.get(i, i) < 0.0 {
                    self.covariance.set(i, i, 0.0);
                }
            }
        }

        self.count += 1;
        Ok(())
    }

    fn parameters(&self) -> MultivariateGaussianParameters {
        let covariance = if self.count < 2 {
            Matrix::eye(self.dimension).mul_scalar(DEFAULT_VARIANCE)
        } else {
            let n = self.count as f64;
            self.covariance.mul_scalar(n / (n - 1.0))
        };
        MultivariateGaussianParameters {
            mean: self.mean.clone(),
            covariance,
        }
    }

    fn n_samples_seen(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
#[path = "estimator_tests.rs"]
mod tests;
