//! Statistical building blocks.
//!
//! - [`WelfordEstimator`]: single-pass mean/covariance estimation
//! - [`MultivariateGaussian`]: sampling from fitted parameters
//! - distribution functions (normal, Student-t, Kolmogorov) used by the drift tests

pub mod distributions;
mod estimator;
mod gaussian;

pub use distributions::{
    ks_two_sample_pvalue, normal_cdf, standard_normal, student_t_cdf, t_two_tailed_pvalue,
};
pub use estimator::{
    MultivariateGaussianParameters, OnlineEstimator, WelfordEstimator, WelfordState,
    DEFAULT_VARIANCE,
};
pub use gaussian::MultivariateGaussian;

/// Arithmetic mean; 0.0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator); 0.0 with fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation.
#[must_use]
pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&v) - 5.0).abs() < 1e-12);
        // Sample variance = 32 / 7
        assert!((sample_variance(&v) - 32.0 / 7.0).abs() < 1e-12);
        assert!((sample_std(&v) - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(sample_variance(&[3.0]), 0.0);
    }
}
