//! Drift detection with a random-Fourier-feature approximation of the
//! Gaussian-kernel maximum mean discrepancy.
//!
//! Fitting draws `n_mode` random frequencies and phases from a seeded RNG and
//! summarizes the reference data as the mean of its Fourier features. It then
//! measures the discrepancy between that summary and many contiguous windows
//! of the reference to learn the null distribution of the statistic. Scoring
//! regenerates the same frequencies from the stored seed, so only the seed is
//! persisted.

use crate::data::Dataframe;
use crate::error::{Result, TrustError};
use crate::primitives::Matrix;
use crate::stats::{self, normal_cdf, standard_normal};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Null discrepancy spreads at or below this are treated as zero.
const MIN_MMD_SPREAD: f64 = 1e-12;

/// Fitting parameters for [`FourierMmd`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourierMmdConfig {
    /// Score first differences `x[t+1] - x[t]` instead of raw rows.
    pub delta_stat: bool,
    /// Number of reference windows used to learn the null distribution.
    pub n_test: usize,
    /// Rows per reference window.
    pub n_window: usize,
    /// Kernel bandwidth as a multiple of each column's standard deviation.
    pub sig: f64,
    /// Seed for frequencies, phases, row sampling and window offsets.
    pub random_seed: u64,
    /// Number of Fourier features.
    pub n_mode: usize,
    /// Lower bound on a column's standard deviation.
    pub epsilon: f64,
    /// Drift is flagged when the drift probability exceeds this.
    pub threshold: f64,
    /// Number of null standard deviations treated as the drift boundary.
    pub gamma: f64,
}

impl Default for FourierMmdConfig {
    fn default() -> Self {
        Self {
            delta_stat: false,
            n_test: 100,
            n_window: 168,
            sig: 10.0,
            random_seed: 22,
            n_mode: 512,
            epsilon: 1e-7,
            threshold: 0.8,
            gamma: 2.0,
        }
    }
}

impl FourierMmdConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables first-difference scoring.
    #[must_use]
    pub fn with_delta_stat(mut self, delta_stat: bool) -> Self {
        self.delta_stat = delta_stat;
        self
    }

    /// Sets the number of reference windows.
    #[must_use]
    pub fn with_n_test(mut self, n_test: usize) -> Self {
        self.n_test = n_test;
        self
    }

    /// Sets the window length.
    #[must_use]
    pub fn with_n_window(mut self, n_window: usize) -> Self {
        self.n_window = n_window;
        self
    }

    /// Sets the kernel bandwidth multiplier.
    #[must_use]
    pub fn with_sig(mut self, sig: f64) -> Self {
        self.sig = sig;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Sets the number of Fourier features.
    #[must_use]
    pub fn with_n_mode(mut self, n_mode: usize) -> Self {
        self.n_mode = n_mode;
        self
    }

    /// Sets the standard deviation floor.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Sets the drift probability threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the drift boundary in null standard deviations.
    #[must_use]
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for any out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.n_test == 0 {
            return Err(TrustError::invalid_param("n_test", 0, ">0"));
        }
        if self.n_window == 0 {
            return Err(TrustError::invalid_param("n_window", 0, ">0"));
        }
        if self.n_mode == 0 {
            return Err(TrustError::invalid_param("n_mode", 0, ">0"));
        }
        if !(self.sig.is_finite() && self.sig > 0.0) {
            return Err(TrustError::invalid_param("sig", self.sig, "finite and >0"));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(TrustError::invalid_param("epsilon", self.epsilon, "finite and >0"));
        }
        check_threshold(self.threshold)?;
        check_gamma(self.gamma)
    }
}

fn check_threshold(threshold: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TrustError::invalid_param("threshold", threshold, "in [0, 1]"));
    }
    Ok(())
}

fn check_gamma(gamma: f64) -> Result<()> {
    if !gamma.is_finite() {
        return Err(TrustError::invalid_param("gamma", gamma, "finite"));
    }
    Ok(())
}

/// Everything needed to score new data, without the reference rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FourierMmdFitting {
    /// Seed that regenerates frequencies and phases.
    pub random_seed: u64,
    /// Whether scoring uses first differences.
    pub delta_stat: bool,
    /// Number of Fourier features.
    pub n_mode: usize,
    /// Numeric columns seen at fit time, in order.
    pub columns: Vec<String>,
    /// Per-column divisor, `max(std, epsilon) * sig`.
    pub scale: Vec<f64>,
    /// Mean Fourier features of the reference sample.
    pub a_ref: Vec<f64>,
    /// Mean of the null discrepancy distribution.
    pub mean_mmd: f64,
    /// Standard deviation of the null discrepancy distribution.
    pub std_mmd: f64,
}

/// Result of scoring one batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourierMmdResult {
    /// Whether drift is flagged.
    pub drift: bool,
    /// Probability that the batch lies beyond the drift boundary.
    pub p_value: f64,
    /// Discrepancy above the null mean in null standard deviations, floored at 0.
    pub drift_score: f64,
}

/// Fourier-feature MMD drift detector.
///
/// # Examples
///
/// ```
/// use trustkit::data::{Column, Dataframe};
/// use trustkit::drift::{FourierMmd, FourierMmdConfig};
///
/// let values: Vec<f64> = (0..400).map(|i| ((i * 37) % 101) as f64).collect();
/// let train = Dataframe::new(vec![Column::numeric("x", &values)]).expect("valid frame");
/// let config = FourierMmdConfig::new().with_n_test(20).with_n_window(10).with_n_mode(64);
/// let detector = FourierMmd::fit(&train, config).expect("enough rows");
///
/// let shifted: Vec<f64> = values.iter().map(|v| v + 500.0).collect();
/// let test = Dataframe::new(vec![Column::numeric("x", &shifted)]).expect("valid frame");
/// assert!(detector.calculate(&test).expect("same columns").drift);
/// ```
#[derive(Debug, Clone)]
pub struct FourierMmd {
    fitting: FourierMmdFitting,
    threshold: f64,
    gamma: f64,
}

impl FourierMmd {
    /// Fits on `train` and keeps `config`'s threshold and gamma for scoring.
    ///
    /// # Errors
    ///
    /// See [`precompute`](Self::precompute).
    pub fn fit(train: &Dataframe, config: FourierMmdConfig) -> Result<Self> {
        let fitting = Self::precompute(train, &config)?;
        Ok(Self {
            fitting,
            threshold: config.threshold,
            gamma: config.gamma,
        })
    }

    /// Wraps a stored fitting, scoring with the default threshold and gamma.
    #[must_use]
    pub fn from_fitting(fitting: FourierMmdFitting) -> Self {
        let defaults = FourierMmdConfig::default();
        Self {
            fitting,
            threshold: defaults.threshold,
            gamma: defaults.gamma,
        }
    }

    /// The fitted statistic.
    #[must_use]
    pub fn fitting(&self) -> &FourierMmdFitting {
        &self.fitting
    }

    /// Learns the reference signature and the null discrepancy distribution.
    ///
    /// # Errors
    ///
    /// - `InvalidHyperparameter` for an invalid configuration
    /// - `EmptyInput` if there are no numeric columns or no rows
    /// - `InvalidHyperparameter` if `min(n_window * n_test, rows) <= n_window`
    /// - `NumericalDegeneracy` if `train` holds a non-finite value, every
    ///   window discrepancy is NaN, or the discrepancies have zero spread
    pub fn precompute(train: &Dataframe, config: &FourierMmdConfig) -> Result<FourierMmdFitting> {
        config.validate()?;
        let (columns, x) = numeric_matrix(train, config.delta_stat)?;
        let (rows, d) = x.shape();
        if rows == 0 {
            return Err(TrustError::empty_input("FourierMmd training data"));
        }
        check_finite(&x, "training")?;

        let scale: Vec<f64> = (0..d)
            .map(|j| stats::sample_std(x.column(j).as_slice()).max(config.epsilon) * config.sig)
            .collect();

        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let features = FourierFeatures::draw(d, config.n_mode, &mut rng);

        let ndata = config.n_window.saturating_mul(config.n_test).min(rows);
        if ndata <= config.n_window {
            return Err(TrustError::invalid_param(
                "n_window",
                config.n_window,
                &format!("< {ndata} (available rows or n_window * n_test)"),
            ));
        }

        let mut order: Vec<usize> = (0..rows).collect();
        order.shuffle(&mut rng);
        order.truncate(ndata);
        let a_ref = features.mean_embedding(&x, &order, &scale);

        let span = ndata - config.n_window;
        let mut sample_mmd = Vec::with_capacity(config.n_test);
        for _ in 0..config.n_test {
            let start = (rng.gen::<f64>() * span as f64) as usize;
            let window: Vec<usize> = (start..start + config.n_window).collect();
            let a_comp = features.mean_embedding(&x, &window, &scale);
            sample_mmd.push(squared_distance(&a_ref, &a_comp));
        }

        let valid: Vec<f64> = sample_mmd.into_iter().filter(|v| !v.is_nan()).collect();
        if valid.is_empty() {
            return Err(TrustError::NumericalDegeneracy(
                "every reference window produced a NaN discrepancy".to_string(),
            ));
        }
        let mean_mmd = stats::mean(&valid);
        let std_mmd = stats::sample_std(&valid);
        if !(std_mmd > MIN_MMD_SPREAD) {
            return Err(TrustError::NumericalDegeneracy(
                "reference discrepancies have zero spread; data too homogeneous".to_string(),
            ));
        }

        info!(
            rows,
            columns = d,
            windows = valid.len(),
            mean_mmd,
            std_mmd,
            "FourierMMD fitting computed"
        );
        Ok(FourierMmdFitting {
            random_seed: config.random_seed,
            delta_stat: config.delta_stat,
            n_mode: config.n_mode,
            columns,
            scale,
            a_ref,
            mean_mmd,
            std_mmd,
        })
    }

    /// Scores `test` with the stored threshold and gamma.
    ///
    /// # Errors
    ///
    /// See [`calculate_with`](Self::calculate_with).
    pub fn calculate(&self, test: &Dataframe) -> Result<FourierMmdResult> {
        self.calculate_with(test, self.threshold, self.gamma)
    }

    /// Scores `test` against the reference.
    ///
    /// # Errors
    ///
    /// - `ColumnMismatch` if the numeric columns differ from the fitted ones
    /// - `EmptyInput` if there are no rows to score
    /// - `NumericalDegeneracy` if the fitting has zero spread or `test`
    ///   holds a non-finite value
    /// - `InvalidHyperparameter` for a threshold outside [0, 1] or a
    ///   non-finite gamma
    pub fn calculate_with(
        &self,
        test: &Dataframe,
        threshold: f64,
        gamma: f64,
    ) -> Result<FourierMmdResult> {
        check_threshold(threshold)?;
        check_gamma(gamma)?;
        let fit = &self.fitting;

        let (columns, x) = numeric_matrix(test, fit.delta_stat)?;
        if columns != fit.columns {
            return Err(TrustError::ColumnMismatch(format!(
                "expected numeric columns {:?}, found {:?}",
                fit.columns, columns
            )));
        }
        if x.n_rows() == 0 {
            return Err(TrustError::empty_input("FourierMmd test data"));
        }
        check_finite(&x, "test")?;
        if !(fit.std_mmd > MIN_MMD_SPREAD) {
            return Err(TrustError::NumericalDegeneracy(
                "fitting has zero discrepancy spread".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(fit.random_seed);
        let features = FourierFeatures::draw(columns.len(), fit.n_mode, &mut rng);
        let all: Vec<usize> = (0..x.n_rows()).collect();
        let a_comp = features.mean_embedding(&x, &all, &fit.scale);

        let mmd = squared_distance(&fit.a_ref, &a_comp);
        if !mmd.is_finite() {
            return Err(TrustError::NumericalDegeneracy(format!(
                "test discrepancy is {mmd}"
            )));
        }
        let drift_score = ((mmd - fit.mean_mmd) / fit.std_mmd).max(0.0);
        let p_value = 1.0 - normal_cdf(gamma - drift_score);
        let drift = p_value > threshold;

        debug!(mmd, drift_score, p_value, drift, "FourierMMD scored");
        Ok(FourierMmdResult {
            drift,
            p_value,
            drift_score,
        })
    }
}

fn check_finite(x: &Matrix<f64>, which: &str) -> Result<()> {
    if x.is_finite() {
        Ok(())
    } else {
        Err(TrustError::NumericalDegeneracy(format!(
            "{which} data holds a non-finite value"
        )))
    }
}

/// Random frequencies and phases.
struct FourierFeatures {
    /// `d x n_mode`
    wave_num: Matrix<f64>,
    bias: Vec<f64>,
}

impl FourierFeatures {
    /// Frequencies first, then phases, always in this order.
    fn draw<R: Rng + ?Sized>(d: usize, n_mode: usize, rng: &mut R) -> Self {
        let mut wave_num = Matrix::zeros(d, n_mode);
        for j in 0..d {
            for k in 0..n_mode {
                wave_num.set(j, k, standard_normal(rng));
            }
        }
        let bias = (0..n_mode).map(|_| rng.gen::<f64>() * 2.0 * PI).collect();
        Self { wave_num, bias }
    }

    /// `sqrt(2 / n_mode) * mean_rows cos(x / scale * W + b)` over the given rows.
    fn mean_embedding(&self, x: &Matrix<f64>, rows: &[usize], scale: &[f64]) -> Vec<f64> {
        let (d, n_mode) = self.wave_num.shape();
        let mut acc = vec![0.0; n_mode];
        let mut scaled = vec![0.0; d];
        for &r in rows {
            for (j, s) in scaled.iter_mut().enumerate() {
                *s = x.get(r, j) / scale[j];
            }
            for (k, a) in acc.iter_mut().enumerate() {
                let mut proj = self.bias[k];
                for (j, s) in scaled.iter().enumerate() {
                    proj += s * self.wave_num.get(j, k);
                }
                *a += proj.cos();
            }
        }
        let factor = (2.0 / n_mode as f64).sqrt() / rows.len() as f64;
        acc.iter().map(|a| a * factor).collect()
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Numeric columns as a matrix, first-differenced when asked.
fn numeric_matrix(df: &Dataframe, delta: bool) -> Result<(Vec<String>, Matrix<f64>)> {
    let numeric = df.select_numeric()?;
    let columns = numeric.column_names().iter().map(|s| (*s).to_string()).collect();
    let x = numeric.to_matrix()?;
    if !delta {
        return Ok((columns, x));
    }

    let (rows, d) = x.shape();
    let n = rows.saturating_sub(1);
    let mut diff = Vec::with_capacity(n * d);
    for r in 0..n {
        for j in 0..d {
            diff.push(x.get(r + 1, j) - x.get(r, j));
        }
    }
    Ok((columns, Matrix::from_vec(n, d, diff)?))
}

#[cfg(test)]
#[path = "fourier_mmd_tests.rs"]
mod tests;
