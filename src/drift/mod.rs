//! Distribution drift detection.
//!
//! Every detector follows the same two-phase shape: `precompute` fits a
//! serializable statistic on reference data, and `calculate` scores new data
//! against it.
//!
//! - [`FourierMmd`]: random-Fourier-feature kernel mean discrepancy
//! - [`KsTest`]: exact two-sample Kolmogorov-Smirnov test
//! - [`ApproxKsTest`]: KS test against Greenwald-Khanna sketches
//! - [`Meanshift`]: Welch t-test on column means

mod approx_ks;
mod fourier_mmd;
mod gk_sketch;
mod kstest;
mod meanshift;

pub use approx_ks::{ApproxKsFitting, ApproxKsTest};
pub use fourier_mmd::{FourierMmd, FourierMmdConfig, FourierMmdFitting, FourierMmdResult};
pub use gk_sketch::{GkSketch, GkTuple};
pub use kstest::KsTest;
pub use meanshift::{ColumnSummary, Meanshift, MeanshiftFitting};

use crate::data::Dataframe;
use crate::error::{Result, TrustError};
use serde::{Deserialize, Serialize};

/// Outcome of a per-column hypothesis test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypothesisTestResult {
    /// Test statistic.
    pub stat_val: f64,
    /// Probability of a statistic at least this extreme under the null.
    pub p_value: f64,
    /// Whether the null hypothesis is rejected.
    pub reject: bool,
}

impl HypothesisTestResult {
    /// Builds a result, rejecting when `p_value <= significance`.
    #[must_use]
    pub fn new(stat_val: f64, p_value: f64, significance: f64) -> Self {
        Self {
            stat_val,
            p_value,
            reject: p_value <= significance,
        }
    }

    /// The result used when a column has too few rows to test.
    #[must_use]
    pub fn inconclusive() -> Self {
        Self {
            stat_val: 0.0,
            p_value: 1.0,
            reject: false,
        }
    }
}

fn check_significance(significance: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&significance) {
        return Err(TrustError::invalid_param(
            "significance",
            significance,
            "in [0, 1]",
        ));
    }
    Ok(())
}

/// (name, values) for every `Number` column.
///
/// Fails with `NumericalDegeneracy` on a NaN or infinite value; the rank
/// and moment statistics downstream are undefined on them.
fn numeric_columns(df: &Dataframe) -> Result<Vec<(String, Vec<f64>)>> {
    df.numeric_columns()
        .into_iter()
        .map(|j| {
            let name = df.column(j)?.name.clone();
            let values = df.column_as_f64(j)?;
            check_finite_column(&name, &values)?;
            Ok((name, values))
        })
        .collect()
}

fn check_finite_column(name: &str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(bad) => Err(TrustError::NumericalDegeneracy(format!(
            "column '{name}' holds {bad}"
        ))),
        None => Ok(()),
    }
}

fn unknown_column(name: &str) -> TrustError {
    TrustError::ColumnMismatch(format!(
        "no column named '{name}' in the reference data"
    ))
}
