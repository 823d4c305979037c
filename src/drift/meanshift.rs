//! Mean-shift detection with Welch's t-statistic.

use super::{check_significance, numeric_columns, unknown_column, HypothesisTestResult};
use crate::data::Dataframe;
use crate::error::{Result, TrustError};
use crate::stats::{self, t_two_tailed_pvalue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Summary statistics of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Sample mean.
    pub mean: f64,
    /// Sample variance.
    pub variance: f64,
    /// Row count.
    pub n: usize,
}

impl ColumnSummary {
    /// Summarizes `values`.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            mean: stats::mean(values),
            variance: stats::sample_variance(values),
            n: values.len(),
        }
    }
}

/// Per-column reference statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanshiftFitting {
    /// Summary per numeric reference column.
    pub summaries: BTreeMap<String, ColumnSummary>,
}

/// Flags columns whose mean moved relative to the reference.
#[derive(Debug, Clone)]
pub struct Meanshift {
    fitting: MeanshiftFitting,
}

impl Meanshift {
    /// Fits on `train`.
    ///
    /// # Errors
    ///
    /// Returns an error if `train` has no rows.
    pub fn new(train: &Dataframe) -> Result<Self> {
        Ok(Self {
            fitting: Self::precompute(train)?,
        })
    }

    /// Wraps a stored fitting.
    #[must_use]
    pub fn from_fitting(fitting: MeanshiftFitting) -> Self {
        Self { fitting }
    }

    /// The fitted statistics.
    #[must_use]
    pub fn fitting(&self) -> &MeanshiftFitting {
        &self.fitting
    }

    /// Summarizes every numeric column of `train`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyInput` if `train` has no rows, or `NumericalDegeneracy`
    /// if a numeric column holds NaN or an infinity.
    pub fn precompute(train: &Dataframe) -> Result<MeanshiftFitting> {
        if train.n_rows() == 0 {
            return Err(TrustError::empty_input("mean-shift training data"));
        }
        let summaries: BTreeMap<String, ColumnSummary> = numeric_columns(train)?
            .into_iter()
            .map(|(name, values)| (name, ColumnSummary::from_values(&values)))
            .collect();
        info!(columns = summaries.len(), rows = train.n_rows(), "Mean-shift fitting computed");
        Ok(MeanshiftFitting { summaries })
    }

    /// Tests each numeric column of `test` for a change in mean.
    ///
    /// Degrees of freedom are `n_ref + n_test - 2`. Columns with fewer than
    /// two rows on either side are inconclusive; so is a column with zero
    /// variance on both sides and equal means. Zero variance with different
    /// means is a certain shift, reported with `p_value` 0 and a `stat_val`
    /// of `±f64::MAX` so the result stays representable in JSON.
    ///
    /// # Errors
    ///
    /// Returns `ColumnMismatch` if a numeric test column was not fitted, or
    /// `NumericalDegeneracy` if a test column holds NaN or an infinity.
    pub fn calculate(
        &self,
        test: &Dataframe,
        significance: f64,
    ) -> Result<BTreeMap<String, HypothesisTestResult>> {
        check_significance(significance)?;
        let mut results = BTreeMap::new();

        for (name, values) in numeric_columns(test)? {
            let reference = self
                .fitting
                .summaries
                .get(&name)
                .ok_or_else(|| unknown_column(&name))?;
            let current = ColumnSummary::from_values(&values);
            let result = welch(reference, &current, significance);
            debug!(column = %name, t = result.stat_val, p_value = result.p_value, "Mean-shift test");
            results.insert(name, result);
        }
        Ok(results)
    }
}

fn welch(a: &ColumnSummary, b: &ColumnSummary, significance: f64) -> HypothesisTestResult {
    if a.n < 2 || b.n < 2 {
        return HypothesisTestResult::inconclusive();
    }
    let se = (a.variance / a.n as f64 + b.variance / b.n as f64).sqrt();
    let diff = a.mean - b.mean;
    if se == 0.0 {
        return if diff == 0.0 {
            HypothesisTestResult::inconclusive()
        } else {
            HypothesisTestResult::new(diff.signum() * f64::MAX, 0.0, significance)
        };
    }
    let t = diff / se;
    let df = (a.n + b.n - 2) as f64;
    HypothesisTestResult::new(t, t_two_tailed_pvalue(t, df), significance)
}
