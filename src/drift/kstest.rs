//! Exact two-sample Kolmogorov-Smirnov test.

use super::{check_finite_column, check_significance, numeric_columns, unknown_column, HypothesisTestResult};
use crate::data::Dataframe;
use crate::error::Result;
use crate::stats::ks_two_sample_pvalue;
use std::collections::BTreeMap;
use tracing::debug;

/// Two-sample KS test over every numeric column.
#[derive(Debug, Clone, Copy, Default)]
pub struct KsTest;

impl KsTest {
    /// Creates a test.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compares each numeric column of `test` with the same column of `train`.
    ///
    /// Columns with fewer than two rows on either side are inconclusive.
    ///
    /// # Errors
    ///
    /// Returns `ColumnMismatch` if a numeric test column is missing from
    /// `train`, `NumericalDegeneracy` if a compared column holds NaN or an
    /// infinity, or `InvalidHyperparameter` for a significance outside [0, 1].
    pub fn calculate(
        &self,
        train: &Dataframe,
        test: &Dataframe,
        significance: f64,
    ) -> Result<BTreeMap<String, HypothesisTestResult>> {
        check_significance(significance)?;
        let mut results = BTreeMap::new();

        for (name, test_values) in numeric_columns(test)? {
            let j = train
                .column_index(&name)
                .ok_or_else(|| unknown_column(&name))?;

            let result = if train.n_rows() < 2 || test.n_rows() < 2 {
                HypothesisTestResult::inconclusive()
            } else {
                let train_values = train.column_as_f64(j)?;
                check_finite_column(&name, &train_values)?;
                let d = ks_statistic(&train_values, &test_values);
                let p = ks_two_sample_pvalue(d, train_values.len(), test_values.len());
                HypothesisTestResult::new(d, p, significance)
            };
            debug!(column = %name, d = result.stat_val, p_value = result.p_value, "KS test");
            results.insert(name, result);
        }
        Ok(results)
    }
}

/// Largest distance between the two empirical CDFs.
pub(crate) fn ks_statistic(a: &[f64], b: &[f64]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j) = (0, 0);
    let mut d: f64 = 0.0;
    // total_cmp keeps the scan advancing even past NaN
    while i < a.len() && j < b.len() {
        let x = if a[i].total_cmp(&b[j]).is_le() { a[i] } else { b[j] };
        while i < a.len() && a[i].total_cmp(&x).is_le() {
            i += 1;
        }
        while j < b.len() && b[j].total_cmp(&x).is_le() {
            j += 1;
        }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    d
}
