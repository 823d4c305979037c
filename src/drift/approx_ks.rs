//! Two-sample KS test against sketched reference data.

use super::{check_significance, numeric_columns, unknown_column, GkSketch, HypothesisTestResult};
use crate::data::Dataframe;
use crate::error::{Result, TrustError};
use crate::stats::ks_two_sample_pvalue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Per-column sketches of the reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproxKsFitting {
    /// Sketch approximation parameter.
    pub epsilon: f64,
    /// One sketch per numeric reference column.
    pub sketches: BTreeMap<String, GkSketch>,
}

/// KS test whose reference side is a Greenwald-Khanna sketch, so the
/// reference data does not have to be kept.
///
/// The distance is the largest difference of approximate CDFs evaluated at
/// every value stored in either sketch.
#[derive(Debug, Clone)]
pub struct ApproxKsTest {
    fitting: ApproxKsFitting,
}

impl ApproxKsTest {
    /// Default sketch approximation.
    pub const DEFAULT_EPSILON: f64 = 0.01;

    /// Sketches `train` and keeps the result.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid `epsilon`.
    pub fn new(train: &Dataframe, epsilon: f64) -> Result<Self> {
        Ok(Self {
            fitting: Self::precompute(train, epsilon)?,
        })
    }

    /// Wraps a stored fitting.
    #[must_use]
    pub fn from_fitting(fitting: ApproxKsFitting) -> Self {
        Self { fitting }
    }

    /// The fitted sketches.
    #[must_use]
    pub fn fitting(&self) -> &ApproxKsFitting {
        &self.fitting
    }

    /// Sketches every numeric column of `train`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` unless `0 < epsilon <= 0.5`, or
    /// `NumericalDegeneracy` if a numeric column holds NaN or an infinity.
    pub fn precompute(train: &Dataframe, epsilon: f64) -> Result<ApproxKsFitting> {
        let mut sketches = BTreeMap::new();
        for (name, values) in numeric_columns(train)? {
            sketches.insert(name, GkSketch::from_values(epsilon, &values)?);
        }
        if sketches.is_empty() {
            // Still validate epsilon for an all-categorical frame
            GkSketch::new(epsilon)?;
        }
        info!(
            columns = sketches.len(),
            rows = train.n_rows(),
            epsilon,
            "Approximate KS fitting computed"
        );
        Ok(ApproxKsFitting { epsilon, sketches })
    }

    /// Tests each numeric column of `test` against its reference sketch.
    ///
    /// Columns with fewer than two rows on either side are inconclusive.
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
                .sketches
                .get(&name)
                .ok_or_else(|| unknown_column(&name))?;

            let result = if test.n_rows() < 2 || reference.count() < 2 {
                HypothesisTestResult::inconclusive()
            } else {
                let sketch = GkSketch::from_values(self.fitting.epsilon, &values)?;
                let d = sketch_distance(reference, &sketch)?;
                let p = ks_two_sample_pvalue(d, reference.count(), sketch.count());
                HypothesisTestResult::new(d, p, significance)
            };
            debug!(column = %name, d = result.stat_val, p_value = result.p_value, "Approximate KS test");
            results.insert(name, result);
        }
        Ok(results)
    }
}

/// Largest gap between the approximate CDFs of two sketches.
fn sketch_distance(a: &GkSketch, b: &GkSketch) -> Result<f64> {
    if a.count() == 0 || b.count() == 0 {
        return Err(TrustError::empty_input("sketch"));
    }
    let (na, nb) = (a.count() as f64, b.count() as f64);
    let d = a
        .summary()
        .iter()
        .chain(b.summary())
        .map(|t| {
            let fa = a.rank(t.value) as f64 / na;
            let fb = b.rank(t.value) as f64 / nb;
            (fa - fb).abs()
        })
        .fold(0.0, f64::max);
    Ok(d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Column;
    use crate::drift::kstest::ks_statistic;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn uniform(n: usize, lo: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| lo + rng.gen::<f64>()).collect()
    }

    fn frame(x: &[f64]) -> Dataframe {
        Dataframe::new(vec![Column::numeric("x", x)]).expect("valid frame")
    }

    #[test]
    fn test_distance_close_to_exact() {
        let a = uniform(3000, 0.0, 1);
        let b = uniform(2000, 0.3, 2);
        let exact = ks_statistic(&a, &b);
        let sa = GkSketch::from_values(0.01, &a).expect("valid epsilon");
        let sb = GkSketch::from_values(0.01, &b).expect("valid epsilon");
        let approx = sketch_distance(&sa, &sb).expect("non-empty sketches");
        assert!((approx - exact).abs() < 0.05, "approx {approx}, exact {exact}");
    }

    #[test]
    fn test_same_distribution_not_rejected() {
        // Two interleaved grids over [0, 1)
        let train: Vec<f64> = (0..2000).map(|i| f64::from(i) / 2000.0).collect();
        let grid: Vec<f64> = (0..1000).map(|i| (f64::from(i) + 0.5) / 1000.0).collect();
        let test = ApproxKsTest::new(&frame(&train), 0.01).expect("valid epsilon");
        let results = test.calculate(&frame(&grid), 0.05).expect("same schema");
        assert!(!results["x"].reject, "{:?}", results["x"]);
    }

    #[test]
    fn test_shifted_distribution_rejected() {
        let test = ApproxKsTest::new(&frame(&uniform(2000, 0.0, 5)), 0.01).expect("valid epsilon");
        let results = test
            .calculate(&frame(&uniform(1000, 0.5, 6)), 0.05)
            .expect("same schema");
        assert!(results["x"].reject);
        assert!(results["x"].stat_val > 0.4);
    }

    #[test]
    fn test_fitting_serde_round_trip() {
        let fitting =
            ApproxKsTest::precompute(&frame(&uniform(500, 0.0, 7)), 0.05).expect("valid epsilon");
        let json = serde_json::to_string(&fitting).expect("serializes");
        let restored: ApproxKsFitting = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(restored, fitting);

        let batch = frame(&uniform(300, 0.0, 8));
        let a = ApproxKsTest::from_fitting(fitting).calculate(&batch, 0.05);
        let b = ApproxKsTest::from_fitting(restored).calculate(&batch, 0.05);
        assert_eq!(a.expect("fitted"), b.expect("fitted"));
    }

    #[test]
    fn test_edge_cases() {
        assert!(ApproxKsTest::new(&frame(&[1.0, 2.0]), 0.0).is_err());

        let test = ApproxKsTest::new(&frame(&[1.0, 2.0, 3.0]), 0.1).expect("valid epsilon");
        let results = test.calculate(&frame(&[1.0]), 0.05).expect("same schema");
        assert_eq!(results["x"], HypothesisTestResult::inconclusive());

        let other = Dataframe::new(vec![Column::numeric("y", &[1.0, 2.0])]).expect("valid frame");
        assert!(matches!(
            test.calculate(&other, 0.05),
            Err(TrustError::ColumnMismatch(_))
        ));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let train = uniform(200, 0.0, 3);
        let mut poisoned = train.clone();
        poisoned[17] = f64::NAN;
        assert!(matches!(
            ApproxKsTest::new(&frame(&poisoned), 0.05),
            Err(TrustError::NumericalDegeneracy(_))
        ));

        let test = ApproxKsTest::new(&frame(&train), 0.05).expect("finite reference");
        let mut batch = uniform(100, 0.0, 4);
        batch[0] = f64::INFINITY;
        assert!(matches!(
            test.calculate(&frame(&batch), 0.05),
            Err(TrustError::NumericalDegeneracy(_))
        ));
    }
}
