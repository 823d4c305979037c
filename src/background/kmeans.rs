//! K-means background summarization.

use crate::cluster::KMeans;
use crate::error::{Result, TrustError};
use crate::model::{FeatureType, PredictionInput};
use crate::primitives::{Matrix, Vector};
use crate::traits::BackgroundGenerator;
use std::collections::HashSet;
use tracing::debug;

/// Summarizes numeric seeds into `n` k-means centroids.
///
/// Seeds are validated eagerly: every feature must be a finite `Number` and
/// all seeds must share one schema. Requesting more centroids than there are
/// distinct seed points is an error; `0.0` and `-0.0` count as one value.
#[derive(Debug, Clone)]
pub struct KMeansGenerator {
    feature_names: Vec<String>,
    data: Matrix<f64>,
    n_distinct: usize,
    random_state: Option<u64>,
}

impl KMeansGenerator {
    /// Creates a generator over `seeds`.
    ///
    /// # Errors
    ///
    /// Returns `NonNumericFeature` for any non-`Number` feature, `EmptyInput`
    /// for no seeds, `DimensionMismatch` if seeds have different lengths, or
    /// `NumericalDegeneracy` for a NaN or infinite value.
    pub fn new(seeds: &[PredictionInput]) -> Result<Self> {
        let first = seeds
            .first()
            .ok_or_else(|| TrustError::empty_input("KMeansGenerator needs at least one seed"))?;
        let feature_names = first.feature_names();
        let d = feature_names.len();

        let mut rows = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if seed.len() != d {
                return Err(TrustError::dimension_mismatch("features", d, seed.len()));
            }
            if let Some(f) = seed
                .features()
                .iter()
                .find(|f| f.feature_type != FeatureType::Number)
            {
                return Err(f.non_numeric());
            }
            let row = seed.to_vector()?.into_vec();
            if let Some(bad) = row.iter().find(|v| !v.is_finite()) {
                return Err(TrustError::NumericalDegeneracy(format!(
                    "KMeans seed holds {bad}"
                )));
            }
            rows.push(row);
        }

        // Adding 0.0 folds -0.0 into 0.0 so both hash alike
        let n_distinct = rows
            .iter()
            .map(|r| r.iter().map(|v| (v + 0.0).to_bits()).collect::<Vec<u64>>())
            .collect::<HashSet<_>>()
            .len();
        let data = Matrix::from_rows(&rows)?;

        Ok(Self {
            feature_names,
            data,
            n_distinct,
            random_state: None,
        })
    }

    /// Sets the random seed for centroid initialization.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Number of distinct seed points.
    #[must_use]
    pub fn n_distinct(&self) -> usize {
        self.n_distinct
    }
}

impl BackgroundGenerator for KMeansGenerator {
    fn generate(&self, n: usize) -> Result<Vec<PredictionInput>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        if n > self.n_distinct {
            return Err(TrustError::invalid_param(
                "n",
                n,
                &format!("<= number of distinct seed points ({})", self.n_distinct),
            ));
        }

        let mut kmeans = KMeans::new(n);
        if let Some(seed) = self.random_state {
            kmeans = kmeans.with_random_state(seed);
        }
        kmeans.fit(&self.data)?;
        let centroids = kmeans
            .centroids()
            .ok_or_else(|| TrustError::Other("KMeans produced no centroids".to_string()))?;
        debug!(n_clusters = n, inertia = kmeans.inertia(), "KMeans background generated");

        (0..centroids.n_rows())
            .map(|k| {
                let centroid = Vector::from_slice(centroids.row_slice(k));
                PredictionInput::from_vector(&self.feature_names, &centroid)
            })
            .collect()
    }
}
