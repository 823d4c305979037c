//! K-Means clustering algorithm.
//!
//! Uses Lloyd's algorithm with seeded k-means++ initialization.

use crate::error::{Result, TrustError};
use crate::primitives::Matrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// K-Means clustering algorithm.
///
/// # Algorithm
///
/// 1. Initialize centroids using k-means++ (D² sampling from a seeded RNG)
/// 2. Assign each sample to nearest centroid
/// 3. Update centroids as mean of assigned samples; a cluster that lost all
///    its samples is re-seeded with the sample farthest from its centroid
/// 4. Repeat until convergence or max iterations
///
/// Because empty clusters are re-seeded, a fit always yields exactly
/// `n_clusters` centroids.
///
/// # Examples
///
/// ```
/// use trustkit::cluster::KMeans;
/// use trustkit::primitives::Matrix;
///
/// let data = Matrix::from_vec(6, 2, vec![
///     1.0, 2.0,
///     1.5, 1.8,
///     1.0, 0.6,
///     8.0, 8.0,
///     9.0, 11.0,
///     8.5, 9.0,
/// ]).expect("Valid matrix dimensions and data length");
///
/// let mut kmeans = KMeans::new(2).with_random_state(42);
/// kmeans.fit(&data).expect("Fit succeeds with valid data");
///
/// let labels = kmeans.predict(&data).expect("model is fitted");
/// assert_eq!(labels.len(), 6);
/// ```
///
/// # Performance
///
/// - Time complexity: O(nkdi) where n=samples, k=clusters, d=features, i=iterations
/// - Space complexity: O(nk)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeans {
    /// Number of clusters.
    n_clusters: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on centroid movement.
    tol: f64,
    /// Random seed for initialization.
    random_state: Option<u64>,
    /// Cluster centroids after fitting.
    centroids: Option<Matrix<f64>>,
    /// Labels for training data.
    labels: Option<Vec<usize>>,
    /// Sum of squared distances (inertia).
    inertia: f64,
    /// Number of iterations run.
    n_iter: usize,
}

impl Default for KMeans {
    fn default() -> Self {
        Self::new(8)
    }
}

impl KMeans {
    /// Creates a new K-Means with the specified number of clusters.
    #[must_use]
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            max_iter: 300,
            tol: 1e-6,
            random_state: None,
            centroids: None,
            labels: None,
            inertia: 0.0,
            n_iter: 0,
        }
    }

    /// Sets the maximum number of iterations.
    #[must_use]
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Sets the convergence tolerance.
    #[must_use]
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Sets the random seed for reproducibility.
    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Returns the cluster centroids, if fitted.
    #[must_use]
    pub fn centroids(&self) -> Option<&Matrix<f64>> {
        self.centroids.as_ref()
    }

    /// Returns the training labels, if fitted.
    #[must_use]
    pub fn labels(&self) -> Option<&[usize]> {
        self.labels.as_deref()
    }

    /// Returns the inertia (within-cluster sum of squares).
    #[must_use]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Returns the number of iterations run.
    #[must_use]
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Returns true if the model has been fitted.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }

    /// Fits the model.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no samples, no clusters requested, or
    /// fewer samples than clusters.
    pub fn fit(&mut self, x: &Matrix<f64>) -> Result<()> {
        let n_samples = x.n_rows();

        if n_samples == 0 {
            return Err(TrustError::empty_input("Cannot fit with zero samples"));
        }
        if self.n_clusters == 0 {
            return Err(TrustError::invalid_param("n_clusters", 0, ">0"));
        }
        if n_samples < self.n_clusters {
            return Err(TrustError::invalid_param(
                "n_clusters",
                self.n_clusters,
                "<= number of samples",
            ));
        }

        let mut rng = match self.random_state {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut centroids = self.kmeans_plusplus_init(x, &mut rng);
        let mut labels = self.assign_labels(x, &centroids);

        for iter in 0..self.max_iter {
            let new_centroids = self.update_centroids(x, &labels, &centroids);
            let converged = self.centroids_converged(&centroids, &new_centroids);
            centroids = new_centroids;
            labels = self.assign_labels(x, &centroids);
            self.n_iter = iter + 1;
            if converged {
                break;
            }
        }

        self.inertia = inertia(x, &centroids, &labels);
        debug!(
            n_clusters = self.n_clusters,
            n_iter = self.n_iter,
            inertia = self.inertia,
            "KMeans fitted"
        );
        self.labels = Some(labels);
        self.centroids = Some(centroids);

        Ok(())
    }

    /// Predicts cluster labels for new data.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted or the width differs.
    pub fn predict(&self, x: &Matrix<f64>) -> Result<Vec<usize>> {
        let centroids = self
            .centroids
            .as_ref()
            .ok_or_else(|| TrustError::Other("Model not fitted. Call fit() first.".to_string()))?;
        if x.n_cols() != centroids.n_cols() {
            return Err(TrustError::dimension_mismatch(
                "features",
                centroids.n_cols(),
                x.n_cols(),
            ));
        }
        Ok(self.assign_labels(x, centroids))
    }

    /// Initializes centroids using k-means++.
    fn kmeans_plusplus_init(&self, x: &Matrix<f64>, rng: &mut StdRng) -> Matrix<f64> {
        let (n_samples, n_features) = x.shape();
        let mut centroids = Matrix::zeros(self.n_clusters, n_features);

        let first = rng.gen_range(0..n_samples);
        for j in 0..n_features {
            centroids.set(0, j, x.get(first, j));
        }

        let mut min_distances = vec![f64::INFINITY; n_samples];
        for c in 1..self.n_clusters {
            for (i, min_dist) in min_distances.iter_mut().enumerate() {
                let d = squared_distance(x.row_slice(i), centroids.row_slice(c - 1));
                if d < *min_dist {
                    *min_dist = d;
                }
            }

            // Select point with probability proportional to D²
            let total: f64 = min_distances.iter().sum();
            let chosen = if total > 0.0 {
                let target = rng.gen::<f64>() * total;
                let mut acc = 0.0;
                let mut pick = n_samples - 1;
                for (i, &d) in min_distances.iter().enumerate() {
                    acc += d;
                    if acc >= target && d > 0.0 {
                        pick = i;
                        break;
                    }
                }
                pick
            } else {
                rng.gen_range(0..n_samples)
            };

            for j in 0..n_features {
                centroids.set(c, j, x.get(chosen, j));
            }
        }

        centroids
    }

    /// Assigns each sample to the nearest centroid.
    fn assign_labels(&self, x: &Matrix<f64>, centroids: &Matrix<f64>) -> Vec<usize> {
        (0..x.n_rows())
            .map(|i| {
                let point = x.row_slice(i);
                let mut min_dist = f64::INFINITY;
                let mut min_cluster = 0;
                for k in 0..centroids.n_rows() {
                    let dist = squared_distance(point, centroids.row_slice(k));
                    if dist < min_dist {
                        min_dist = dist;
                        min_cluster = k;
                    }
                }
                min_cluster
            })
            .collect()
    }

    /// Updates centroids as the mean of assigned samples.
    fn update_centroids(
        &self,
        x: &Matrix<f64>,
        labels: &[usize],
        previous: &Matrix<f64>,
    ) -> Matrix<f64> {
        let (_, n_features) = x.shape();
        let mut new_centroids = Matrix::zeros(self.n_clusters, n_features);
        let mut counts = vec![0usize; self.n_clusters];

        for (i, &label) in labels.iter().enumerate() {
            counts[label] += 1;
            for j in 0..n_features {
                new_centroids.set(label, j, new_centroids.get(label, j) + x.get(i, j));
            }
        }

        let mut taken: Vec<usize> = Vec::new();
        for k in 0..self.n_clusters {
            if counts[k] > 0 {
                for j in 0..n_features {
                    new_centroids.set(k, j, new_centroids.get(k, j) / counts[k] as f64);
                }
            } else {
                // Re-seed with the sample farthest from its current centroid
                let far = (0..x.n_rows())
                    .filter(|i| !taken.contains(i))
                    .map(|i| {
                        (i, squared_distance(x.row_slice(i), previous.row_slice(labels[i])))
                    })
                    .fold((0, f64::NEG_INFINITY), |best, cur| {
                        if cur.1 > best.1 {
                            cur
                        } else {
                            best
                        }
                    })
                    .0;
                taken.push(far);
                debug!(cluster = k, sample = far, "Re-seeding empty cluster");
                for j in 0..n_features {
                    new_centroids.set(k, j, x.get(far, j));
                }
            }
        }

        new_centroids
    }

    /// Checks if centroids have converged.
    fn centroids_converged(&self, old: &Matrix<f64>, new: &Matrix<f64>) -> bool {
        (0..old.n_rows())
            .all(|k| squared_distance(old.row_slice(k), new.row_slice(k)) <= self.tol * self.tol)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Within-cluster sum of squared distances.
fn inertia(x: &Matrix<f64>, centroids: &Matrix<f64>, labels: &[usize]) -> f64 {
    labels
        .iter()
        .enumerate()
        .map(|(i, &k)| squared_distance(x.row_slice(i), centroids.row_slice(k)))
        .sum()
}

#[cfg(test)]
#[path = "kmeans_tests.rs"]
mod tests;
