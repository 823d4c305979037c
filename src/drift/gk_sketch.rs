//! Greenwald-Khanna epsilon-approximate quantile sketch.

use crate::error::{Result, TrustError};
use serde::{Deserialize, Serialize};

/// One summary entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GkTuple {
    /// Stored sample value.
    pub value: f64,
    /// Rank gap to the previous entry.
    pub g: usize,
    /// Uncertainty of this entry's rank.
    pub delta: usize,
}

/// Streaming quantile summary with rank error at most `epsilon * n`.
///
/// The smallest and largest values seen are always kept exactly.
///
/// # Examples
///
/// ```
/// use trustkit::drift::GkSketch;
///
/// let mut sketch = GkSketch::new(0.01).expect("valid epsilon");
/// for i in 1..=1000 {
///     sketch.insert(f64::from(i));
/// }
/// let median = sketch.quantile(0.5).expect("phi in [0, 1]");
/// assert!((median - 500.0).abs() <= 10.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GkSketch {
    epsilon: f64,
    summary: Vec<GkTuple>,
    n: usize,
}

impl GkSketch {
    /// Creates an empty sketch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` unless `0 < epsilon <= 0.5`.
    pub fn new(epsilon: f64) -> Result<Self> {
        if !(epsilon > 0.0 && epsilon <= 0.5) {
            return Err(TrustError::invalid_param("epsilon", epsilon, "in (0, 0.5]"));
        }
        Ok(Self {
            epsilon,
            summary: Vec::new(),
            n: 0,
        })
    }

    /// Builds a sketch from a batch of values.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid `epsilon`.
    pub fn from_values(epsilon: f64, values: &[f64]) -> Result<Self> {
        let mut sketch = Self::new(epsilon)?;
        for &v in values {
            sketch.insert(v);
        }
        Ok(sketch)
    }

    /// Approximation parameter.
    #[must_use]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Number of values inserted.
    #[must_use]
    pub fn count(&self) -> usize {
        self.n
    }

    /// Number of stored tuples.
    #[must_use]
    pub fn size(&self) -> usize {
        self.summary.len()
    }

    /// Stored tuples in value order.
    #[must_use]
    pub fn summary(&self) -> &[GkTuple] {
        &self.summary
    }

    /// Smallest value seen.
    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.summary.first().map(|t| t.value)
    }

    /// Largest value seen.
    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.summary.last().map(|t| t.value)
    }

    /// Adds one value. NaN is ignored.
    pub fn insert(&mut self, x: f64) {
        if x.is_nan() {
            return;
        }
        let steps = ((1.0 / (2.0 * self.epsilon)).floor() as usize).max(1);
        if self.n > 0 && self.n % steps == 0 {
            self.compress();
        }
        self.n += 1;

        // First entry strictly greater than x
        let idx = self.summary.partition_point(|t| t.value <= x);
        let delta = if idx == 0 || idx == self.summary.len() {
            0
        } else {
            let next = self.summary[idx];
            (next.g + next.delta).saturating_sub(1)
        };
        self.summary.insert(idx, GkTuple { value: x, g: 1, delta });
    }

    /// Merges adjacent tuples whose combined rank uncertainty stays under
    /// `2 * epsilon * n`. The first and last tuples are never absorbed.
    pub fn compress(&mut self) {
        if self.summary.len() < 3 {
            return;
        }
        let bound = 2.0 * self.epsilon * self.n as f64;
        let mut i = self.summary.len() - 2;
        while i >= 1 {
            let cur = self.summary[i];
            let next = self.summary[i + 1];
            if ((cur.g + next.g + next.delta) as f64) < bound {
                self.summary[i + 1].g += cur.g;
                self.summary.remove(i);
            }
            i -= 1;
        }
    }

    /// Approximate number of inserted values `<= x`.
    #[must_use]
    pub fn rank(&self, x: f64) -> usize {
        match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => {
                if x < lo {
                    0
                } else if x >= hi {
                    self.n
                } else {
                    self.summary
                        .iter()
                        .take_while(|t| t.value <= x)
                        .map(|t| t.g)
                        .sum()
                }
            }
            _ => 0,
        }
    }

    /// Value whose rank is within `epsilon * n` of `ceil(phi * n)`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` if `phi` is outside [0, 1], or
    /// `EmptyInput` if nothing has been inserted.
    pub fn quantile(&self, phi: f64) -> Result<f64> {
        if !(0.0..=1.0).contains(&phi) {
            return Err(TrustError::invalid_param("phi", phi, "in [0, 1]"));
        }
        let (lo, hi) = match (self.min(), self.max()) {
            (Some(lo), Some(hi)) => (lo, hi),
            _ => return Err(TrustError::empty_input("GkSketch")),
        };

        let target = (phi * self.n as f64).ceil() as usize;
        if target <= 1 {
            return Ok(lo);
        }
        if target >= self.n {
            return Ok(hi);
        }

        let tolerance = self.epsilon * self.n as f64;
        let mut r_min = 0usize;
        for t in &self.summary {
            r_min += t.g;
            let r_max = r_min + t.delta;
            if (target as f64 - r_min as f64) <= tolerance && (r_max as f64 - target as f64) <= tolerance {
                return Ok(t.value);
            }
        }
        Ok(hi)
    }

    /// Quantiles for several probabilities.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`quantile`](Self::quantile).
    pub fn approx_quantiles(&self, probs: &[f64]) -> Result<Vec<f64>> {
        probs.iter().map(|&phi| self.quantile(phi)).collect()
    }
}
