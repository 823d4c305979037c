//! Core traits.
//!
//! These define the seams between this crate and its collaborators: the model
//! being explained, the counterfactual optimizer, and the consumers of
//! background samples.

use crate::error::Result;
use crate::model::{PredictionInput, PredictionOutput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A black-box model.
///
/// Implementations may call out to remote inference servers; any failure is
/// reported as an error and treated as recoverable by callers that retry.
pub trait PredictionProvider: Send + Sync {
    /// Predicts one output per input, in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot produce predictions.
    fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>>;
}

impl<T: PredictionProvider + ?Sized> PredictionProvider for Arc<T> {
    fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (**self).predict(inputs)
    }
}

/// Produces background samples for attribution baselines.
///
/// # Examples
///
/// ```
/// use trustkit::background::RandomGenerator;
/// use trustkit::model::{Feature, PredictionInput};
/// use trustkit::traits::BackgroundGenerator;
///
/// let seeds: Vec<PredictionInput> = (0..10)
///     .map(|i| PredictionInput::new(vec![Feature::numerical("x", f64::from(i))]))
///     .collect();
/// let generator = RandomGenerator::with_seed(seeds, 42);
/// let background = generator.generate(3).expect("3 <= 10 seeds");
/// assert_eq!(background.len(), 3);
/// ```
pub trait BackgroundGenerator {
    /// Generates `n` background points.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` points cannot be produced.
    fn generate(&self, n: usize) -> Result<Vec<PredictionInput>>;
}

/// One call to a counterfactual optimizer.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Starting point.
    pub seed: PredictionInput,
    /// Desired model output.
    pub goal: PredictionOutput,
    /// Wall-clock budget for this search.
    pub timeout: Duration,
    /// Iteration budget.
    pub step_count: usize,
    /// Accepted distance between the achieved and the desired output.
    pub goal_threshold: f64,
    /// Seed for the optimizer's own randomness.
    pub search_seed: u64,
}

/// Outcome of one counterfactual search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Best point found.
    pub point: PredictionInput,
    /// Whether `point` meets the goal within the threshold.
    pub valid: bool,
}

/// An external optimizer that moves a seed toward a goal output.
pub trait CounterfactualSearch: Send + Sync {
    /// Runs one search.
    ///
    /// # Errors
    ///
    /// Returns an error if the search could not run; an unsuccessful search
    /// is reported as `valid == false` instead.
    fn search(&self, request: &SearchRequest) -> Result<SearchResult>;
}

impl<T: CounterfactualSearch + ?Sized> CounterfactualSearch for Arc<T> {
    fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        (**self).search(request)
    }
}
