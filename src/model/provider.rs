//! Closure-backed prediction providers.

use super::prediction::{PredictionInput, PredictionOutput};
use crate::error::Result;
use crate::traits::PredictionProvider;

/// Adapts a batch function into a [`PredictionProvider`].
///
/// # Examples
///
/// ```
/// use trustkit::model::{FnProvider, Output, PredictionInput, PredictionOutput};
/// use trustkit::traits::PredictionProvider;
///
/// let model = FnProvider::new(|batch: &[PredictionInput]| {
///     batch
///         .iter()
///         .map(|input| {
///             let sum = input.to_vector()?.sum();
///             Ok(PredictionOutput::new(vec![Output::numerical("sum", sum)]))
///         })
///         .collect()
/// });
/// assert!(model.predict(&[]).expect("empty batch").is_empty());
/// ```
pub struct FnProvider<F> {
    f: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    /// Wraps `f`.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> PredictionProvider for FnProvider<F>
where
    F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync,
{
    fn predict(&self, inputs: &[PredictionInput]) -> Result<Vec<PredictionOutput>> {
        (self.f)(inputs)
    }
}

impl<F> std::fmt::Debug for FnProvider<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnProvider").finish_non_exhaustive()
    }
}
