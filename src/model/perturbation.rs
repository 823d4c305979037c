//! Random perturbation of prediction inputs.

use super::feature::{FeatureType, Value};
use super::prediction::PredictionInput;
use crate::error::{Result, TrustError};
use crate::stats::standard_normal;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How strongly, and how many, features get perturbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbationContext {
    /// Noise standard deviation relative to the feature magnitude.
    pub noise_scale: f64,
    /// Upper bound on perturbed features per call.
    pub max_perturbed_features: usize,
}

impl Default for PerturbationContext {
    fn default() -> Self {
        Self {
            noise_scale: 0.1,
            max_perturbed_features: 1,
        }
    }
}

impl PerturbationContext {
    /// Creates a context.
    #[must_use]
    pub fn new(noise_scale: f64, max_perturbed_features: usize) -> Self {
        Self {
            noise_scale,
            max_perturbed_features,
        }
    }

    /// Validates the context.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHyperparameter` for a negative or non-finite scale, or
    /// a zero feature budget.
    pub fn validate(&self) -> Result<()> {
        if !self.noise_scale.is_finite() || self.noise_scale < 0.0 {
            return Err(TrustError::invalid_param(
                "noise_scale",
                self.noise_scale,
                "finite and >= 0",
            ));
        }
        if self.max_perturbed_features == 0 {
            return Err(TrustError::invalid_param(
                "max_perturbed_features",
                self.max_perturbed_features,
                ">0",
            ));
        }
        Ok(())
    }
}

/// Returns a copy of `input` with Gaussian noise added to a random subset of
/// its numeric features.
///
/// Between one and `max_perturbed_features` numeric features are chosen; each
/// receives `N(0, (noise_scale * max(|v|, 1))^2)` noise. Non-numeric features
/// are never touched. An input without numeric features is returned unchanged.
pub fn perturb_features<R: Rng + ?Sized>(
    input: &PredictionInput,
    context: &PerturbationContext,
    rng: &mut R,
) -> PredictionInput {
    let mut out = input.clone();
    let mut numeric: Vec<usize> = out
        .features()
        .iter()
        .enumerate()
        .filter(|(_, f)| f.feature_type == FeatureType::Number)
        .map(|(i, _)| i)
        .collect();
    if numeric.is_empty() || context.max_perturbed_features == 0 {
        return out;
    }

    let upper = context.max_perturbed_features.min(numeric.len());
    let count = rng.gen_range(1..=upper);
    numeric.shuffle(rng);

    for &idx in numeric.iter().take(count) {
        let feature = &mut out.features_mut()[idx];
        if let Value::Number(v) = feature.value {
            let sigma = context.noise_scale * v.abs().max(1.0);
            feature.value = Value::Number(v + sigma * standard_normal(rng));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Feature;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_input() -> PredictionInput {
        PredictionInput::new(vec![
            Feature::numerical("a", 10.0),
            Feature::categorical("colour", "red"),
            Feature::numerical("b", -3.0),
            Feature::numerical("c", 0.0),
        ])
    }

    fn changed(a: &PredictionInput, b: &PredictionInput) -> usize {
        a.features()
            .iter()
            .zip(b.features())
            .filter(|(x, y)| x.value != y.value)
            .count()
    }

    #[test]
    fn test_respects_feature_budget() {
        let input = sample_input();
        let ctx = PerturbationContext::new(0.5, 2);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let p = perturb_features(&input, &ctx, &mut rng);
            let n = changed(&input, &p);
            assert!((1..=2).contains(&n), "changed {n} features");
            assert_eq!(p.features()[1].value, Value::Text("red".to_string()));
        }
    }

    #[test]
    fn test_zero_scale_is_identity() {
        let input = sample_input();
        let ctx = PerturbationContext::new(0.0, 3);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(perturb_features(&input, &ctx, &mut rng), input);
    }

    #[test]
    fn test_non_numeric_input_unchanged() {
        let input = PredictionInput::new(vec![Feature::text("t", "hello")]);
        let mut rng = StdRng::seed_from_u64(0);
        let p = perturb_features(&input, &PerturbationContext::default(), &mut rng);
        assert_eq!(p, input);
    }

    #[test]
    fn test_validate() {
        assert!(PerturbationContext::default().validate().is_ok());
        assert!(PerturbationContext::new(-1.0, 1).validate().is_err());
        assert!(PerturbationContext::new(0.1, 0).validate().is_err());
    }

    #[test]
    fn test_seeded_perturbation_reproducible() {
        let input = sample_input();
        let ctx = PerturbationContext::new(0.2, 3);
        let a = perturb_features(&input, &ctx, &mut StdRng::seed_from_u64(11));
        let b = perturb_features(&input, &ctx, &mut StdRng::seed_from_u64(11));
        assert_eq!(a, b);
    }
}
