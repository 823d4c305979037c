//! Feature data model shared by generators, drift tests and fairness metrics.
//!
//! A [`PredictionInput`] is an ordered list of typed [`Feature`]s; a model maps
//! it to a [`PredictionOutput`].

mod feature;
mod perturbation;
mod prediction;
mod provider;

pub use feature::{Feature, FeatureType, Value};
pub use perturbation::{perturb_features, PerturbationContext};
pub use prediction::{Output, PredictionInput, PredictionOutput};
pub use provider::FnProvider;

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
