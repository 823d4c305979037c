//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use trustkit::prelude::*;
//! ```

pub use crate::background::{
    CounterfactualConfig, CounterfactualGenerator, KMeansGenerator, RandomGenerator,
    StreamingConfig, StreamingGenerator,
};
pub use crate::data::{Column, Dataframe};
pub use crate::drift::{
    ApproxKsTest, FourierMmd, FourierMmdConfig, HypothesisTestResult, KsTest, Meanshift,
};
pub use crate::error::{Result, TrustError};
pub use crate::model::{Feature, FeatureType, Output, PredictionInput, PredictionOutput, Value};
pub use crate::primitives::{Matrix, Vector};
pub use crate::traits::{BackgroundGenerator, CounterfactualSearch, PredictionProvider};
