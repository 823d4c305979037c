//! Model inputs and outputs.

use super::feature::{Feature, FeatureType, Value};
use crate::error::{Result, TrustError};
use crate::primitives::Vector;
use serde::{Deserialize, Serialize};

/// An ordered collection of features describing one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    features: Vec<Feature>,
}

impl PredictionInput {
    /// Wraps a list of features.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    /// Builds numeric features from names and values.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` if the lengths differ.
    pub fn from_vector(names: &[String], values: &Vector<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(TrustError::dimension_mismatch(
                "feature names",
                names.len(),
                values.len(),
            ));
        }
        let features = names
            .iter()
            .zip(values.as_slice())
            .map(|(name, &v)| Feature::numerical(name.clone(), v))
            .collect();
        Ok(Self { features })
    }

    /// Numeric encoding of every feature.
    ///
    /// # Errors
    ///
    /// Returns `NonNumericFeature` on the first categorical or text feature.
    pub fn to_vector(&self) -> Result<Vector<f64>> {
        let values = self
            .features
            .iter()
            .map(Feature::as_number)
            .collect::<Result<Vec<f64>>>()?;
        Ok(Vector::from_vec(values))
    }

    /// Features in order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Mutable access to the features.
    pub fn features_mut(&mut self) -> &mut [Feature] {
        &mut self.features
    }

    /// Feature names in order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.name.clone()).collect()
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if there are no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// One named model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    /// Output name.
    pub name: String,
    /// Declared type.
    pub output_type: FeatureType,
    /// Predicted value.
    pub value: Value,
    /// Confidence score.
    pub score: f64,
}

impl Output {
    /// A numeric output with score 1.0.
    pub fn numerical(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            output_type: FeatureType::Number,
            value: Value::Number(value),
            score: 1.0,
        }
    }

    /// A boolean output with score 1.0.
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            output_type: FeatureType::Boolean,
            value: Value::Boolean(value),
            score: 1.0,
        }
    }
}

/// All outputs produced for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    outputs: Vec<Output>,
}

impl PredictionOutput {
    /// Wraps a list of outputs.
    #[must_use]
    pub fn new(outputs: Vec<Output>) -> Self {
        Self { outputs }
    }

    /// Outputs in order.
    #[must_use]
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Finds an output by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Output> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Numeric encoding of the output values.
    ///
    /// # Errors
    ///
    /// Returns `NonNumericFeature` if any output is text.
    pub fn to_vector(&self) -> Result<Vector<f64>> {
        let values = self
            .outputs
            .iter()
            .map(|o| {
                o.value.as_number().ok_or_else(|| TrustError::NonNumericFeature {
                    name: o.name.clone(),
                    feature_type: o.output_type.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Vector::from_vec(values))
    }
}
