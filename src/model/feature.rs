//! Typed features and values.

use crate::error::{Result, TrustError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a feature or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// Real-valued.
    Number,
    /// True/false.
    Boolean,
    /// One of a finite set of labels.
    Categorical,
    /// Free text.
    Text,
}

impl FeatureType {
    /// Returns true for types that have a numeric encoding.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, FeatureType::Number | FeatureType::Boolean)
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureType::Number => "Number",
            FeatureType::Boolean => "Boolean",
            FeatureType::Categorical => "Categorical",
            FeatureType::Text => "Text",
        };
        f.write_str(name)
    }
}

/// A single value held by a feature, output or dataframe cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Real number.
    Number(f64),
    /// Boolean flag.
    Boolean(bool),
    /// Label or free text.
    Text(String),
}

impl Value {
    /// Numeric encoding: numbers as-is, booleans as 0/1, text as `None`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(_) => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(v) => write!(f, "{v}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// A named, typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name.
    pub name: String,
    /// Declared type.
    pub feature_type: FeatureType,
    /// Current value.
    pub value: Value,
}

impl Feature {
    /// Creates a numeric feature.
    pub fn numerical(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            feature_type: FeatureType::Number,
            value: Value::Number(value),
        }
    }

    /// Creates a boolean feature.
    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Self {
            name: name.into(),
            feature_type: FeatureType::Boolean,
            value: Value::Boolean(value),
        }
    }

    /// Creates a categorical feature.
    pub fn categorical(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature_type: FeatureType::Categorical,
            value: Value::Text(label.into()),
        }
    }

    /// Creates a text feature.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature_type: FeatureType::Text,
            value: Value::Text(text.into()),
        }
    }

    /// Numeric encoding of the value.
    ///
    /// # Errors
    ///
    /// Returns `NonNumericFeature` for categorical or text features.
    pub fn as_number(&self) -> Result<f64> {
        if !self.feature_type.is_numeric() {
            return Err(self.non_numeric());
        }
        self.value.as_number().ok_or_else(|| self.non_numeric())
    }

    pub(crate) fn non_numeric(&self) -> TrustError {
        TrustError::NonNumericFeature {
            name: self.name.clone(),
            feature_type: self.feature_type.to_string(),
        }
    }
}
