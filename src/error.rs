//! Error types for trustkit operations.
//!
//! Every failure surfaces as a typed [`TrustError`] naming the precondition
//! that did not hold. No operation returns a partial result disguised as
//! success.

use thiserror::Error;

/// Main error type for trustkit operations.
///
/// # Examples
///
/// ```
/// use trustkit::error::TrustError;
///
/// let err = TrustError::DimensionMismatch {
///     expected: "3 features".to_string(),
///     actual: "2 features".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Error)]
pub enum TrustError {
    /// Vector/matrix/observation dimensions don't match.
    #[error("Observation dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid configuration value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// A fitting routine received no data.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A numeric-only routine received a non-numeric feature.
    #[error("Feature '{name}' has type {feature_type}, but only numeric features are supported")]
    NonNumericFeature {
        /// Feature name
        name: String,
        /// Offending type
        feature_type: String,
    },

    /// Columns of a scored frame don't match the fitted reference.
    #[error("Column mismatch: {0}")]
    ColumnMismatch(String),

    /// A computation would have produced NaN/Infinity.
    #[error("Numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// The prediction provider or counterfactual search failed.
    #[error("Collaborator failure: {0}")]
    Collaborator(String),

    /// A collaborator call exceeded its wall-clock budget.
    #[error("Operation timed out after {seconds}s")]
    Timeout {
        /// Budget in seconds
        seconds: u64,
    },

    /// The counterfactual attempt budget was exhausted.
    #[error(
        "Could not generate background: found {found} of {requested} valid points after {attempts} failed attempts"
    )]
    Exhausted {
        /// Valid points found
        found: usize,
        /// Points requested
        requested: usize,
        /// Failed attempts made
        attempts: usize,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error with string message.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for TrustError {
    fn from(msg: &str) -> Self {
        TrustError::Other(msg.to_string())
    }
}

impl From<String> for TrustError {
    fn from(msg: String) -> Self {
        TrustError::Other(msg)
    }
}

impl TrustError {
    /// Create a dimension mismatch error with descriptive context
    #[must_use]
    pub fn dimension_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            expected: format!("{context}={expected}"),
            actual: format!("{actual}"),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::EmptyInput(context.to_string())
    }

    /// Create an invalid hyperparameter error
    #[must_use]
    pub fn invalid_param(param: &str, value: impl ToString, constraint: &str) -> Self {
        Self::InvalidHyperparameter {
            param: param.to_string(),
            value: value.to_string(),
            constraint: constraint.to_string(),
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, TrustError>;
