//! Trustkit: background generation, drift detection and fairness metrics
//! for explaining black-box models.
//!
//! # Quick Start
//!
//! ```
//! use trustkit::prelude::*;
//!
//! // A reference batch and a shifted one
//! let reference: Vec<f64> = (0..500).map(|i| f64::from(i % 50)).collect();
//! let shifted: Vec<f64> = reference.iter().map(|v| v + 25.0).collect();
//! let train = Dataframe::new(vec![Column::numeric("x", &reference)]).unwrap();
//! let test = Dataframe::new(vec![Column::numeric("x", &shifted)]).unwrap();
//!
//! let results = KsTest::new().calculate(&train, &test, 0.05).unwrap();
//! assert!(results["x"].reject);
//! ```
//!
//! # Modules
//!
//! - [`primitives`]: Core Vector and Matrix types
//! - [`model`]: Typed features, predictions and closure-backed models
//! - [`data`]: Column-typed, row-tagged Dataframe
//! - [`stats`]: Online mean/covariance estimation and distribution functions
//! - [`cluster`]: K-Means used by the clustering background generator
//! - [`background`]: Background generators (random, k-means, streaming, counterfactual)
//! - [`drift`]: Drift detection (FourierMMD, KS, approximate KS, mean shift)
//! - [`fairness`]: Group fairness metrics (SPD, DIR, AOD, APVD)
//! - [`traits`]: Model, search and generator seams

pub mod background;
pub mod cluster;
pub mod data;
pub mod drift;
pub mod error;
pub mod fairness;
pub mod model;
pub mod prelude;
pub mod primitives;
pub mod stats;
pub mod traits;

pub use error::{Result, TrustError};
pub use primitives::{Matrix, Vector};
pub use traits::{BackgroundGenerator, CounterfactualSearch, PredictionProvider};
