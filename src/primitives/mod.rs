//! Core compute primitives (Vector, Matrix).
//!
//! Observations, running means and covariance estimates are all expressed
//! in these two types.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
