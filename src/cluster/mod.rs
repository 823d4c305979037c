//! Clustering algorithms.
//!
//! Includes K-Means clustering with k-means++ initialization, used to
//! summarize seed data into representative centroids.

mod kmeans;

pub use kmeans::KMeans;
