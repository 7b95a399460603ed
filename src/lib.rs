//! # knnshap
//!
//! Data valuation with the closed-form KNN-Shapley approximation.
//!
//! Every labelled point gets a score in `[0, 1]`: how much its presence
//! helps a k-nearest-neighbour classifier predict the labels of the points
//! around it. `0.5` is neutral, higher is more valuable; the lowest scores
//! are the first candidates for label review.
//!
//! ## Modules
//!
//! - [`graph`]: k-nearest-neighbour graph from raw features, metric policy
//! - [`index`]: the neighbour-search backend behind the graph provider
//! - [`scorer`]: the KNN-Shapley recurrence and its aggregation
//! - [`builder`]: configuration, [`compute_scores`] entry point
//!
//! Data types (feature matrix, neighbour graph, metrics, errors) live in
//! `knnshap-core` and are re-exported here.
//!
//! ## Quick Start
//!
//! ```
//! use knnshap::{FeatureMatrix, KnnShapleyBuilder};
//!
//! let features = FeatureMatrix::from_rows(&[
//!     vec![0.0, 0.1],
//!     vec![0.1, 0.0],
//!     vec![0.2, 0.1],
//!     vec![5.0, 5.1],
//!     vec![5.1, 5.0],
//!     vec![0.1, 0.2],
//! ])
//! .unwrap();
//! // the last point sits in the first cluster but carries the other label
//! let labels = ["a", "a", "a", "b", "b", "b"];
//!
//! let scores = KnnShapleyBuilder::new()
//!     .with_k(2)
//!     .score_features(&labels, &features)
//!     .unwrap();
//!
//! assert_eq!(scores.len(), 6);
//! assert!(scores[5] < scores[1]);
//! ```

pub mod builder;
pub mod graph;
pub mod index;
pub mod scorer;

pub use builder::{KnnShapleyBuilder, ValuationConfig, compute_scores};
pub use scorer::{Accumulation, ScoreSummary, knn_shapley_score, lowest_scores};

pub use knnshap_core::distance::Metric;
pub use knnshap_core::error::{ShapleyError, ShapleyResult};
pub use knnshap_core::matrix::FeatureMatrix;
pub use knnshap_core::sparse::KnnGraph;

#[cfg(test)]
mod tests;
