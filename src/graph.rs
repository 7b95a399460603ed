//! Neighbour graph construction for KNN-Shapley scoring.
//!
//! This module turns a raw feature matrix into the fixed-width
//! k-nearest-neighbour graph consumed by [`crate::scorer`]. When the caller
//! already owns a graph, nothing here runs: the graph is passed through.
//!
//! # Overview
//!
//! 1. Validate `k` against the population size (before any search)
//! 2. Resolve the distance metric (explicit, or the dimensionality policy)
//! 3. Preflight the features (finite values, degenerate rows)
//! 4. Fit a [`NeighbourIndex`] and query every point for its `k` nearest
//!    other points, nearest first
//! 5. Assemble a [`KnnGraph`] in CSR layout
//!
//! # Metric policy
//!
//! Without an explicit metric, cosine is used for feature rows wider than
//! three columns (embedding-like data, where direction carries the signal),
//! Euclidean otherwise.
//!
//! # Usage
//!
//! ```
//! use knnshap::graph::{build_knn_graph, GraphParams};
//! use knnshap::FeatureMatrix;
//!
//! let features = FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]]).unwrap();
//! let graph = build_knn_graph(&features, &GraphParams::new(2)).unwrap();
//! assert_eq!(graph.row(0), &[1, 2]);
//! ```

use knnshap_core::distance::Metric;
use knnshap_core::error::{ShapleyError, ShapleyResult};
use knnshap_core::matrix::FeatureMatrix;
use knnshap_core::preflight::{PreflightConfig, PreflightStage};
use knnshap_core::sparse::KnnGraph;

use log::{debug, info};

use crate::index::{LinearSearchIndex, NeighbourIndex};

/// Default number of neighbours per point
pub const DEFAULT_K: usize = 10;

/// Feature widths above this get cosine by default
const COSINE_MIN_DIMS: usize = 3;

#[derive(Debug, Clone)]
pub struct GraphParams {
    pub k: usize,               // neighbours per point, other than itself
    pub metric: Option<Metric>, // None: resolved from the feature width
    pub preflight: PreflightConfig,
}

impl Default for GraphParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            metric: None,
            preflight: PreflightConfig::default(),
        }
    }
}

impl GraphParams {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }
}

// preflight settings never change which neighbours are found
impl PartialEq for GraphParams {
    fn eq(&self, other: &Self) -> bool {
        self.k == other.k && self.metric == other.metric
    }
}

/// Metric used when none is given: cosine above three dimensions, else Euclidean
pub fn resolve_metric(ncols: usize, metric: Option<Metric>) -> Metric {
    match metric {
        Some(metric) => metric,
        None if ncols > COSINE_MIN_DIMS => Metric::Cosine,
        None => Metric::Euclidean,
    }
}

/// `k` must be positive and cannot exceed the number of points
pub fn check_k(k: usize, n: usize) -> ShapleyResult<()> {
    if k == 0 {
        return Err(ShapleyError::invalid("k", k, "a positive number of neighbours"));
    }
    if k > n {
        return Err(ShapleyError::invalid(
            "k",
            k,
            format!("k <= number of examples N={n}"),
        ));
    }
    Ok(())
}

/// Build the k-nearest-neighbour graph with smartcore's linear search
pub fn build_knn_graph(features: &FeatureMatrix, params: &GraphParams) -> ShapleyResult<KnnGraph> {
    build_knn_graph_with::<LinearSearchIndex<'_>>(features, params)
}

/// Build the k-nearest-neighbour graph with any [`NeighbourIndex`] backend
pub fn build_knn_graph_with<'a, I: NeighbourIndex<'a>>(
    features: &'a FeatureMatrix,
    params: &GraphParams,
) -> ShapleyResult<KnnGraph> {
    let (n, d) = features.shape();
    check_k(params.k, n)?;

    let metric = resolve_metric(d, params.metric);
    metric.validate()?;
    info!(
        "Building k-NN graph: {} points, {} features, k={}, metric={}",
        n, d, params.k, metric
    );
    if params.metric.is_none() {
        debug!("No metric given, resolved {} from {} feature columns", metric, d);
    }

    let report = PreflightStage::new(params.preflight.clone()).execute(features)?;
    debug!("{}", report.summary());

    let index = I::fit(features, metric)?;
    let rows = index.query_all(params.k)?;
    let graph = KnnGraph::from_rows(rows)?;

    info!(
        "k-NN graph built: {} nodes, {} edges, {:.2}% sparse",
        graph.n_nodes(),
        graph.nnz(),
        graph.sparsity() * 100.0
    );
    Ok(graph)
}
