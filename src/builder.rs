//! KNN-Shapley builder and entry points.
//!
//! This module configures a valuation run and dispatches it to the right
//! pipeline:
//! - a caller-supplied [`KnnGraph`] is scored directly (pass-through)
//! - a [`FeatureMatrix`] first goes through [`crate::graph::build_knn_graph`]
//!
//! [`compute_scores`] is the one-call form; [`KnnShapleyBuilder`] keeps a
//! reusable configuration.

use knnshap_core::distance::Metric;
use knnshap_core::error::{ShapleyError, ShapleyResult};
use knnshap_core::matrix::FeatureMatrix;
use knnshap_core::sparse::KnnGraph;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::graph::{DEFAULT_K, GraphParams, build_knn_graph, check_k};
use crate::scorer::{Accumulation, knn_shapley_score};

/// Serialisable valuation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    /// Neighbours per point (default 10)
    pub k: usize,
    /// Metric name for graph construction; `None` picks by feature width
    pub metric: Option<String>,
    /// Sparse by default; `Dense` allocates `N × N` floats and gives the
    /// same scores
    pub accumulation: Accumulation,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            metric: None,
            accumulation: Accumulation::Sparse,
        }
    }
}

impl ValuationConfig {
    /// Parse the metric name, if any
    pub fn metric(&self) -> ShapleyResult<Option<Metric>> {
        self.metric.as_deref().map(str::parse).transpose()
    }

    pub fn validate(&self) -> ShapleyResult<()> {
        if self.k == 0 {
            return Err(ShapleyError::invalid(
                "k",
                self.k,
                "a positive number of neighbours",
            ));
        }
        if let Some(metric) = self.metric()? {
            metric.validate()?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct KnnShapleyBuilder {
    config: ValuationConfig,
}

impl KnnShapleyBuilder {
    pub fn new() -> Self {
        debug!("Creating KnnShapleyBuilder with default parameters");
        Self::default()
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.config.k = k;
        self
    }

    /// Metric by name, e.g. `"cosine"` or `"euclidean"`
    pub fn with_metric(mut self, metric: &str) -> Self {
        self.config.metric = Some(metric.to_string());
        self
    }

    pub fn with_accumulation(mut self, accumulation: Accumulation) -> Self {
        self.config.accumulation = accumulation;
        self
    }

    pub fn with_config(mut self, config: ValuationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Neighbour graph this configuration would score for `features`
    pub fn build_graph(&self, features: &FeatureMatrix) -> ShapleyResult<KnnGraph> {
        self.config.validate()?;
        let params = GraphParams {
            k: self.config.k,
            metric: self.config.metric()?,
            ..GraphParams::default()
        };
        build_knn_graph(features, &params)
    }

    /// Score a caller-supplied graph
    pub fn score_graph<L: PartialEq + Sync>(
        &self,
        labels: &[L],
        graph: &KnnGraph,
    ) -> ShapleyResult<Vec<f64>> {
        self.config.validate()?;
        knn_shapley_score(graph, labels, self.config.k, self.config.accumulation)
    }

    /// Build the graph from raw features, then score it
    pub fn score_features<L: PartialEq + Sync>(
        &self,
        labels: &[L],
        features: &FeatureMatrix,
    ) -> ShapleyResult<Vec<f64>> {
        self.config.validate()?;
        check_k(self.config.k, features.nrows())?;
        if labels.len() != features.nrows() {
            return Err(ShapleyError::invalid(
                "labels",
                format!("{} labels", labels.len()),
                format!("one label per feature row (N={})", features.nrows()),
            ));
        }
        let graph = self.build_graph(features)?;
        self.score_graph(labels, &graph)
    }
}

/// KNN-Shapley score of every labelled point.
///
/// Either `knn_graph` or `features` must be given. A graph is used as-is
/// (`features` and `metric` are then ignored); otherwise the graph is built
/// from `features` with `metric`, or the default metric for the feature
/// width when `metric` is `None`.
///
/// ```
/// use knnshap::{compute_scores, FeatureMatrix};
///
/// let labels = [0, 1, 0, 1, 0];
/// let features =
///     FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
/// let scores = compute_scores(&labels, None, Some(&features), None, 4).unwrap();
/// assert!((scores[0] - 0.55).abs() < 1e-9);
/// assert!((scores[1] - 0.525).abs() < 1e-9);
/// ```
pub fn compute_scores<L: PartialEq + Sync>(
    labels: &[L],
    knn_graph: Option<&KnnGraph>,
    features: Option<&FeatureMatrix>,
    metric: Option<&str>,
    k: usize,
) -> ShapleyResult<Vec<f64>> {
    let builder = KnnShapleyBuilder::new().with_k(k);

    match (knn_graph, features) {
        (Some(graph), features) => {
            if features.is_some() {
                debug!("Both graph and features given, using the graph");
            }
            info!("Scoring pre-built neighbour graph ({} nodes)", graph.n_nodes());
            builder.score_graph(labels, graph)
        }
        (None, Some(features)) => {
            let builder = match metric {
                Some(metric) => builder.with_metric(metric),
                None => builder,
            };
            builder.score_features(labels, features)
        }
        (None, None) => Err(ShapleyError::invalid(
            "knn_graph / features",
            "neither given",
            "a neighbour graph or a feature matrix",
        )),
    }
}
