//! KNN-Shapley scoring over a k-nearest-neighbour graph.
//!
//! For every query point `q` (one row of the graph) the scorer walks the
//! row from the farthest to the nearest neighbour:
//!
//! ```text
//! idx       = row(q)[..k] reversed          // idx[k-1] is the nearest
//! match[j]  = labels[idx[j]] == labels[q]
//! s[k-1]    = match[k-1]
//! s[j]      = s[j+1] + (match[j] - match[j+1])      for j = k-2 ..= 0
//! ```
//!
//! `s` is the contribution row `q` attributes to each of its neighbours;
//! every other point gets 0 from that row. Each point's final value is the
//! mean of its column over all `N` rows, divided by `k`, mapped from
//! `[-1, 1]` to `[0, 1]` with `0.5 * (mean + 1)`:
//!
//! - `> 0.5`: the point helps leave-one-out KNN predictions of its neighbours
//! - `= 0.5`: neutral (never a neighbour, or never agrees)
//!
//! Closed form from Jia et al., "Efficient Task-Specific Data Valuation for
//! Nearest Neighbor Algorithms" (VLDB 2019).
//!
//! # Accumulation
//!
//! [`Accumulation::Dense`] materialises the `N × N` contribution matrix, one
//! row per query filled in parallel. [`Accumulation::Sparse`] keeps only the
//! `k` visited entries of each row and folds them into a length-`N` total.
//! Both aggregate every column in ascending query order, so their outputs
//! are bit-identical and independent of the rayon pool size.

use std::cmp::Ordering;
use std::fmt;

use knnshap_core::error::{ShapleyError, ShapleyResult};
use knnshap_core::sparse::KnnGraph;

use log::{debug, info, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Score of a point with no net effect
pub const NEUTRAL_SCORE: f64 = 0.5;

/// How per-query contributions are collected before the column means
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accumulation {
    /// `N × N` matrix, `O(N²)` memory; only for small `N`
    Dense,
    /// visited entries only, `O(N·k)` memory
    #[default]
    Sparse,
}

impl std::str::FromStr for Accumulation {
    type Err = ShapleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dense" => Ok(Accumulation::Dense),
            "sparse" => Ok(Accumulation::Sparse),
            _ => Err(ShapleyError::invalid(
                "accumulation",
                format!("{s:?}"),
                "\"dense\" or \"sparse\"",
            )),
        }
    }
}

/// Contributions of one query row.
///
/// Returns the neighbours farthest first together with the value the
/// recurrence assigns to each of them. `k` must be in `1..=neighbours.len()`
/// and every neighbour must index into `labels`.
pub fn query_contributions<L: PartialEq>(
    neighbours: &[usize],
    labels: &[L],
    query_label: &L,
    k: usize,
) -> ShapleyResult<(Vec<usize>, Vec<f64>)> {
    if k == 0 {
        return Err(ShapleyError::invalid("k", k, "a positive number of neighbours"));
    }
    if k > neighbours.len() {
        return Err(ShapleyError::invalid(
            "k",
            k,
            format!("k <= neighbours in the row ({})", neighbours.len()),
        ));
    }
    if let Some(&j) = neighbours[..k].iter().find(|&&j| j >= labels.len()) {
        return Err(ShapleyError::invalid(
            "neighbours",
            j,
            format!("index < number of labels ({})", labels.len()),
        ));
    }
    Ok(row_contributions(neighbours, labels, query_label, k))
}

// callers have checked k against the row and the row against labels
fn row_contributions<L: PartialEq>(
    neighbours: &[usize],
    labels: &[L],
    query_label: &L,
    k: usize,
) -> (Vec<usize>, Vec<f64>) {
    let idx: Vec<usize> = neighbours[..k].iter().rev().copied().collect();
    let matches: Vec<f64> = idx
        .iter()
        .map(|&j| if labels[j] == *query_label { 1.0 } else { 0.0 })
        .collect();

    let mut s = vec![0.0; k];
    s[k - 1] = matches[k - 1];
    for j in (0..k - 1).rev() {
        s[j] = s[j + 1] + (matches[j] - matches[j + 1]);
    }
    (idx, s)
}

/// Check labels and `k` against the graph before any work
fn validate_inputs<L>(graph: &KnnGraph, labels: &[L], k: usize) -> ShapleyResult<()> {
    // a caller-built or deserialised graph may not have been checked yet
    graph.validate()?;
    let n = graph.n_nodes();
    if labels.len() != n {
        return Err(ShapleyError::invalid(
            "labels",
            format!("{} labels", labels.len()),
            format!("one label per graph row (N={n})"),
        ));
    }
    if k == 0 {
        return Err(ShapleyError::invalid("k", k, "a positive number of neighbours"));
    }
    if k > graph.row_width() {
        return Err(ShapleyError::invalid(
            "k",
            k,
            format!(
                "k <= neighbours stored per graph row ({})",
                graph.row_width()
            ),
        ));
    }
    Ok(())
}

/// KNN-Shapley value of every point in `[0, 1]`, aligned with `labels`.
///
/// Only the `k` nearest entries of each row are used when the graph stores
/// more than `k` neighbours per row.
pub fn knn_shapley_score<L: PartialEq + Sync>(
    graph: &KnnGraph,
    labels: &[L],
    k: usize,
    accumulation: Accumulation,
) -> ShapleyResult<Vec<f64>> {
    validate_inputs(graph, labels, k)?;
    let n = graph.n_nodes();
    info!(
        "Scoring {} points with k={} ({:?} accumulation)",
        n, k, accumulation
    );

    let scores = match accumulation {
        Accumulation::Dense => score_dense(graph, labels, k),
        Accumulation::Sparse => score_sparse(graph, labels, k),
    };

    debug!("{}", ScoreSummary::from_scores(&scores));
    Ok(scores)
}

fn to_unit_interval(column_total: f64, n: usize) -> f64 {
    NEUTRAL_SCORE * (column_total / n as f64 + 1.0)
}

fn score_dense<L: PartialEq + Sync>(graph: &KnnGraph, labels: &[L], k: usize) -> Vec<f64> {
    let n = graph.n_nodes();
    trace!("Allocating {}×{} contribution matrix", n, n);
    let mut contributions = vec![0.0f64; n * n];

    // rows are disjoint: one query per chunk
    contributions
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(q, row)| {
            let (idx, s) = row_contributions(graph.row(q), labels, &labels[q], k);
            for (j, value) in idx.into_iter().zip(s) {
                row[j] = value;
            }
        });

    let kf = k as f64;
    (0..n)
        .into_par_iter()
        .map(|c| {
            let total: f64 = (0..n).map(|q| contributions[q * n + c] / kf).sum();
            to_unit_interval(total, n)
        })
        .collect()
}

fn score_sparse<L: PartialEq + Sync>(graph: &KnnGraph, labels: &[L], k: usize) -> Vec<f64> {
    let n = graph.n_nodes();
    let per_query: Vec<(Vec<usize>, Vec<f64>)> = (0..n)
        .into_par_iter()
        .map(|q| row_contributions(graph.row(q), labels, &labels[q], k))
        .collect();

    // sequential fold in query order, same summation order as the dense columns
    let kf = k as f64;
    let mut totals = vec![0.0f64; n];
    for (idx, s) in &per_query {
        for (&j, &value) in idx.iter().zip(s) {
            totals[j] += value / kf;
        }
    }

    totals.into_iter().map(|t| to_unit_interval(t, n)).collect()
}

/// Aggregate view of a score vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub n: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Points scored strictly below the neutral 0.5
    pub n_harmful: usize,
}

impl ScoreSummary {
    pub fn from_scores(scores: &[f64]) -> Self {
        let n = scores.len();
        let (min, max) = scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &s| {
                (min.min(s), max.max(s))
            });
        let mean = if n > 0 {
            scores.iter().sum::<f64>() / n as f64
        } else {
            f64::NAN
        };
        Self {
            n,
            mean,
            min,
            max,
            n_harmful: scores.iter().filter(|&&s| s < NEUTRAL_SCORE).count(),
        }
    }
}

impl fmt::Display for ScoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scores: n={}, mean={:.6}, range=[{:.6}, {:.6}], below neutral={}",
            self.n, self.mean, self.min, self.max, self.n_harmful
        )
    }
}

/// Indices of the `count` lowest scores, lowest first (ties: lower index)
pub fn lowest_scores(scores: &[f64], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(&b))
    });
    order.truncate(count);
    order
}
