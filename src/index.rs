//! # Nearest-neighbour index over feature rows
//!
//! The scorer only needs, for every point, its `k` nearest *other* points in
//! ascending distance order. This module hides how that ordering is found
//! behind [`NeighbourIndex`]; [`LinearSearchIndex`] is the exhaustive
//! backend, built on smartcore's `LinearKNNSearch` with [`Metric`] as the
//! smartcore distance.
//!
//! ## Complexity
//! 1. **Fit**: `O(n)`, the index borrows every row of the feature matrix
//! 2. **Query one row**: two linear scans of `O(n × d)` (the `k + 1`
//!    nearest, then every point tied with the farthest of them) and
//!    `O(k log k)` to order the result
//! 3. **All rows**: `O(n² × d)`, parallel over rows with rayon
//!
//! ## Ties
//! smartcore keeps whichever of two equidistant points its heap saw first.
//! The radius query collects all points tied at the boundary, and the
//! result is re-sorted by distance then lower point index, so the graph is
//! the same for every thread count and every run.

use knnshap_core::distance::Metric;
use knnshap_core::error::{ShapleyError, ShapleyResult};
use knnshap_core::matrix::FeatureMatrix;
use knnshap_core::sparse::neighbour_order;

use log::{debug, info, trace};
use rayon::prelude::*;
use smartcore::algorithm::neighbour::linear_search::LinearKNNSearch;
use smartcore::error::Failed;

/// A searchable structure over the rows of a feature matrix.
pub trait NeighbourIndex<'a>: Sized + Sync {
    /// Build the index over `features` under `metric`
    fn fit(features: &'a FeatureMatrix, metric: Metric) -> ShapleyResult<Self>;

    /// Number of indexed points
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn metric(&self) -> Metric;

    /// The `k` nearest points to point `i`, excluding `i` itself, as
    /// `(index, distance)` pairs nearest first.
    fn query_row(&self, i: usize, k: usize) -> ShapleyResult<Vec<(usize, f64)>>;

    /// `query_row` for every indexed point, in point order
    fn query_all(&self, k: usize) -> ShapleyResult<Vec<Vec<(usize, f64)>>> {
        let n = self.len();
        if k >= n {
            return Err(ShapleyError::index(format!(
                "expected k < number of indexed points (k neighbours other than the point \
                 itself), got k={k}, n={n}"
            )));
        }
        info!("Querying {} neighbours for {} points", k, n);
        let rows = (0..n)
            .into_par_iter()
            .map(|i| self.query_row(i, k))
            .collect::<ShapleyResult<Vec<_>>>()?;
        debug!("Collected neighbour rows for {} points", rows.len());
        Ok(rows)
    }
}

/// Exhaustive search: every query scans every row.
pub struct LinearSearchIndex<'a> {
    features: &'a FeatureMatrix,
    search: LinearKNNSearch<&'a [f64], Metric>,
    metric: Metric,
}

fn search_error(err: Failed) -> ShapleyError {
    ShapleyError::index(format!("linear k-NN search failed: {err}"))
}

impl<'a> NeighbourIndex<'a> for LinearSearchIndex<'a> {
    fn fit(features: &'a FeatureMatrix, metric: Metric) -> ShapleyResult<Self> {
        metric.validate()?;
        if features.is_empty() {
            return Err(ShapleyError::index(
                "cannot fit a neighbour index on a zero-row feature matrix",
            ));
        }
        let search = LinearKNNSearch::new(features.rows().collect(), metric).map_err(search_error)?;
        debug!(
            "LinearSearchIndex fitted: {} points, {} features, metric={}",
            features.nrows(),
            features.ncols(),
            metric
        );
        Ok(Self {
            features,
            search,
            metric,
        })
    }

    fn len(&self) -> usize {
        self.features.nrows()
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn query_row(&self, i: usize, k: usize) -> ShapleyResult<Vec<(usize, f64)>> {
        let n = self.len();
        if i >= n {
            return Err(ShapleyError::index(format!(
                "query row {i} out of range for {n} indexed points"
            )));
        }
        if k >= n {
            return Err(ShapleyError::index(format!(
                "expected k < number of indexed points, got k={k}, n={n}"
            )));
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let query = self.features.row(i);
        // one extra: the point itself sits at distance 0
        let nearest = self.search.find(&query, k + 1).map_err(search_error)?;
        let boundary = nearest
            .iter()
            .map(|&(_, d, _)| d)
            .fold(f64::NEG_INFINITY, f64::max);

        // find_radius needs a positive radius; exact duplicates give boundary 0
        let within = self
            .search
            .find_radius(&query, boundary.max(f64::MIN_POSITIVE))
            .map_err(search_error)?;
        let mut candidates: Vec<(usize, f64)> = within
            .into_iter()
            .filter(|&(j, d, _)| j != i && d <= boundary)
            .map(|(j, d, _)| (j, d))
            .collect();

        if candidates.len() < k {
            return Err(ShapleyError::index(format!(
                "row {i}: only {} comparable neighbours, expected {k}",
                candidates.len()
            )));
        }
        candidates.sort_unstable_by(neighbour_order);
        candidates.truncate(k);

        trace!("row {}: neighbours {:?}", i, candidates);
        Ok(candidates)
    }
}
