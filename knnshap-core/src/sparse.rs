// knnshap-core/src/sparse.rs
//! Sparse k-nearest-neighbour graph in CSR layout.
//!
//! Every row stores exactly `k` entries ordered nearest first, so the
//! `indices` buffer doubles as the flat `N × k` neighbour array: row `i`
//! occupies `indices[i*k..(i+1)*k]`. `data` keeps the distances for callers
//! that want them; scoring only needs the order.

use std::cmp::Ordering;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use crate::error::{ShapleyError, ShapleyResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnnGraph {
    indptr: Vec<usize>,  // [n_nodes + 1]
    indices: Vec<usize>, // [n_nodes * k]
    data: Vec<f64>,      // [n_nodes * k]
    n_nodes: usize,
    k: usize,
}

/// Ascending distance, lower index first on ties
pub fn neighbour_order(a: &(usize, f64), b: &(usize, f64)) -> Ordering {
    a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0))
}

impl KnnGraph {
    /// Build from per-row `(neighbour, distance)` lists.
    ///
    /// Each row is sorted nearest first (ties broken by lower index), all
    /// rows must have the same length, and the result is validated.
    pub fn from_rows(rows: Vec<Vec<(usize, f64)>>) -> ShapleyResult<Self> {
        let n_nodes = rows.len();
        let k = rows.first().map(|r| r.len()).unwrap_or(0);

        let mut indptr = Vec::with_capacity(n_nodes + 1);
        let mut indices = Vec::with_capacity(n_nodes * k);
        let mut data = Vec::with_capacity(n_nodes * k);
        indptr.push(0);

        for (i, mut row) in rows.into_iter().enumerate() {
            if row.len() != k {
                return Err(ShapleyError::invalid(
                    "knn_graph",
                    format!("row {i} with {} neighbours", row.len()),
                    format!("{k} neighbours in every row"),
                ));
            }
            row.sort_by(neighbour_order);
            for (j, d) in row {
                indices.push(j);
                data.push(d);
            }
            indptr.push(indices.len());
        }

        let graph = Self {
            indptr,
            indices,
            data,
            n_nodes,
            k,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Build from a flat, already ordered `n_nodes × k` index array.
    ///
    /// Distances are unknown here; the neighbour rank (1-based) is stored
    /// instead so that `to_csmat` keeps the ordering recoverable.
    pub fn from_indices(indices: Vec<usize>, n_nodes: usize, k: usize) -> ShapleyResult<Self> {
        if indices.len() != n_nodes * k {
            return Err(ShapleyError::invalid(
                "knn_graph",
                format!("{} indices", indices.len()),
                format!("{n_nodes} rows × {k} neighbours = {}", n_nodes * k),
            ));
        }
        let indptr = (0..=n_nodes).map(|i| i * k).collect();
        let data = (0..n_nodes)
            .flat_map(|_| (1..=k).map(|rank| rank as f64))
            .collect();

        let graph = Self {
            indptr,
            indices,
            data,
            n_nodes,
            k,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Import a square CSR distance graph (rows = query, cols = neighbour).
    ///
    /// sprs keeps columns sorted by index, so each row is re-ordered by the
    /// stored distance before use.
    pub fn from_csmat(matrix: &CsMat<f64>) -> ShapleyResult<Self> {
        let (rows, cols) = matrix.shape();
        if rows != cols {
            return Err(ShapleyError::invalid(
                "knn_graph",
                format!("{rows}×{cols} matrix"),
                "a square N×N matrix",
            ));
        }
        let csr;
        let matrix = if matrix.is_csr() {
            matrix
        } else {
            csr = matrix.to_csr();
            &csr
        };

        let neighbour_rows: Vec<Vec<(usize, f64)>> = matrix
            .outer_iterator()
            .map(|row| row.iter().map(|(j, &d)| (j, d)).collect())
            .collect();

        debug!(
            "Importing CSR neighbour graph: {} nodes, {} stored entries",
            rows,
            matrix.nnz()
        );
        Self::from_rows(neighbour_rows)
    }

    /// Export as an sprs CSR matrix with distances as values
    pub fn to_csmat(&self) -> CsMat<f64> {
        let mut triplets = TriMat::with_capacity((self.n_nodes, self.n_nodes), self.indices.len());
        for i in 0..self.n_nodes {
            for (j, d) in self.row(i).iter().zip(self.distances(i)) {
                triplets.add_triplet(i, *j, *d);
            }
        }
        triplets.to_csr()
    }

    /// Check structural invariants: `1 <= k <= n_nodes`, indices in range,
    /// no self-loops and no repeated neighbour within a row.
    pub fn validate(&self) -> ShapleyResult<()> {
        if self.k == 0 {
            return Err(ShapleyError::invalid("k", 0, "k >= 1 neighbours per row"));
        }
        if self.k > self.n_nodes {
            return Err(ShapleyError::invalid(
                "k",
                self.k,
                format!("k <= number of points N={}", self.n_nodes),
            ));
        }

        // layout: fixed-width rows, checked before any row is sliced
        let expected = self.n_nodes * self.k;
        if self.indices.len() != expected
            || self.data.len() != expected
            || self.indptr.len() != self.n_nodes + 1
            || self.indptr.iter().enumerate().any(|(i, &p)| p != i * self.k)
        {
            return Err(ShapleyError::invalid(
                "knn_graph",
                format!(
                    "{} indptr / {} indices / {} distances",
                    self.indptr.len(),
                    self.indices.len(),
                    self.data.len()
                ),
                format!("a CSR layout with {} rows of {} entries", self.n_nodes, self.k),
            ));
        }

        let mut seen = vec![usize::MAX; self.n_nodes];
        for i in 0..self.n_nodes {
            for &j in self.row(i) {
                if j >= self.n_nodes {
                    return Err(ShapleyError::invalid(
                        "knn_graph",
                        format!("neighbour {j} in row {i}"),
                        format!("index < {}", self.n_nodes),
                    ));
                }
                if j == i {
                    return Err(ShapleyError::invalid(
                        "knn_graph",
                        format!("self-loop in row {i}"),
                        "neighbours other than the point itself",
                    ));
                }
                if seen[j] == i {
                    return Err(ShapleyError::invalid(
                        "knn_graph",
                        format!("neighbour {j} repeated in row {i}"),
                        "distinct neighbours within a row",
                    ));
                }
                seen[j] = i;
            }
        }
        trace!("KnnGraph valid: {} nodes, k={}", self.n_nodes, self.k);
        Ok(())
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Number of neighbours stored per row
    pub fn row_width(&self) -> usize {
        self.k
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// Neighbour indices of node `i`, nearest first
    pub fn row(&self, i: usize) -> &[usize] {
        &self.indices[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Stored distances of node `i`, aligned with `row(i)`
    pub fn distances(&self, i: usize) -> &[f64] {
        &self.data[self.indptr[i]..self.indptr[i + 1]]
    }

    /// The flat `n_nodes × k` neighbour array
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// How many rows list each node as a neighbour
    pub fn in_degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0usize; self.n_nodes];
        for &j in &self.indices {
            degrees[j] += 1;
        }
        degrees
    }

    /// Same graph with node ids relabelled: node `i` becomes `mapping[i]`.
    /// Row order is kept as stored, so ties are not re-broken.
    pub fn permuted(&self, mapping: &[usize]) -> ShapleyResult<Self> {
        if mapping.len() != self.n_nodes {
            return Err(ShapleyError::invalid(
                "mapping",
                format!("{} entries", mapping.len()),
                format!("{} entries", self.n_nodes),
            ));
        }
        let mut taken = vec![false; self.n_nodes];
        for &target in mapping {
            if target >= self.n_nodes || taken[target] {
                return Err(ShapleyError::invalid(
                    "mapping",
                    target,
                    format!("a permutation of 0..{}", self.n_nodes),
                ));
            }
            taken[target] = true;
        }

        let mut indices = vec![0usize; self.indices.len()];
        let mut data = vec![0.0; self.data.len()];
        for i in 0..self.n_nodes {
            let start = mapping[i] * self.k;
            for (offset, (&j, &d)) in self.row(i).iter().zip(self.distances(i)).enumerate() {
                indices[start + offset] = mapping[j];
                data[start + offset] = d;
            }
        }

        Ok(Self {
            indptr: self.indptr.clone(),
            indices,
            data,
            n_nodes: self.n_nodes,
            k: self.k,
        })
    }

    pub fn sparsity(&self) -> f64 {
        if self.n_nodes == 0 {
            return 1.0;
        }
        1.0 - (self.nnz() as f64) / (self.n_nodes * self.n_nodes) as f64
    }
}
