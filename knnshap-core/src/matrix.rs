// knnshap-core/src/matrix.rs
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::{Array, ArrayView1};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{ShapleyError, ShapleyResult};

/// Row-major `N × D` feature matrix. One row per data point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl FeatureMatrix {
    pub fn new(data: Vec<f64>, nrows: usize, ncols: usize) -> ShapleyResult<Self> {
        if data.len() != nrows * ncols {
            return Err(ShapleyError::invalid(
                "features",
                format!("{} values", data.len()),
                format!("{nrows} rows × {ncols} columns = {} values", nrows * ncols),
            ));
        }
        Ok(Self { data, nrows, ncols })
    }

    /// Factory from nested rows (e.g. a parsed dataset). Rows must share a width.
    pub fn from_rows(rows: &[Vec<f64>]) -> ShapleyResult<Self> {
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * ncols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(ShapleyError::invalid(
                    "features",
                    format!("row {i} with {} columns", row.len()),
                    format!("{ncols} columns like row 0"),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            nrows: rows.len(),
            ncols,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.ncols..(i + 1) * self.ncols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics, zero-width rows still count as rows
        (0..self.nrows).map(move |i| self.row(i))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// L2 norm of every row
    pub fn row_norms(&self) -> Vec<f64> {
        self.rows().map(|r| r.norm2()).collect()
    }

    /// Reorder rows: row `i` of the result is row `order[i]` of `self`.
    pub fn select_rows(&self, order: &[usize]) -> ShapleyResult<Self> {
        let mut data = Vec::with_capacity(order.len() * self.ncols);
        for &i in order {
            if i >= self.nrows {
                return Err(ShapleyError::invalid(
                    "order",
                    i,
                    format!("row index < {}", self.nrows),
                ));
            }
            data.extend_from_slice(self.row(i));
        }
        Self::new(data, order.len(), self.ncols)
    }

    pub fn to_dense_matrix(&self) -> ShapleyResult<DenseMatrix<f64>> {
        let rows: Vec<Vec<f64>> = self.rows().map(|r| r.to_vec()).collect();
        DenseMatrix::from_2d_vec(&rows)
            .map_err(|e| ShapleyError::invalid("features", e, "a non-empty rectangular matrix"))
    }
}

impl From<&DenseMatrix<f64>> for FeatureMatrix {
    fn from(dense: &DenseMatrix<f64>) -> Self {
        let (nrows, ncols) = dense.shape();
        let mut data = Vec::with_capacity(nrows * ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                data.push(*dense.get((i, j)));
            }
        }
        Self { data, nrows, ncols }
    }
}
