// knnshap-core/src/preflight.rs
//! Preflight stage: check a feature matrix before a neighbour index is built
//!
//! - Empty matrices and non-finite values are rejected: no neighbour
//!   ordering exists over them
//! - Zero-norm rows are flagged (cosine distance is degenerate there)
//! - Exact duplicate rows are flagged (their neighbour order is decided
//!   by tie-breaking alone)

use std::collections::HashMap;

use smartcore::linalg::basic::arrays::ArrayView1;

use crate::error::{ShapleyError, ShapleyResult};
use crate::matrix::FeatureMatrix;

/// Configuration for the preflight stage
#[derive(Debug, Clone)]
pub struct PreflightConfig {
    /// Fail on NaN / ±inf instead of only reporting them (default: true)
    pub reject_non_finite: bool,

    /// Hash every row to find exact duplicates (default: true)
    pub detect_duplicates: bool,

    /// Norm under which a row counts as zero (default: 1e-12)
    pub zero_norm_eps: f64,
}

impl Default for PreflightConfig {
    fn default() -> Self {
        Self {
            reject_non_finite: true,
            detect_duplicates: true,
            zero_norm_eps: 1e-12,
        }
    }
}

impl PreflightConfig {
    /// Only the checks that can fail; skips duplicate hashing on large inputs
    pub fn fast() -> Self {
        Self {
            detect_duplicates: false,
            ..Self::default()
        }
    }
}

/// Output of the preflight stage
#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    pub nrows: usize,
    pub ncols: usize,
    /// Rows containing NaN or infinite values (only when not rejected)
    pub non_finite_rows: Vec<usize>,
    /// Rows with (near) zero L2 norm
    pub zero_norm_rows: Vec<usize>,
    /// Groups of identical rows, each sorted ascending
    pub duplicate_groups: Vec<Vec<usize>>,
}

impl PreflightReport {
    pub fn is_clean(&self) -> bool {
        self.non_finite_rows.is_empty()
            && self.zero_norm_rows.is_empty()
            && self.duplicate_groups.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Preflight: {}×{}, non_finite={}, zero_norm={}, duplicate_groups={}",
            self.nrows,
            self.ncols,
            self.non_finite_rows.len(),
            self.zero_norm_rows.len(),
            self.duplicate_groups.len()
        )
    }
}

/// Preflight stage executor
pub struct PreflightStage {
    config: PreflightConfig,
}

impl PreflightStage {
    pub fn new(config: PreflightConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PreflightConfig::default())
    }

    pub fn execute(&self, features: &FeatureMatrix) -> ShapleyResult<PreflightReport> {
        let (nrows, ncols) = features.shape();
        log::debug!("Preflight over {} rows × {} features", nrows, ncols);

        if nrows == 0 {
            return Err(ShapleyError::index(
                "cannot build a neighbour index over a zero-row feature matrix",
            ));
        }
        if ncols == 0 {
            return Err(ShapleyError::index(
                "cannot build a neighbour index over zero-width feature rows",
            ));
        }

        let mut report = PreflightReport {
            nrows,
            ncols,
            ..Default::default()
        };

        for (i, row) in features.rows().enumerate() {
            if row.iter().any(|v| !v.is_finite()) {
                if self.config.reject_non_finite {
                    return Err(ShapleyError::index(format!(
                        "row {i} contains non-finite values"
                    )));
                }
                report.non_finite_rows.push(i);
                continue;
            }
            let norm = row.norm2();
            if norm < self.config.zero_norm_eps {
                report.zero_norm_rows.push(i);
            }
        }

        if self.config.detect_duplicates {
            report.duplicate_groups = self.detect_duplicates(features);
        }

        if !report.non_finite_rows.is_empty() {
            log::warn!("{} rows contain non-finite values", report.non_finite_rows.len());
        }
        if !report.zero_norm_rows.is_empty() {
            log::warn!(
                "{} zero-norm rows: cosine distance treats them as orthogonal to everything",
                report.zero_norm_rows.len()
            );
        }
        if !report.duplicate_groups.is_empty() {
            log::warn!(
                "{} groups of identical rows: their neighbour order depends on tie-breaking",
                report.duplicate_groups.len()
            );
        }
        log::debug!("{}", report.summary());

        Ok(report)
    }

    /// Exact-duplicate detection keyed on the bit pattern of each row
    fn detect_duplicates(&self, features: &FeatureMatrix) -> Vec<Vec<usize>> {
        let mut groups: HashMap<Vec<u64>, Vec<usize>> = HashMap::new();
        for (i, row) in features.rows().enumerate() {
            // +0.0 and -0.0 compare equal, so normalise the sign of zero
            let key = row
                .iter()
                .map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
                .collect();
            groups.entry(key).or_default().push(i);
        }

        let mut duplicates: Vec<Vec<usize>> =
            groups.into_values().filter(|g| g.len() > 1).collect();
        duplicates.sort_by_key(|g| g[0]);
        duplicates
    }
}
