// knnshap-core/src/distance.rs
//! Distance metrics for neighbour search over feature rows
//!
//! [`Metric`] is a smartcore [`Distance`], so it plugs straight into
//! smartcore's neighbour search. Each variant delegates to the smartcore
//! implementation:
//! - Euclidean and squared Euclidean via `Euclidian`
//! - Cosine distance (`1 - cos θ`) via `Cosine`, with zero-norm rows at 1.0
//! - Manhattan and Minkowski via `Manhattan` / `Minkowski`
//!
//! Chebyshev is not shipped by smartcore and is provided here as
//! [`Chebyshev`].
//!
//! Metric names follow the conventional spelling used by nearest-neighbour
//! libraries, so a caller can pass `"cosine"` or `"l2"` as a plain string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::{Array, ArrayView1};
use smartcore::metrics::distance::Distance;
use smartcore::metrics::distance::cosine::Cosine;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::metrics::distance::manhattan::Manhattan;
use smartcore::metrics::distance::minkowski::Minkowski;

use crate::error::ShapleyError;

/// Norm below which a vector is treated as zero for cosine
const NORM_EPS: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Euclidean,
    SquaredEuclidean,
    Cosine,
    Manhattan,
    Chebyshev,
    /// Integer exponent `p >= 1`, as smartcore's `Minkowski`
    Minkowski(u16),
}

impl Metric {
    /// Distance between two rows of equal length
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        <Self as Distance<&[f64]>>::distance(self, &a, &b)
    }

    /// Minkowski is a metric only for p >= 1
    pub fn validate(&self) -> Result<(), ShapleyError> {
        match self {
            Metric::Minkowski(0) => {
                Err(ShapleyError::invalid("metric.p", 0, "an integer p >= 1"))
            }
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::SquaredEuclidean => "sqeuclidean",
            Metric::Cosine => "cosine",
            Metric::Manhattan => "manhattan",
            Metric::Chebyshev => "chebyshev",
            Metric::Minkowski(_) => "minkowski",
        }
    }
}

impl<A: ArrayView1<f64>> Distance<A> for Metric {
    fn distance(&self, a: &A, b: &A) -> f64 {
        match *self {
            Metric::Euclidean => Euclidian::<f64>::new().distance(a, b),
            Metric::SquaredEuclidean => {
                let d = Euclidian::<f64>::new().distance(a, b);
                d * d
            }
            Metric::Cosine => {
                if a.norm2() < NORM_EPS || b.norm2() < NORM_EPS {
                    1.0
                } else {
                    Cosine::<f64>::new().distance(a, b).clamp(0.0, 2.0)
                }
            }
            Metric::Manhattan => Manhattan::<f64>::new().distance(a, b),
            Metric::Chebyshev => Chebyshev.distance(a, b),
            // p = 0 fails validate(); smartcore panics on it
            Metric::Minkowski(p) => Minkowski::<f64>::new(p.max(1)).distance(a, b),
        }
    }
}

/// L∞ distance: the largest coordinate difference
#[derive(Clone, Copy, Debug, Default)]
pub struct Chebyshev;

impl<A: ArrayView1<f64>> Distance<A> for Chebyshev {
    fn distance(&self, a: &A, b: &A) -> f64 {
        a.iterator(0)
            .zip(b.iterator(0))
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Minkowski(p) => write!(f, "minkowski(p={p})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Metric {
    type Err = ShapleyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "sqeuclidean" => Ok(Metric::SquaredEuclidean),
            "cosine" => Ok(Metric::Cosine),
            "manhattan" | "cityblock" | "l1" => Ok(Metric::Manhattan),
            "chebyshev" | "infinity" => Ok(Metric::Chebyshev),
            "minkowski" => Ok(Metric::Minkowski(2)),
            _ => Err(ShapleyError::invalid(
                "metric",
                format!("{s:?}"),
                "one of euclidean, l2, sqeuclidean, cosine, manhattan, cityblock, l1, \
                 chebyshev, infinity, minkowski",
            )),
        }
    }
}
