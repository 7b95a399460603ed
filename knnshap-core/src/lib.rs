//! Data model for KNN-Shapley data valuation.
//!
//! - [`matrix`]: row-major feature matrix
//! - [`sparse`]: fixed-width CSR k-nearest-neighbour graph
//! - [`distance`]: metrics understood by the neighbour search
//! - [`preflight`]: checks run on features before indexing
//! - [`error`]: `ShapleyError` and `ShapleyResult`

pub mod distance;
pub mod error;
pub mod matrix;
pub mod preflight;
pub mod sparse;

pub use distance::Metric;
pub use error::{ShapleyError, ShapleyResult};
pub use matrix::FeatureMatrix;
pub use sparse::KnnGraph;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub(crate) fn init() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("debug");
        let _ = env_logger::Builder::from_env(env).is_test(true).try_init();
    });
}
