// knnshap-core/src/error.rs
//! Error taxonomy shared by the graph provider and the scorer.
//!
//! Two kinds of failure exist:
//! - the caller asked for something inconsistent (`InvalidParameter`)
//! - the neighbour search could not be built or queried (`UnderlyingIndex`)
//!
//! Neither is retried: every computation downstream is deterministic.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapleyError {
    /// Insufficient or contradictory input, reported before any work starts.
    #[error("invalid parameter `{name}` = {value}: expected {expected}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: String,
    },

    /// The neighbour-search backend refused the input.
    #[error("neighbour index error: {0}")]
    UnderlyingIndex(String),
}

impl ShapleyError {
    pub fn invalid(
        name: &'static str,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        ShapleyError::InvalidParameter {
            name,
            value: value.to_string(),
            expected: expected.into(),
        }
    }

    pub fn index(msg: impl Into<String>) -> Self {
        ShapleyError::UnderlyingIndex(msg.into())
    }

    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, ShapleyError::InvalidParameter { .. })
    }
}

pub type ShapleyResult<T> = Result<T, ShapleyError>;
