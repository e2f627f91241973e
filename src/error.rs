//! Error type shared by every engine entry point.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A required non-empty input was empty.
    #[error("no {what} provided")]
    EmptyInput { what: &'static str },

    #[error("{field} of '{id}' must be non-negative, got {value}")]
    NegativeValue {
        field: &'static str,
        id: String,
        value: f64,
    },

    #[error("{field} of '{id}' is not a finite number")]
    NonFiniteValue { field: &'static str, id: String },

    #[error("coordinate of '{id}' is out of range: ({lat}, {lng})")]
    InvalidCoordinate { id: String, lat: f64, lng: f64 },

    /// Weighted averaging over points whose weights sum to zero.
    #[error("total weight is zero; a weighted center is undefined")]
    ZeroTotalWeight,

    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("unknown {kind} '{id}'")]
    UnknownReference { kind: &'static str, id: String },

    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("unknown distance metric '{0}'")]
    UnknownMetric(String),
}
