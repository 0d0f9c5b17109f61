// Engine error type and its coarse classification.

use scoutlens_core::table::TableError;
use thiserror::Error;

/// Coarse failure classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request does not have the shape the operation needs: too few or
    /// too many metrics, no rows, unknown columns, bad weights.
    InputShape,
    /// The reference player is missing from the population or the pool.
    ReferenceNotFound,
    /// Every selected metric carries zero weight.
    DegenerateWeight,
}

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("insufficient metrics: at least {required} required, got {got}")]
    InsufficientMetrics { required: usize, got: usize },

    #[error("too many metrics: at most {allowed} allowed, got {got}")]
    TooManyMetrics { allowed: usize, got: usize },

    #[error("no metrics selected")]
    EmptySelection,

    #[error("no rows in {what}")]
    NoRows { what: &'static str },

    #[error("unknown metric `{0}`")]
    UnknownMetric(String),

    #[error("invalid weight {value} for metric `{metric}`")]
    InvalidWeight { metric: String, value: f64 },

    #[error("at least {required} player(s) required, got {got}")]
    TooFewPlayers { required: usize, got: usize },

    #[error("reference player `{player}` not found in the {scope}")]
    ReferenceNotFound { player: String, scope: &'static str },

    #[error("selected metrics carry no weight")]
    DegenerateWeights,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::InsufficientMetrics { .. }
            | EngineError::TooManyMetrics { .. }
            | EngineError::EmptySelection
            | EngineError::NoRows { .. }
            | EngineError::UnknownMetric(_)
            | EngineError::InvalidWeight { .. }
            | EngineError::TooFewPlayers { .. } => ErrorKind::InputShape,
            EngineError::ReferenceNotFound { .. } => ErrorKind::ReferenceNotFound,
            EngineError::DegenerateWeights => ErrorKind::DegenerateWeight,
        }
    }
}

impl From<TableError> for EngineError {
    fn from(err: TableError) -> Self {
        match err {
            TableError::UnknownMetric(key) => EngineError::UnknownMetric(key),
            // Ragged or duplicate columns cannot come out of a built table;
            // surface them under the column name anyway.
            TableError::LengthMismatch { column, .. } | TableError::DuplicateColumn(column) => {
                EngineError::UnknownMetric(column)
            }
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
