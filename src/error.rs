//! Error types for exprkit

use thiserror::Error;

/// Main error type for matrix, statistics and model-fitting operations
///
/// Structural problems (bad shapes, unknown names, bad arguments) are raised
/// immediately. Data-quality degeneracies inside a single row of a batch
/// computation are not errors: they surface as NaN outputs for that row.
#[derive(Error, Debug)]
pub enum ExprError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: String, got: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("Format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("Empty data: {reason}")]
    EmptyData { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ExprError {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        ExprError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_range(reason: impl Into<String>) -> Self {
        ExprError::InvalidRange {
            reason: reason.into(),
        }
    }

    pub(crate) fn dimension_mismatch(expected: impl Into<String>, got: impl Into<String>) -> Self {
        ExprError::DimensionMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }
}

/// Result type alias for exprkit operations
pub type Result<T> = std::result::Result<T, ExprError>;
