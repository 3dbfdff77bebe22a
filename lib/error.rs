//! Error types for model declaration and matrix assembly.
//!
//! Invalid local operator actions are *not* errors; they are the algebraic
//! zero and are skipped silently wherever they occur.

use std::sync::Arc;
use thiserror::Error;

/// Fatal problems with how a model was declared or how assembly was
/// requested.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("subsystem dimension must be at least 1")]
    ZeroDimension,

    #[error("no subsystems have been declared")]
    NoSubsystems,

    #[error("total dimension overflows usize")]
    DimensionOverflow,

    #[error("subsystem {index} was not declared in this space")]
    ForeignSubsystem { index: usize },

    #[error("operator kind {kind} is not defined on a subsystem of dimension {dim}")]
    InvalidKind { kind: String, dim: usize },

    #[error("dissipator rate must be finite and non-negative, got {0}")]
    InvalidRate(f64),

    #[error("term coefficient must be finite, got {0}")]
    InvalidCoefficient(f64),

    #[error("no {0} terms have been added")]
    NoTerms(&'static str),

    #[error("dense assembly of dimension {dim} exceeds the limit of {limit}")]
    DenseTooLarge { dim: usize, limit: usize },

    #[error("workers assembled from divergent term sets")]
    DivergentTerms,

    #[error("invalid worker layout: rank {rank} of {size}")]
    InvalidWorkers { rank: usize, size: usize },

    #[error("invalid initial population {level} for subsystem {index} of dimension {dim}")]
    InvalidPopulation { index: usize, level: usize, dim: usize },

    #[error("could not parse configuration: {0}")]
    Parse(String),
}

/// Errors raised by the sparse matrix container.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatrixError {
    #[error("row {row} is not owned by this worker (owns {start}..{end})")]
    RowNotOwned { row: usize, start: usize, end: usize },

    #[error("column {col} out of range for dimension {dim}")]
    ColumnOutOfRange { col: usize, dim: usize },

    #[error("matrix has already been finalized")]
    Finalized,

    #[error("matrix has not been finalized")]
    NotFinalized,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("row ranges are not contiguous at row {0}")]
    NonContiguous(usize),
}

/// Top-level error type.
#[derive(Debug, Error, Clone)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("matrix error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("i/o error: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self { Self::Io(Arc::new(err)) }
}

// i/o errors compare by kind only
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Config(l), Self::Config(r)) => l == r,
            (Self::Matrix(l), Self::Matrix(r)) => l == r,
            (Self::Io(l), Self::Io(r)) => l.kind() == r.kind(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn io_errors_keep_their_source() {
        let err: Error = std::io::Error::new(
            std::io::ErrorKind::NotFound, "no such file").into();
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "no such file");
        assert_eq!(err.clone(), err);
        assert_ne!(err, Error::Matrix(MatrixError::Finalized));
    }
}
