//! Error types for the repository and the comparison engine

use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use std::path::PathBuf;

/// A measurement row that violates the data model.
///
/// Raised as soon as the offending record is seen; never coerced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("test `{test_name}`: {field} must be non-negative, got {value}")]
    NegativeMetric {
        test_name: String,
        field: &'static str,
        value: f64,
    },

    #[error("test `{test_name}`: {field} is not a finite number")]
    NonFiniteMetric {
        test_name: String,
        field: &'static str,
    },

    #[error("test `{test_name}`: unknown query type `{tag}`, expected BAD or OPTIMIZED")]
    UnknownVariant { test_name: String, tag: String },
}

/// Everything else that can go wrong between the data source and the sink.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to open {}: {}", .path.display(), .source)]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] ArrowError),

    #[error(transparent)]
    Parquet(#[from] ParquetError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("column {0} not found")]
    MissingColumn(String),

    #[error("column {column} has unexpected type after cast")]
    ColumnType { column: String },

    #[error("column {column} is null at row {row}")]
    NullValue { column: String, row: usize },

    #[error("column {column} has non-integral value {value} at row {row}")]
    NonIntegral {
        column: String,
        row: usize,
        value: f64,
    },

    #[error("unsupported file extension: {}", .0.display())]
    UnknownFormat(PathBuf),

    #[error("chart rendering failed: {0}")]
    Chart(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
