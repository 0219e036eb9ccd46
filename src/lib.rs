//! Before/after SQL query benchmark comparison
//!
//! Reads an exported benchmark table, pairs the baseline and optimized run of
//! every test, and reports improvement percentages and speedups as a table,
//! SVG bar charts and optional exports.

pub mod aggregator;
pub mod chart;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod query;
pub mod reader;
pub mod record;
pub mod report;
pub mod utils;

pub use aggregator::{build_summary, pivot_metric, ComparisonRow, Metric, MetricPivot};
pub use config::{OutputConfig, RepositoryConfig, SourceFormat};
pub use error::{Error, Result, ValidationError};
pub use record::{MeasurementRecord, QueryVariant};
