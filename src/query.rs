//! Orchestration - ties the benchmark source to the comparison engine

use tracing::debug;

use crate::aggregator::{build_summary, pivot_metric, ComparisonRow, Metric, MetricPivot};
use crate::config::RepositoryConfig;
use crate::error::Result;
use crate::filter::apply_test_name_filter;
use crate::reader::{decode_batch, read_benchmarks};
use crate::record::MeasurementRecord;

/// Fetch every measurement, optionally only for tests whose name contains
/// `name_filter` (case-insensitive).
///
/// Rows come back ordered by test name, then query type, the order the
/// benchmark table is queried in.
pub fn fetch_records(
    config: &RepositoryConfig,
    name_filter: Option<&str>,
) -> Result<Vec<MeasurementRecord>> {
    let reader = read_benchmarks(config)?;
    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result?;

        if batch.num_rows() == 0 {
            continue;
        }

        let batch = match name_filter {
            Some(needle) => apply_test_name_filter(&batch, needle)?,
            None => batch,
        };
        if batch.num_rows() == 0 {
            continue;
        }

        debug!(rows = batch.num_rows(), "decoding benchmark batch");
        records.extend(decode_batch(&batch)?);
    }

    records.sort_by(|a, b| {
        a.test_name
            .cmp(&b.test_name)
            .then_with(|| a.query_type.cmp(&b.query_type))
    });

    Ok(records)
}

/// Load the benchmark table and build the before/after summary
pub fn summarize(config: &RepositoryConfig) -> Result<Vec<ComparisonRow>> {
    let records = fetch_records(config, None)?;
    Ok(build_summary(&records)?)
}

/// Mean logical reads and elapsed time per test for one module
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModulePivots {
    pub logical_reads: MetricPivot,
    pub elapsed_time: MetricPivot,
}

impl ModulePivots {
    /// Pivot already-fetched records for the module chart
    pub fn from_records(records: &[MeasurementRecord], module: &str) -> Result<Self> {
        Ok(Self {
            logical_reads: pivot_metric(records, module, Metric::LogicalReads)?,
            elapsed_time: pivot_metric(records, module, Metric::ElapsedTimeMs)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.logical_reads.is_empty()
    }
}

/// Load only the module's rows and pivot them
pub fn module_pivots(config: &RepositoryConfig, module: &str) -> Result<ModulePivots> {
    let records = fetch_records(config, Some(module))?;
    ModulePivots::from_records(&records, module)
}
