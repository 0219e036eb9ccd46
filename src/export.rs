//! Optional export of the summary table

use arrow::array::{Float64Array, RecordBatch, StringArray, UInt64Array};
use arrow::csv::Writer as CsvWriter;
use arrow_schema::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::aggregator::ComparisonRow;
use crate::error::{Error, Result};

/// Summary rows as an Arrow batch, one row per compared test
pub fn summary_to_batch(rows: &[ComparisonRow]) -> Result<RecordBatch> {
    let schema = Schema::new(vec![
        Field::new("Module", DataType::Utf8, false),
        Field::new("Before", DataType::UInt64, false),
        Field::new("After", DataType::UInt64, false),
        Field::new("ImprovementPct", DataType::Float64, false),
        Field::new("Speedup", DataType::Float64, false),
    ]);

    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.test_name.as_str()))),
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.before_reads))),
            Arc::new(UInt64Array::from_iter_values(rows.iter().map(|r| r.after_reads))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.improvement_pct))),
            Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.speedup_factor))),
        ],
    )?;
    Ok(batch)
}

/// Write the summary to `path`; `.csv`, `.parquet` and `.json` are supported
pub fn export_summary(rows: &[ComparisonRow], path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("csv") => {
            let batch = summary_to_batch(rows)?;
            let mut writer = CsvWriter::new(create(path)?);
            writer.write(&batch)?;
        }
        Some("parquet") => {
            let batch = summary_to_batch(rows)?;
            let mut writer = ArrowWriter::try_new(create(path)?, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
        Some("json") => {
            serde_json::to_writer_pretty(BufWriter::new(create(path)?), rows)?;
        }
        _ => return Err(Error::UnknownFormat(path.to_path_buf())),
    }

    info!(path = %path.display(), rows = rows.len(), "summary exported");
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })
}
