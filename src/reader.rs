//! Benchmark table reader with column projection
//!
//! The measurement repository is an export of the `QueryBenchmarks` table,
//! stored as Parquet or CSV. Only the columns the comparison needs are read.

use arrow::array::{Array, RecordBatch};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatchReader;
use arrow_schema::Schema;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use std::fs::File;
use std::io::Seek;
use std::sync::Arc;
use tracing::debug;

use crate::config::{RepositoryConfig, SourceFormat};
use crate::error::{Error, Result};
use crate::record::MeasurementRecord;
use crate::utils::{
    get_f64_column, get_i64_column, get_string_column, get_timestamp_column, require_value,
};

pub const TEST_NAME: &str = "TestName";
pub const QUERY_TYPE: &str = "QueryType";
pub const LOGICAL_READS: &str = "LogicalReads";
pub const CPU_TIME_MS: &str = "CPUTimeMs";
pub const ELAPSED_TIME_MS: &str = "ElapsedTimeMs";
pub const ROWS_RETURNED: &str = "RowsReturned";
pub const TEST_DATE: &str = "TestDate";

/// Columns we need from the benchmark table
pub const REQUIRED_COLUMNS: &[&str] = &[
    TEST_NAME,
    QUERY_TYPE,
    LOGICAL_READS,
    CPU_TIME_MS,
    ELAPSED_TIME_MS,
    ROWS_RETURNED,
    TEST_DATE,
];

/// Rows sampled when inferring a CSV schema
const CSV_INFER_ROWS: usize = 1000;

fn projection_indices(schema: &Schema) -> Result<Vec<usize>> {
    REQUIRED_COLUMNS
        .iter()
        .map(|col_name| {
            schema
                .fields()
                .iter()
                .position(|f| f.name() == *col_name)
                .ok_or_else(|| Error::MissingColumn(col_name.to_string()))
        })
        .collect()
}

/// Open the configured source and return an iterator over projected batches
pub fn read_benchmarks(config: &RepositoryConfig) -> Result<BenchmarkReader> {
    let file = File::open(&config.source).map_err(|source| Error::Open {
        path: config.source.clone(),
        source,
    })?;

    let reader = match config.format {
        SourceFormat::Parquet => open_parquet(file, config.batch_size)?,
        SourceFormat::Csv => open_csv(file, config.batch_size)?,
    };

    debug!(
        source = %config.source.display(),
        format = ?config.format,
        columns = reader.schema.fields().len(),
        "opened benchmark source"
    );

    Ok(reader)
}

fn open_parquet(file: File, batch_size: usize) -> Result<BenchmarkReader> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let projection_indices = projection_indices(builder.schema())?;
    let projection = ProjectionMask::roots(builder.parquet_schema(), projection_indices);

    let reader = builder
        .with_projection(projection)
        .with_batch_size(batch_size)
        .build()?;

    Ok(BenchmarkReader {
        schema: reader.schema(),
        inner: Box::new(reader),
    })
}

fn open_csv(mut file: File, batch_size: usize) -> Result<BenchmarkReader> {
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(CSV_INFER_ROWS))?;
    file.rewind()?;

    let projection_indices = projection_indices(&schema)?;
    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .with_batch_size(batch_size)
        .with_projection(projection_indices)
        .build(file)?;

    Ok(BenchmarkReader {
        schema: reader.schema(),
        inner: Box::new(reader),
    })
}

pub struct BenchmarkReader {
    inner: Box<dyn Iterator<Item = std::result::Result<RecordBatch, ArrowError>>>,
    schema: SchemaRef,
}

impl Iterator for BenchmarkReader {
    type Item = std::result::Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl BenchmarkReader {
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Turn one projected batch into measurement records.
///
/// Null test names, tags or metrics are rejected; a null `TestDate` just
/// leaves `captured_at` empty.
pub fn decode_batch(batch: &RecordBatch) -> Result<Vec<MeasurementRecord>> {
    let test_name = get_string_column(batch, TEST_NAME)?;
    let query_type = get_string_column(batch, QUERY_TYPE)?;
    let logical_reads = get_i64_column(batch, LOGICAL_READS)?;
    let cpu_time = get_f64_column(batch, CPU_TIME_MS)?;
    let elapsed_time = get_f64_column(batch, ELAPSED_TIME_MS)?;
    let rows_returned = get_i64_column(batch, ROWS_RETURNED)?;
    let test_date = get_timestamp_column(batch, TEST_DATE)?;

    let mut records = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        require_value(&test_name, TEST_NAME, row)?;
        require_value(&query_type, QUERY_TYPE, row)?;
        require_value(&logical_reads, LOGICAL_READS, row)?;
        require_value(&cpu_time, CPU_TIME_MS, row)?;
        require_value(&elapsed_time, ELAPSED_TIME_MS, row)?;
        require_value(&rows_returned, ROWS_RETURNED, row)?;

        records.push(MeasurementRecord {
            test_name: test_name.value(row).to_string(),
            query_type: query_type.value(row).to_string(),
            logical_reads: logical_reads.value(row),
            cpu_time_ms: cpu_time.value(row),
            elapsed_time_ms: elapsed_time.value(row),
            rows_returned: rows_returned.value(row),
            captured_at: if test_date.is_null(row) {
                None
            } else {
                test_date.value_as_datetime(row)
            },
        });
    }

    Ok(records)
}
