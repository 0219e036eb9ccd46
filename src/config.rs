//! Explicit configuration for the measurement source and the output sink

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Rows per record batch when reading the benchmark table
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// On-disk format of the exported `QueryBenchmarks` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Parquet,
    Csv,
}

impl SourceFormat {
    /// Guess the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("parquet") | Some("pq") => Ok(SourceFormat::Parquet),
            Some("csv") => Ok(SourceFormat::Csv),
            _ => Err(Error::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Where measurements come from and how to read them
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub source: PathBuf,
    pub format: SourceFormat,
    pub batch_size: usize,
}

impl RepositoryConfig {
    /// Config for `source`, format taken from its extension
    pub fn new(source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let format = SourceFormat::from_path(&source)?;
        Ok(Self {
            source,
            format,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_format(mut self, format: SourceFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Where rendered charts and exports go
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub charts: bool,
    pub export: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            charts: true,
            export: None,
        }
    }
}
