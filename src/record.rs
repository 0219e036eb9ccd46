//! Raw benchmark rows and the two query variants they compare

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Which side of a before/after pair a measurement belongs to.
///
/// Ordered so that `Baseline` sorts ahead of `Optimized`, matching the
/// `BAD` < `OPTIMIZED` order of the source tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum QueryVariant {
    Baseline,
    Optimized,
}

impl QueryVariant {
    pub const ALL: [QueryVariant; 2] = [QueryVariant::Baseline, QueryVariant::Optimized];

    /// Tag written by the benchmark harness
    pub fn tag(self) -> &'static str {
        match self {
            QueryVariant::Baseline => "BAD",
            QueryVariant::Optimized => "OPTIMIZED",
        }
    }

    /// Legend text used by the charts
    pub fn label(self) -> &'static str {
        match self {
            QueryVariant::Baseline => "Bad Query",
            QueryVariant::Optimized => "Optimized",
        }
    }
}

impl fmt::Display for QueryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for QueryVariant {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.eq_ignore_ascii_case("BAD") || tag.eq_ignore_ascii_case("BASELINE") {
            Ok(QueryVariant::Baseline)
        } else if tag.eq_ignore_ascii_case("OPTIMIZED") {
            Ok(QueryVariant::Optimized)
        } else {
            Err(())
        }
    }
}

/// One observed run of a query variant, exactly as the repository returned it.
///
/// Metrics are kept signed so malformed rows survive decoding and can be
/// rejected by [`MeasurementRecord::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub test_name: String,
    pub query_type: String,
    pub logical_reads: i64,
    pub cpu_time_ms: f64,
    pub elapsed_time_ms: f64,
    pub rows_returned: i64,
    pub captured_at: Option<NaiveDateTime>,
}

impl MeasurementRecord {
    /// Build a record with only the fields the summary cares about.
    /// Durations and row count start at zero.
    pub fn new(
        test_name: impl Into<String>,
        query_type: impl Into<String>,
        logical_reads: i64,
    ) -> Self {
        Self {
            test_name: test_name.into(),
            query_type: query_type.into(),
            logical_reads,
            cpu_time_ms: 0.0,
            elapsed_time_ms: 0.0,
            rows_returned: 0,
            captured_at: None,
        }
    }

    pub fn with_times(mut self, cpu_time_ms: f64, elapsed_time_ms: f64) -> Self {
        self.cpu_time_ms = cpu_time_ms;
        self.elapsed_time_ms = elapsed_time_ms;
        self
    }

    pub fn with_rows(mut self, rows_returned: i64) -> Self {
        self.rows_returned = rows_returned;
        self
    }

    pub fn with_captured_at(mut self, captured_at: NaiveDateTime) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    /// Check the record against the data model and return its variant.
    pub fn validate(&self) -> Result<QueryVariant, ValidationError> {
        if self.logical_reads < 0 {
            return Err(self.negative("logical_reads", self.logical_reads as f64));
        }
        self.check_duration("cpu_time_ms", self.cpu_time_ms)?;
        self.check_duration("elapsed_time_ms", self.elapsed_time_ms)?;
        if self.rows_returned < 0 {
            return Err(self.negative("rows_returned", self.rows_returned as f64));
        }

        self.query_type
            .parse()
            .map_err(|_| ValidationError::UnknownVariant {
                test_name: self.test_name.clone(),
                tag: self.query_type.clone(),
            })
    }

    fn check_duration(&self, field: &'static str, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFiniteMetric {
                test_name: self.test_name.clone(),
                field,
            });
        }
        if value < 0.0 {
            return Err(self.negative(field, value));
        }
        Ok(())
    }

    fn negative(&self, field: &'static str, value: f64) -> ValidationError {
        ValidationError::NegativeMetric {
            test_name: self.test_name.clone(),
            field,
            value,
        }
    }
}
