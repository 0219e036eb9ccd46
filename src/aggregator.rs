//! Before/after comparison engine
//!
//! Pairs the baseline and optimized measurement of every test, derives the
//! improvement percentage and speedup factor from logical reads, and builds
//! per-test metric pivots for the module charts.
//!
//! Groups are kept in an arena indexed by test name so output order is the
//! order in which test names were first seen, whatever order the repository
//! returned its rows in.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::record::{MeasurementRecord, QueryVariant};

/// Final summary row for one test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub test_name: String,
    pub before_reads: u64,
    pub after_reads: u64,
    pub improvement_pct: f64,
    /// `before / after`; `0.0` when the optimized run did no reads
    pub speedup_factor: f64,
}

/// The baseline and optimized record chosen for one test
#[derive(Debug)]
struct TestGroup<'a> {
    test_name: &'a str,
    baseline: Option<&'a MeasurementRecord>,
    optimized: Option<&'a MeasurementRecord>,
}

impl<'a> TestGroup<'a> {
    fn new(test_name: &'a str) -> Self {
        Self {
            test_name,
            baseline: None,
            optimized: None,
        }
    }

    /// First record seen for a variant wins; later duplicates are ignored.
    fn offer(&mut self, variant: QueryVariant, record: &'a MeasurementRecord) {
        let slot = match variant {
            QueryVariant::Baseline => &mut self.baseline,
            QueryVariant::Optimized => &mut self.optimized,
        };
        if slot.is_some() {
            debug!(
                test = self.test_name,
                variant = %variant,
                "duplicate measurement ignored, keeping the first one"
            );
            return;
        }
        *slot = Some(record);
    }

    fn compare(&self) -> Option<ComparisonRow> {
        let (Some(baseline), Some(optimized)) = (self.baseline, self.optimized) else {
            debug!(test = self.test_name, "incomplete pair skipped");
            return None;
        };

        // Both values passed validation, so the casts cannot wrap.
        let before_reads = baseline.logical_reads as u64;
        let after_reads = optimized.logical_reads as u64;
        if before_reads == 0 {
            debug!(test = self.test_name, "baseline did no reads, skipped");
            return None;
        }

        Some(ComparisonRow {
            test_name: self.test_name.to_string(),
            before_reads,
            after_reads,
            improvement_pct: improvement_pct(before_reads as f64, after_reads as f64),
            speedup_factor: speedup_factor(before_reads as f64, after_reads as f64),
        })
    }
}

/// Relative cost reduction in percent. Callers guarantee `before > 0`.
#[inline]
fn improvement_pct(before: f64, after: f64) -> f64 {
    (before - after) / before * 100.0
}

#[inline]
fn speedup_factor(before: f64, after: f64) -> f64 {
    if after > 0.0 {
        before / after
    } else {
        0.0
    }
}

/// Pair baseline and optimized measurements per test and derive their metrics.
///
/// Every record is validated first, so a malformed row fails the call even if
/// its group would have been skipped. Tests missing either side, or whose
/// baseline did zero logical reads, are left out of the result. An empty
/// result is a valid outcome.
pub fn build_summary(
    records: &[MeasurementRecord],
) -> Result<Vec<ComparisonRow>, ValidationError> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<TestGroup<'_>> = Vec::new();

    for record in records {
        let variant = record.validate()?;
        let slot = *index.entry(record.test_name.as_str()).or_insert_with(|| {
            groups.push(TestGroup::new(&record.test_name));
            groups.len() - 1
        });
        groups[slot].offer(variant, record);
    }

    let rows: Vec<ComparisonRow> = groups.iter().filter_map(|group| group.compare()).collect();

    info!(
        records = records.len(),
        tests = groups.len(),
        compared = rows.len(),
        "built comparison summary"
    );

    Ok(rows)
}

/// Measurement column a pivot can average
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    LogicalReads,
    CpuTimeMs,
    ElapsedTimeMs,
    RowsReturned,
}

impl Metric {
    pub fn value(self, record: &MeasurementRecord) -> f64 {
        match self {
            Metric::LogicalReads => record.logical_reads as f64,
            Metric::CpuTimeMs => record.cpu_time_ms,
            Metric::ElapsedTimeMs => record.elapsed_time_ms,
            Metric::RowsReturned => record.rows_returned as f64,
        }
    }

    /// Axis label for charts
    pub fn label(self) -> &'static str {
        match self {
            Metric::LogicalReads => "Logical Reads",
            Metric::CpuTimeMs => "CPU Time (ms)",
            Metric::ElapsedTimeMs => "Time (ms)",
            Metric::RowsReturned => "Rows Returned",
        }
    }
}

/// Running mean for one (test, variant) cell
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MeanState {
    sum: f64,
    count: u64,
}

impl MeanState {
    pub(crate) fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }
}

/// test name -> variant -> mean of the metric, sorted by test name
pub type MetricPivot = BTreeMap<String, BTreeMap<QueryVariant, f64>>;

/// Average `metric` per (test, variant) over tests whose name contains
/// `test_name_filter`, ignoring case.
///
/// Only records that pass the filter are validated. When nothing matches the
/// pivot is empty; reporting "no data" is up to the caller. A filter that is a
/// substring of several test names selects all of them.
pub fn pivot_metric(
    records: &[MeasurementRecord],
    test_name_filter: &str,
    metric: Metric,
) -> Result<MetricPivot, ValidationError> {
    let needle = test_name_filter.to_lowercase();
    let mut cells: BTreeMap<&str, BTreeMap<QueryVariant, MeanState>> = BTreeMap::new();

    for record in records {
        if !record.test_name.to_lowercase().contains(&needle) {
            continue;
        }
        let variant = record.validate()?;
        cells
            .entry(record.test_name.as_str())
            .or_default()
            .entry(variant)
            .or_default()
            .push(metric.value(record));
    }

    Ok(cells
        .into_iter()
        .map(|(test_name, by_variant)| {
            let means = by_variant
                .into_iter()
                .filter(|(_, state)| !state.is_empty())
                .map(|(variant, state)| (variant, state.mean()))
                .collect();
            (test_name.to_string(), means)
        })
        .collect())
}

/// Improvement percentage for one pivot row, when both sides are present and
/// the baseline mean is positive.
pub fn improvement_for(by_variant: &BTreeMap<QueryVariant, f64>) -> Option<f64> {
    let before = *by_variant.get(&QueryVariant::Baseline)?;
    let after = *by_variant.get(&QueryVariant::Optimized)?;
    (before > 0.0).then(|| improvement_pct(before, after))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, tag: &str, reads: i64) -> MeasurementRecord {
        MeasurementRecord::new(name, tag, reads)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_index_scan_scenario() {
        let rows = build_summary(&[
            rec("IndexScan", "BAD", 10000),
            rec("IndexScan", "OPTIMIZED", 250),
        ])
        .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.test_name, "IndexScan");
        assert_eq!(row.before_reads, 10000);
        assert_eq!(row.after_reads, 250);
        assert!(approx(row.improvement_pct, 97.5));
        assert!(approx(row.speedup_factor, 40.0));
    }

    #[test]
    fn test_missing_counterpart_is_skipped() {
        let rows = build_summary(&[rec("JoinFix", "BAD", 500)]).unwrap();
        assert!(rows.is_empty());

        let rows = build_summary(&[rec("JoinFix", "OPTIMIZED", 50)]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_negative_reads_fail() {
        let err = build_summary(&[rec("IndexScan", "BAD", -1)]).unwrap_err();
        assert!(matches!(err, ValidationError::NegativeMetric { field: "logical_reads", .. }));
    }

    #[test]
    fn test_unknown_tag_fails_even_in_skipped_group() {
        let records = [
            rec("A", "BAD", 10),
            rec("A", "OPTIMIZED", 5),
            rec("Lonely", "FASTER", 1),
        ];
        assert!(matches!(
            build_summary(&records),
            Err(ValidationError::UnknownVariant { .. })
        ));
    }

    #[test]
    fn test_equal_reads() {
        let rows =
            build_summary(&[rec("Same", "BAD", 700), rec("Same", "OPTIMIZED", 700)]).unwrap();
        assert!(approx(rows[0].improvement_pct, 0.0));
        assert!(approx(rows[0].speedup_factor, 1.0));
    }

    #[test]
    fn test_zero_after_reads_uses_sentinel() {
        let rows =
            build_summary(&[rec("Cached", "BAD", 320), rec("Cached", "OPTIMIZED", 0)]).unwrap();
        assert!(approx(rows[0].improvement_pct, 100.0));
        assert_eq!(rows[0].speedup_factor, 0.0);
    }

    #[test]
    fn test_zero_before_reads_is_skipped() {
        let rows = build_summary(&[
            rec("Empty", "BAD", 0),
            rec("Empty", "OPTIMIZED", 0),
            rec("Kept", "BAD", 10),
            rec("Kept", "OPTIMIZED", 5),
        ])
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].test_name, "Kept");
    }

    #[test]
    fn test_first_seen_order() {
        let records = [
            rec("Zeta", "OPTIMIZED", 1),
            rec("Alpha", "BAD", 4),
            rec("Zeta", "BAD", 2),
            rec("Mid", "BAD", 8),
            rec("Alpha", "OPTIMIZED", 2),
            rec("Mid", "OPTIMIZED", 4),
        ];
        let names: Vec<_> = build_summary(&records)
            .unwrap()
            .into_iter()
            .map(|r| r.test_name)
            .collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);

        // Same groups, same first appearance of each name, different interleaving
        let permuted = [
            rec("Zeta", "BAD", 2),
            rec("Alpha", "OPTIMIZED", 2),
            rec("Mid", "OPTIMIZED", 4),
            rec("Zeta", "OPTIMIZED", 1),
            rec("Alpha", "BAD", 4),
            rec("Mid", "BAD", 8),
        ];
        let names: Vec<_> = build_summary(&permuted)
            .unwrap()
            .into_iter()
            .map(|r| r.test_name)
            .collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_duplicate_variant_first_wins() {
        let rows = build_summary(&[
            rec("Dup", "BAD", 1000),
            rec("Dup", "OPTIMIZED", 100),
            rec("Dup", "BAD", 5),
            rec("Dup", "OPTIMIZED", 1),
        ])
        .unwrap();
        assert_eq!(rows[0].before_reads, 1000);
        assert_eq!(rows[0].after_reads, 100);
        assert!(approx(rows[0].speedup_factor, 10.0));
    }

    #[test]
    fn test_build_summary_is_idempotent() {
        let records = [
            rec("A", "BAD", 900),
            rec("A", "OPTIMIZED", 300),
            rec("B", "BASELINE", 50),
            rec("B", "OPTIMIZED", 25),
        ];
        assert_eq!(build_summary(&records).unwrap(), build_summary(&records).unwrap());
    }

    #[test]
    fn test_empty_input() {
        assert!(build_summary(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_pivot_join_scenario() {
        let records = [rec("JoinFix", "BAD", 500), rec("JoinFix", "OPTIMIZED", 50)];
        let pivot = pivot_metric(&records, "Join", Metric::LogicalReads).unwrap();

        let mut expected = MetricPivot::new();
        expected.insert(
            "JoinFix".to_string(),
            BTreeMap::from([(QueryVariant::Baseline, 500.0), (QueryVariant::Optimized, 50.0)]),
        );
        assert_eq!(pivot, expected);
    }

    #[test]
    fn test_pivot_averages_and_ignores_case() {
        let records = [
            rec("module a - scan", "BAD", 0).with_times(0.0, 10.0),
            rec("Module A - scan", "BAD", 0).with_times(0.0, 20.0),
            rec("MODULE A - seek", "OPTIMIZED", 0).with_times(0.0, 4.0),
            rec("Module B", "BAD", 0).with_times(0.0, 99.0),
        ];
        let pivot = pivot_metric(&records, "Module A", Metric::ElapsedTimeMs).unwrap();
        assert_eq!(pivot.len(), 3);
        assert_eq!(pivot["MODULE A - seek"][&QueryVariant::Optimized], 4.0);
        assert!(!pivot.contains_key("Module B"));

        let dup = [
            rec("Scan", "BAD", 0).with_times(0.0, 10.0),
            rec("Scan", "BAD", 0).with_times(0.0, 20.0),
        ];
        let pivot = pivot_metric(&dup, "scan", Metric::ElapsedTimeMs).unwrap();
        assert!(approx(pivot["Scan"][&QueryVariant::Baseline], 15.0));
    }

    #[test]
    fn test_pivot_no_match_is_empty() {
        let records = [rec("JoinFix", "BAD", 500)];
        assert!(pivot_metric(&records, "Nothing", Metric::LogicalReads).unwrap().is_empty());
        assert!(pivot_metric(&[], "", Metric::LogicalReads).unwrap().is_empty());
    }

    #[test]
    fn test_pivot_validates_matching_records_only() {
        let records = [rec("JoinFix", "BAD", 500), rec("Other", "BAD", -5)];
        assert!(pivot_metric(&records, "join", Metric::LogicalReads).is_ok());
        assert!(pivot_metric(&records, "", Metric::LogicalReads).is_err());
    }

    #[test]
    fn test_pivot_rejects_infinite_duration() {
        let records = [
            rec("JoinFix", "BAD", 500).with_times(1.0, f64::INFINITY),
            rec("JoinFix", "OPTIMIZED", 50).with_times(1.0, 4.0),
        ];
        assert!(matches!(
            pivot_metric(&records, "join", Metric::ElapsedTimeMs),
            Err(ValidationError::NonFiniteMetric { field: "elapsed_time_ms", .. })
        ));
        assert!(matches!(
            build_summary(&records),
            Err(ValidationError::NonFiniteMetric { .. })
        ));
    }

    #[test]
    fn test_improvement_for() {
        let both =
            BTreeMap::from([(QueryVariant::Baseline, 200.0), (QueryVariant::Optimized, 50.0)]);
        assert!(approx(improvement_for(&both).unwrap(), 75.0));

        let zero = BTreeMap::from([(QueryVariant::Baseline, 0.0), (QueryVariant::Optimized, 50.0)]);
        assert_eq!(improvement_for(&zero), None);

        let one = BTreeMap::from([(QueryVariant::Optimized, 50.0)]);
        assert_eq!(improvement_for(&one), None);
    }

    #[test]
    fn test_mean_state() {
        let mut state = MeanState::default();
        assert!(state.is_empty());
        assert_eq!(state.mean(), 0.0);
        state.push(2.0);
        state.push(4.0);
        state.push(6.0);
        assert_eq!(state.count, 3);
        assert!(approx(state.mean(), 4.0));
    }
}
