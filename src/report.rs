//! Text rendering of the comparison summary

use std::fmt::Write;
use tracing::warn;

use crate::aggregator::{improvement_for, ComparisonRow, MetricPivot};
use crate::record::QueryVariant;

pub const TITLE: &str = "SQL PERFORMANCE LAB - RESULTS SUMMARY";
const RULE_WIDTH: usize = 80;
const HEADERS: [&str; 5] = ["Module", "Before", "After", "Improvement %", "Speedup"];

/// Speedup as shown in tables and chart labels, e.g. `40.0x`
pub fn format_speedup(speedup: f64) -> String {
    format!("{:.1}x", speedup)
}

/// Improvement as shown above chart bars, e.g. `97.5% ↓`
pub fn format_improvement(improvement_pct: f64) -> String {
    format!("{:.1}% ↓", improvement_pct)
}

fn cells(row: &ComparisonRow) -> [String; 5] {
    [
        row.test_name.clone(),
        row.before_reads.to_string(),
        row.after_reads.to_string(),
        format!("{:.2}", row.improvement_pct),
        format_speedup(row.speedup_factor),
    ]
}

/// Render the summary table with a title and `=` rules.
///
/// The module column is left aligned; numbers are right aligned.
pub fn format_summary_table(rows: &[ComparisonRow]) -> String {
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{TITLE}");
    let _ = writeln!(out, "{rule}");

    if rows.is_empty() {
        let _ = writeln!(out, "No test has both a baseline and an optimized measurement.");
        let _ = writeln!(out, "{rule}");
        return out;
    }

    let body: Vec<[String; 5]> = rows.iter().map(cells).collect();
    let mut widths = HEADERS.map(str::len);
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let _ = writeln!(
        out,
        "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {:>w4$}",
        HEADERS[0],
        HEADERS[1],
        HEADERS[2],
        HEADERS[3],
        HEADERS[4],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
        w3 = widths[3],
        w4 = widths[4],
    );
    for row in &body {
        let _ = writeln!(
            out,
            "{:<w0$}  {:>w1$}  {:>w2$}  {:>w3$}  {:>w4$}",
            row[0],
            row[1],
            row[2],
            row[3],
            row[4],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
            w4 = widths[4],
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}

/// Print the summary table to stdout; an empty summary is reported, not an error
pub fn print_summary(rows: &[ComparisonRow]) {
    if rows.is_empty() {
        warn!("summary is empty: no test has both variants with a non-zero baseline");
    }
    println!();
    print!("{}", format_summary_table(rows));
}

/// One line per test: mean of each variant, plus the improvement when both
/// sides are present
pub fn format_pivot(metric_label: &str, pivot: &MetricPivot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{metric_label}:");
    for (test_name, by_variant) in pivot {
        let _ = write!(out, "  {test_name}:");
        for variant in QueryVariant::ALL {
            match by_variant.get(&variant) {
                Some(mean) => {
                    let _ = write!(out, " {}={:.1}", variant, mean);
                }
                None => {
                    let _ = write!(out, " {}=-", variant);
                }
            }
        }
        if let Some(improvement) = improvement_for(by_variant) {
            let _ = write!(out, " ({})", format_improvement(improvement));
        }
        out.push('\n');
    }
    out
}
