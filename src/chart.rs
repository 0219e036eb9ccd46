//! Before/after bar charts rendered to SVG

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::aggregator::{improvement_for, ComparisonRow, Metric, MetricPivot};
use crate::error::{Error, Result};
use crate::query::ModulePivots;
use crate::record::QueryVariant;
use crate::report::{format_improvement, format_speedup};

type DrawResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const TITLE_FONT_SIZE: u32 = 28;
const PANEL_TITLE_FONT_SIZE: u32 = 20;
const AXIS_LABEL_FONT_SIZE: u32 = 16;
const TICK_LABEL_FONT_SIZE: u32 = 13;
const DATA_LABEL_FONT_SIZE: u32 = 14;

const BEFORE_COLOR: RGBColor = RGBColor(0xe7, 0x4c, 0x3c);
const AFTER_COLOR: RGBColor = RGBColor(0x2e, 0xcc, 0x71);
const LABEL_COLOR: RGBColor = RGBColor(0, 128, 0);

const BAR_WIDTH: f64 = 0.35;

/// Headroom above the tallest bar for its label
const Y_HEADROOM: f64 = 1.15;

fn variant_color(variant: QueryVariant) -> RGBColor {
    match variant {
        QueryVariant::Baseline => BEFORE_COLOR,
        QueryVariant::Optimized => AFTER_COLOR,
    }
}

/// `Module A` -> `module_a`
pub fn module_slug(module: &str) -> String {
    module.to_lowercase().replace(' ', "_")
}

/// `<prefix>_<stamp>.svg`
pub fn chart_file_name(prefix: &str, stamp: &str) -> String {
    format!("{}_{}.svg", prefix, stamp)
}

fn tick_label(names: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 0.3 {
        return String::new();
    }
    names.get(idx as usize).cloned().unwrap_or_default()
}

/// Top of the y range; non-finite values would make the mesh unbounded
fn y_max(values: impl Iterator<Item = f64>) -> f64 {
    values
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max)
        .min(f64::MAX / Y_HEADROOM)
        .max(1.0)
        * Y_HEADROOM
}

/// Render the overall before/after logical-reads chart.
///
/// Writes `overall_summary_<stamp>.svg` under `output_dir`; nothing is drawn
/// for an empty summary.
pub fn render_summary_chart(
    rows: &[ComparisonRow],
    output_dir: &Path,
    stamp: &str,
) -> Result<Option<PathBuf>> {
    if rows.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join(chart_file_name("overall_summary", stamp));
    draw_summary(rows, &path).map_err(|e| Error::Chart(e.to_string()))?;

    info!(path = %path.display(), "summary chart saved");
    Ok(Some(path))
}

fn draw_summary(rows: &[ComparisonRow], path: &Path) -> DrawResult<()> {
    let root = SVGBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let names: Vec<String> = rows.iter().map(|r| r.test_name.clone()).collect();
    let n = rows.len();
    let top = y_max(rows.iter().map(|r| r.before_reads.max(r.after_reads) as f64));

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "SQL Performance Lab - Complete Results Summary",
            ("sans-serif", TITLE_FONT_SIZE),
        )
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(90)
        .build_cartesian_2d(-0.5..(n as f64 - 0.5), 0.0..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| tick_label(&names, *x))
        .x_desc("Optimization Module")
        .y_desc(Metric::LogicalReads.label())
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    chart
        .draw_series(rows.iter().enumerate().map(|(i, row)| {
            let x = i as f64;
            Rectangle::new(
                [(x - BAR_WIDTH, 0.0), (x, row.before_reads as f64)],
                BEFORE_COLOR.mix(0.8).filled(),
            )
        }))?
        .label("Before")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BEFORE_COLOR.filled()));

    chart
        .draw_series(rows.iter().enumerate().map(|(i, row)| {
            let x = i as f64;
            Rectangle::new(
                [(x, 0.0), (x + BAR_WIDTH, row.after_reads as f64)],
                AFTER_COLOR.mix(0.8).filled(),
            )
        }))?
        .label("After")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], AFTER_COLOR.filled()));

    chart.draw_series(rows.iter().enumerate().map(|(i, row)| {
        let height = row.before_reads.max(row.after_reads) as f64;
        Text::new(
            format_speedup(row.speedup_factor),
            (i as f64, height * 1.05),
            ("sans-serif", DATA_LABEL_FONT_SIZE)
                .into_font()
                .color(&LABEL_COLOR)
                .pos(Pos::new(HPos::Center, VPos::Bottom)),
        )
    }))?;

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render the two-panel chart (logical reads, elapsed time) for one module.
///
/// Returns `None` without writing a file when the module has no data.
pub fn render_module_chart(
    module: &str,
    pivots: &ModulePivots,
    output_dir: &Path,
    stamp: &str,
) -> Result<Option<PathBuf>> {
    if pivots.is_empty() {
        return Ok(None);
    }
    std::fs::create_dir_all(output_dir)?;

    let prefix = format!("results_{}", module_slug(module));
    let path = output_dir.join(chart_file_name(&prefix, stamp));
    draw_module(module, pivots, &path).map_err(|e| Error::Chart(e.to_string()))?;

    info!(module, path = %path.display(), "module chart saved");
    Ok(Some(path))
}

fn draw_module(module: &str, pivots: &ModulePivots, path: &Path) -> DrawResult<()> {
    let root = SVGBackend::new(path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let root = root.titled(
        &format!("{} - Performance Optimization Results", module),
        ("sans-serif", TITLE_FONT_SIZE).into_font().style(FontStyle::Bold),
    )?;
    let panels = root.split_evenly((1, 2));

    draw_pivot_panel(
        &panels[0],
        "Logical Reads: Before vs After",
        Metric::LogicalReads.label(),
        &pivots.logical_reads,
        true,
    )?;
    draw_pivot_panel(
        &panels[1],
        "Execution Time: Before vs After",
        Metric::ElapsedTimeMs.label(),
        &pivots.elapsed_time,
        false,
    )?;

    root.present()?;
    Ok(())
}

fn draw_pivot_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    y_desc: &str,
    pivot: &MetricPivot,
    annotate_improvement: bool,
) -> DrawResult<()> {
    let names: Vec<String> = pivot.keys().cloned().collect();
    let n = names.len();
    let top = y_max(pivot.values().flat_map(|by_variant| by_variant.values().copied()));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", PANEL_TITLE_FONT_SIZE))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..(n.max(1) as f64 - 0.5), 0.0..top)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&|x| tick_label(&names, *x))
        .x_desc("Test Scenario")
        .y_desc(y_desc)
        .label_style(("sans-serif", TICK_LABEL_FONT_SIZE))
        .axis_desc_style(("sans-serif", AXIS_LABEL_FONT_SIZE))
        .draw()?;

    for variant in QueryVariant::ALL {
        let color = variant_color(variant);
        let offset = match variant {
            QueryVariant::Baseline => -BAR_WIDTH,
            QueryVariant::Optimized => 0.0,
        };
        chart
            .draw_series(pivot.values().enumerate().filter_map(|(i, by_variant)| {
                let value = *by_variant.get(&variant)?;
                let x = i as f64 + offset;
                Some(Rectangle::new([(x, 0.0), (x + BAR_WIDTH, value)], color.filled()))
            }))?
            .label(variant.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], color.filled()));
    }

    if annotate_improvement {
        chart.draw_series(pivot.values().enumerate().filter_map(|(i, by_variant)| {
            let improvement = improvement_for(by_variant)?;
            let height = by_variant.values().copied().fold(0.0_f64, f64::max);
            Some(Text::new(
                format_improvement(improvement),
                (i as f64, height * 1.05),
                ("sans-serif", DATA_LABEL_FONT_SIZE)
                    .into_font()
                    .style(FontStyle::Bold)
                    .color(&LABEL_COLOR)
                    .pos(Pos::new(HPos::Center, VPos::Bottom)),
            ))
        }))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    Ok(())
}
