use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

use perflab::aggregator::{build_summary, Metric};
use perflab::chart::{render_module_chart, render_summary_chart};
use perflab::config::{OutputConfig, RepositoryConfig, SourceFormat, DEFAULT_BATCH_SIZE};
use perflab::export::export_summary;
use perflab::query::{fetch_records, ModulePivots};
use perflab::report::{format_pivot, print_summary};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Parquet,
    Csv,
}

impl From<FormatArg> for SourceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Parquet => SourceFormat::Parquet,
            FormatArg::Csv => SourceFormat::Csv,
        }
    }
}

/// SQL Performance Lab - before/after benchmark results
#[derive(Parser, Debug)]
#[command(name = "perflab", version, about)]
struct Args {
    /// Exported QueryBenchmarks table (.parquet or .csv)
    #[arg(short, long, env = "PERFLAB_SOURCE", default_value = "data/query_benchmarks.parquet")]
    source: PathBuf,

    /// Source format, guessed from the file extension when omitted
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Rows per record batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Directory for rendered charts
    #[arg(short, long, env = "PERFLAB_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Also compare every test whose name contains this (repeatable)
    #[arg(short, long = "module")]
    modules: Vec<String>,

    /// Print results only, render no charts
    #[arg(long)]
    no_charts: bool,

    /// Write the summary table to a .csv, .parquet or .json file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn repository_config(&self) -> Result<RepositoryConfig> {
        let config = match self.format {
            Some(format) => RepositoryConfig {
                source: self.source.clone(),
                format: format.into(),
                batch_size: DEFAULT_BATCH_SIZE,
            },
            None => RepositoryConfig::new(&self.source)
                .with_context(|| format!("pass --format for {}", self.source.display()))?,
        };
        Ok(config.with_batch_size(self.batch_size))
    }

    fn output_config(&self) -> OutputConfig {
        OutputConfig {
            output_dir: self.output_dir.clone(),
            charts: !self.no_charts,
            export: self.export.clone(),
        }
    }
}

fn setup_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let repository = args.repository_config()?;
    let output = args.output_config();
    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

    println!("Data source: {}", repository.source.display());

    let records = fetch_records(&repository, None).with_context(|| {
        format!("failed to load benchmarks from {}", repository.source.display())
    })?;
    let rows = build_summary(&records).context("benchmark table contains invalid rows")?;

    if output.charts {
        if let Some(path) = render_summary_chart(&rows, &output.output_dir, &stamp)? {
            println!("Summary chart saved: {}", path.display());
        }
    }

    print_summary(&rows);

    if let Some(path) = &output.export {
        export_summary(&rows, path)
            .with_context(|| format!("failed to export summary to {}", path.display()))?;
        println!("Summary exported: {}", path.display());
    }

    for module in &args.modules {
        let pivots = ModulePivots::from_records(&records, module)
            .with_context(|| format!("failed to compare module {module}"))?;

        if pivots.is_empty() {
            warn!(module = module.as_str(), "no matching tests");
            println!("No data found for {}", module);
            continue;
        }

        if output.charts {
            if let Some(path) = render_module_chart(module, &pivots, &output.output_dir, &stamp)? {
                println!("Chart saved: {}", path.display());
            }
        } else {
            println!();
            println!("{}", module);
            print!("{}", format_pivot(Metric::LogicalReads.label(), &pivots.logical_reads));
            print!("{}", format_pivot(Metric::ElapsedTimeMs.label(), &pivots.elapsed_time));
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level);

    println!("SQL Server Performance Lab - Results Visualization");
    println!("{:=<60}", "");

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            eprintln!();
            eprintln!("Make sure:");
            eprintln!("  1. The benchmark table has been exported (--source / PERFLAB_SOURCE)");
            eprintln!("  2. It has the columns TestName, QueryType, LogicalReads, CPUTimeMs,");
            eprintln!("     ElapsedTimeMs, RowsReturned and TestDate");
            eprintln!("  3. The benchmarks have been run for both query variants");
            ExitCode::FAILURE
        }
    }
}
