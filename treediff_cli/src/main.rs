mod print;

use clap::Parser;
use print::ReportView;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;
use treediff_common::{load_config, CompareOptions, ContentStrategy};
use treediff_core::CompareEngine;

/// Compare two directory trees and report equal, distinct, and one-sided
/// entries. Files are compared by size by default.
#[derive(Parser)]
#[command(name = "treediff")]
#[command(version = "0.1.0")]
#[command(about = "Recursive directory tree comparison", long_about = None)]
struct Cli {
    /// Left directory (or file) path
    left: PathBuf,

    /// Right directory (or file) path
    right: PathBuf,

    /// Compare files by content
    #[arg(short = 'c', long)]
    compare_content: bool,

    /// Compare files by modification date
    #[arg(short = 'D', long)]
    compare_date: bool,

    /// Tolerance used in date comparison (milliseconds, default 1000)
    #[arg(long)]
    date_tolerance: Option<u64>,

    /// Compare file content line by line instead of byte by byte
    #[arg(long, requires = "compare_content")]
    line_based: bool,

    /// Line-based comparison: ignore line ending (CR/LF) differences
    #[arg(long, requires = "line_based")]
    ignore_line_ending: bool,

    /// Line-based comparison: ignore leading/trailing whitespace per line
    #[arg(long, requires = "line_based")]
    ignore_white_spaces: bool,

    /// File name include filter (comma-separated glob patterns)
    #[arg(short = 'f', long)]
    filter: Option<String>,

    /// File/directory name exclude filter (comma-separated glob patterns)
    #[arg(short = 'x', long)]
    exclude: Option<String>,

    /// Do not recurse into subdirectories
    #[arg(short = 'S', long)]
    skip_subdirs: bool,

    /// Ignore symlinks
    #[arg(short = 'L', long)]
    skip_symlinks: bool,

    /// Ignore case when comparing file names
    #[arg(short = 'i', long)]
    ignore_case: bool,

    /// Report: show entries occurring only in the left dir
    #[arg(short = 'l', long)]
    show_left: bool,

    /// Report: show entries occurring only in the right dir
    #[arg(short = 'r', long)]
    show_right: bool,

    /// Report: show identical entries occurring in both dirs
    #[arg(short = 'e', long)]
    show_equal: bool,

    /// Report: show distinct entries occurring in both dirs
    #[arg(short = 'd', long)]
    show_distinct: bool,

    /// Report: show all entries
    #[arg(short = 'a', long)]
    show_all: bool,

    /// Report: include directories in the detailed report
    #[arg(short = 'w', long)]
    whole_report: bool,

    /// Report: print details as CSV
    #[arg(long)]
    csv: bool,

    /// Report: print results as JSON (statistics and differences)
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Don't use console colors
    #[arg(long)]
    nocolors: bool,
}

fn main() {
    // Logs go to stderr so report output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(identical) => std::process::exit(if identical { 0 } else { 1 }),
        Err(e) => {
            error!("comparison failed: {e:#}");
            eprintln!("treediff: {e:#}");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let options = build_options(&cli)?;
    let engine = CompareEngine::new(options)?;
    let results = engine.compare(&cli.left, &cli.right)?;

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    if cli.json {
        serde_json::to_writer_pretty(&mut writer, &results)?;
        use std::io::Write;
        writeln!(writer)?;
    } else {
        let view = ReportView {
            show_all: cli.show_all,
            show_equal: cli.show_equal,
            show_left: cli.show_left,
            show_right: cli.show_right,
            show_distinct: cli.show_distinct,
            whole_report: cli.whole_report,
            csv: cli.csv,
            no_colors: cli.nocolors,
        };
        print::print_report(&results, &mut writer, &view)?;
    }

    Ok(results.statistics.is_same)
}

/// Seeds options from the config file, then applies command-line flags.
fn build_options(cli: &Cli) -> anyhow::Result<CompareOptions> {
    let loaded = load_config(false)?;
    let mut options = loaded.config.defaults;

    // Size comparison is the CLI default; the precedence chain still lets
    // date/content checks run for files whose sizes match.
    options.compare_size = true;
    if cli.compare_content {
        options.compare_content = true;
    }
    if cli.compare_date {
        options.compare_date = true;
    }
    if let Some(tolerance) = cli.date_tolerance {
        options.date_tolerance_ms = tolerance;
    }
    if cli.line_based {
        options.content_strategy = ContentStrategy::Lines;
    }
    if cli.ignore_line_ending {
        options.ignore_line_ending = true;
    }
    if cli.ignore_white_spaces {
        options.ignore_white_spaces = true;
    }
    if cli.filter.is_some() {
        options.include_filter = cli.filter.clone();
    }
    if cli.exclude.is_some() {
        options.exclude_filter = cli.exclude.clone();
    }
    if cli.skip_subdirs {
        options.skip_subdirectories = true;
    }
    if cli.skip_symlinks {
        options.skip_symlinks = true;
    }
    if cli.ignore_case {
        options.ignore_case = true;
    }

    Ok(options)
}
