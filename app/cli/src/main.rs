//! FILENAME: app/cli/src/main.rs
//! PURPOSE: Command-line driver for the widget engine.
//! CONTEXT: Reads a dataset and a widget configuration, runs one widget
//! calculation and prints the result as JSON on stdout. Logs go to stderr
//! and, optionally, to a log file.

mod loader;
mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use widget_engine::calculate_widget;

use crate::loader::{load_definition, load_records, DataFormat};

#[derive(Parser, Debug)]
#[command(name = "widget-cli")]
#[command(about = "Calculate a dashboard widget (chart buckets or KPI) from a dataset")]
#[command(version)]
struct Args {
    /// Dataset file (JSON array of objects, or CSV with a header row)
    #[arg(long)]
    data: PathBuf,

    /// Widget configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    /// Dataset format; guessed from the file extension when omitted
    #[arg(long, value_enum)]
    data_format: Option<DataFormat>,

    /// Overrides the configuration's utcOffsetMinutes
    #[arg(long, allow_hyphen_values = true)]
    utc_offset_minutes: Option<i32>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    /// Also write log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_logging(args.log_level, args.log_file.as_deref())?;
    run(&args)
}

fn run(args: &Args) -> anyhow::Result<()> {
    let records = load_records(&args.data, args.data_format)?;
    let definition = load_definition(&args.config, args.utc_offset_minutes)?;

    let output = calculate_widget(&records, &definition);
    for diagnostic in &output.diagnostics {
        log::info!(target: "WIDGET", "diagnostic: {:?}", diagnostic);
    }

    let json = if args.pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .context("Failed to serialize widget output")?;

    println!("{}", json);
    log::logger().flush();
    Ok(())
}
