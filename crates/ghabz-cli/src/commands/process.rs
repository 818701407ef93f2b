//! Process command - extract one page region of a PDF.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use ghabz_core::{BBox, ExtractionResult, RegionExtractor};

use super::load_config;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Page index (0-based)
    #[arg(short, long, default_value = "0")]
    page: u32,

    /// Explicit region "x0,y0,x1,y1" (top-left origin); defaults to the crop box
    #[arg(long)]
    crop: Option<BBox>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Full result as JSON
    Json,
    /// Table as CSV
    Csv,
    /// Normalized text only
    Text,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    // Check input file exists
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting page {}...", args.page));
    pb.enable_steady_tick(Duration::from_millis(100));

    let extractor = RegionExtractor::new(config);
    let input = args.input.clone();
    let (page, crop) = (args.page, args.crop);
    let outcome =
        tokio::task::spawn_blocking(move || extractor.extract_region(&input, page, crop)).await;

    pb.finish_and_clear();
    let result = outcome??;

    let output = format_result(&result, args.format)?;

    // Write output
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

fn format_result(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => format_csv(result),
        OutputFormat::Text => Ok(result.text.clone()),
    }
}

fn format_csv(result: &ExtractionResult) -> anyhow::Result<String> {
    let Some(table) = &result.table else {
        anyhow::bail!("No table found in the region");
    };

    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(vec![]);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}
