//! Batch processing command for many section PDFs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::{Pattern, glob};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use ghabz_core::{ExtractionResult, RegionExtractor, output_base_name, save_result};

use super::load_config;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern of input PDFs (e.g. "template1/*/*.pdf")
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Page index (0-based) to extract from every file
    #[arg(short, long, default_value = "0")]
    page: u32,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    result: Option<ExtractionResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let exclude = if config.output.exclude_pattern.is_empty() {
        None
    } else {
        Some(Pattern::new(&config.output.exclude_pattern)?)
    };

    // Expand glob pattern
    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            let ext = p.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext.eq_ignore_ascii_case("pdf")
        })
        .filter(|p| !is_excluded(p, exclude.as_ref()))
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let formats = config.output.formats.clone();
    let extractor = Arc::new(RegionExtractor::new(config));
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        let extractor = Arc::clone(&extractor);
        let pb = overall_pb.clone();
        let page = args.page;

        handles.push(tokio::task::spawn_blocking(move || {
            let file_start = Instant::now();
            let outcome = extractor.extract_all(&path, page);
            drop(permit);
            pb.inc(1);
            (path, outcome, file_start.elapsed().as_millis() as u64)
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let (path, outcome, processing_time_ms) = handle.await?;

        let saved = outcome.and_then(|result| {
            let base_name = output_base_name(&path);
            save_result(&result, &args.output_dir, &base_name, &formats)?;
            Ok(result)
        });

        match saved {
            Ok(result) => {
                debug!("Processed {} in {}ms", path.display(), processing_time_ms);
                results.push(ProcessResult {
                    path,
                    result: Some(result),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        result: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    overall_pb.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }
    }

    overall_pb.finish_with_message("Complete");

    let successful = results.iter().filter(|r| r.result.is_some()).count();
    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    // Generate summary if requested
    if args.summary {
        let summary_path = args.output_dir.join("summary.csv");
        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    // Print summary
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(successful).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn is_excluded(path: &Path, exclude: Option<&Pattern>) -> bool {
    let (Some(pattern), Some(name)) = (exclude, path.file_name().and_then(|n| n.to_str())) else {
        return false;
    };
    pattern.matches(name)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "page",
        "text_chars",
        "table_rows",
        "table_columns",
        "cells",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result.path.to_string_lossy().into_owned();
        let time = result.processing_time_ms.to_string();

        if let Some(extraction) = &result.result {
            let (rows, cols) = extraction
                .table
                .as_ref()
                .map(|t| (t.row_count, t.column_count))
                .unwrap_or((0, 0));
            let cells = extraction.geometry.as_ref().map_or(0, |g| g.cells.len());

            wtr.write_record([
                filename.as_str(),
                "success",
                &extraction.page_num.to_string(),
                &extraction.text.chars().count().to_string(),
                &rows.to_string(),
                &cols.to_string(),
                &cells.to_string(),
                &time,
                "",
            ])?;
        } else {
            wtr.write_record([
                filename.as_str(),
                "error",
                "",
                "",
                "",
                "",
                "",
                &time,
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_pattern_matches_file_name() {
        let pattern = Pattern::new("*_cropped_cropped.pdf").unwrap();
        assert!(is_excluded(Path::new("t1/a_cropped_cropped.pdf"), Some(&pattern)));
        assert!(!is_excluded(Path::new("t1/a_cropped.pdf"), Some(&pattern)));
        assert!(!is_excluded(Path::new("t1/a_cropped_cropped.pdf"), None));
    }
}
