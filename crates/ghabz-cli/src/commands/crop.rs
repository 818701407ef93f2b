//! Crop command - write a crop box into a PDF.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use tracing::info;

use ghabz_core::{BBox, apply_crop};

/// Arguments for the crop command.
#[derive(Args)]
pub struct CropArgs {
    /// Input PDF
    #[arg(required = true)]
    input: PathBuf,

    /// Crop region "x0,y0,x1,y1" in points, top-left origin
    #[arg(long, required = true)]
    bbox: BBox,

    /// Output PDF (default: {input dir}/{input stem}/{section}.pdf)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Section name used for the default output file name
    #[arg(long, default_value = "cropped")]
    section: String,

    /// Page index (0-based)
    #[arg(short, long, default_value = "0")]
    page: u32,
}

pub async fn run(args: CropArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let output = match &args.output {
        Some(path) => path.clone(),
        None => default_output(&args.input, &args.section),
    };

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    info!("Cropping {} to {:?}", args.input.display(), args.bbox);
    let applied = apply_crop(&args.input, &output, args.page, &args.bbox)?;

    println!(
        "{} Saved to {}",
        style("✓").green(),
        output.display()
    );
    println!(
        "   Crop box: ({:.1}, {:.1}, {:.1}, {:.1})",
        applied.x0, applied.y0, applied.x1, applied.y1
    );
    println!(
        "   Size: {:.1} x {:.1} points",
        applied.width(),
        applied.height()
    );

    Ok(())
}

/// `{input dir}/{input stem}/{section}.pdf`
fn default_output(input: &Path, section: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(stem)
        .join(format!("{}.pdf", section))
}
