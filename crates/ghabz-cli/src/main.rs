//! CLI application for invoice PDF region extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, crop, process};

/// ghabz - Extract text, tables and cell geometry from cropped invoice PDFs
#[derive(Parser)]
#[command(name = "ghabz")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one page region of a PDF
    Process(process::ProcessArgs),

    /// Extract many PDFs
    Batch(batch::BatchArgs),

    /// Write a crop box into a PDF
    Crop(crop::CropArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // The extractor recovers from content interpreter panics; report them as
    // one log line instead of the default stderr dump.
    std::panic::set_hook(Box::new(|info| {
        tracing::warn!("{}", info);
    }));

    // Execute command
    match cli.command {
        Commands::Process(args) => process::run(args, cli.config.as_deref()).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Crop(args) => crop::run(args).await,
        Commands::Config(args) => config::run(args).await,
    }
}
