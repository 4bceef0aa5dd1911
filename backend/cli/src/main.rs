mod components;
mod inspect_cmd;
mod run_cmd;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use receiptflow_config::{config_file_path, load_and_prepare};
use receiptflow_logging::init_logger;

#[derive(Parser)]
#[command(name = "receiptflow")]
#[command(about = "Receipt OCR to dataset append to nearby product recommendations")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $RECEIPTFLOW_CONFIG, then ./receiptflow.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one receipt and print recommendations as JSON
    Run(run_cmd::RunArgs),
    /// Load and validate a dataset, then print its shape
    Inspect {
        /// Path to the dataset CSV
        #[arg(long)]
        dataset: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_and_prepare(&config_file_path(cli.config.as_deref())).await?;

    let logging = config.logging.clone().unwrap_or_default();
    init_logger(
        logging.dir.as_deref().map(Path::new),
        logging.level.as_deref().unwrap_or("info"),
        logging.json.unwrap_or(false),
    );

    match cli.command {
        Commands::Run(args) => run_cmd::run(&config, args).await,
        Commands::Inspect { dataset } => inspect_cmd::run(&config, &dataset).await,
    }
}
