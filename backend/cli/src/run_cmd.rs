//! CLI Run Command
//!
//! Processes one receipt end to end and prints the recommendations.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use receiptflow_config::ReceiptflowConfig;
use receiptflow_core::GeoPoint;
use receiptflow_pipeline::RunRequest;
use tracing::error;

use crate::components::{build_ocr, build_pipeline};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Credentials file for the field extractor
    #[arg(long)]
    pub key: PathBuf,
    /// Receipt image
    #[arg(long)]
    pub image: PathBuf,
    /// Dataset CSV; updated in place, with a `.backup` copy next to it
    #[arg(long)]
    pub dataset: PathBuf,
    #[arg(long)]
    pub uid: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,
}

pub async fn run(config: &ReceiptflowConfig, args: RunArgs) -> Result<ExitCode> {
    let pipeline = build_pipeline(config)?;
    let ocr = build_ocr(config)?;

    let request = RunRequest {
        key_path: args.key,
        image_path: args.image,
        dataset_path: args.dataset,
        uid: args.uid,
        email: args.email,
        origin: GeoPoint::new(args.lon, args.lat),
    };

    match pipeline.run(&request, ocr.as_deref()).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(kind = e.kind(), "Run failed: {e}");
            let body = serde_json::json!({ "error": e.kind(), "message": e.to_string() });
            eprintln!("{}", serde_json::to_string_pretty(&body)?);
            Ok(ExitCode::FAILURE)
        }
    }
}
