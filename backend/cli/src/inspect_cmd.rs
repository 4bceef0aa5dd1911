//! CLI Inspect Command
//!
//! Loads a dataset with the same checks a run applies and reports its shape.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use receiptflow_config::ReceiptflowConfig;
use receiptflow_dataset::{backup_path_for, load, LoadOptions};

pub async fn run(config: &ReceiptflowConfig, dataset: &Path) -> Result<ExitCode> {
    let quiet = config
        .dataset
        .as_ref()
        .and_then(|d| d.quiet_parse)
        .unwrap_or(true);

    let table = match load(dataset, LoadOptions { quiet }).await {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{} ({}): {e}", dataset.display(), e.kind());
            return Ok(ExitCode::FAILURE);
        }
    };

    println!("{}", dataset.display());
    println!("  rows:    {}", table.len());
    println!("  columns: {}", table.columns().join(", "));
    let backup = backup_path_for(dataset);
    if backup.exists() {
        println!("  backup:  {}", backup.display());
    }
    Ok(ExitCode::SUCCESS)
}
