//! Dump Restore Tool
//!
//! Restores a mongodump-style dump directory or archive described by config.json

// dumprestore/src/main.rs
use anyhow::{Context, Result};
use chrono::Local;
use dumprestore::config::{self, DumpSource};
use dumprestore::{RestoreSummary, restore_dump, restore_dump_archive};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Main entry point for the restore tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run_app().await {
        Ok(_) => {
            println!("✅ Restore completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    let config_path = config::config_path();
    let raw_config = config::load_raw_config(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;
    let restore_config = config::load_restore_config_from_json(&raw_config)
        .context("Failed to load restore configuration from JSON")?;

    let started = Local::now();
    println!("🔄 Starting restore at {}", started.format("%Y-%m-%d %H:%M:%S"));

    let summary = match &restore_config.source {
        DumpSource::Directory(path) => {
            println!("Restoring dump directory: {}", path.display());
            restore_dump(restore_config.dump_options(path))
                .await
                .context("Dump restore failed")?
        }
        DumpSource::Archive { path, dump_root } => {
            println!("Restoring dump archive: {}", path.display());
            restore_dump_archive(restore_config.archive_options(path, dump_root.as_deref()))
                .await
                .context("Archive restore failed")?
        }
    };

    print_summary(&summary)?;
    let elapsed = Local::now() - started;
    println!("⏱ Finished in {} ms", elapsed.num_milliseconds());
    Ok(())
}

fn print_summary(summary: &RestoreSummary) -> Result<()> {
    for branch in &summary.branches {
        println!("✓ {}: {} documents", branch.name, branch.inserted);
    }
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize restore summary")?;
    println!("{}", json);
    Ok(())
}
