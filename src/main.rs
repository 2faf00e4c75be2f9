//! Azure → LeanIX inventory sync
//!
//! Provides CLI interface for reconciling tagged Azure resources with LeanIX IT Components

// azure-leanix-sync/src/main.rs
mod azure;
mod config;
mod errors;
mod leanix;
mod sync;
mod utils;

use anyhow::{Context, Result};
use config::{
    AppConfig, OperationConfig, load_list_config_from_json, load_sync_config_from_json,
    load_verify_config_from_json,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Main entry point for the sync tool
#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run_app().await {
        Ok(_) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app() -> Result<()> {
    // CONFIG_PATH overrides the config.json next to the working directory.
    let config_path = env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let mut app_config = AppConfig::load_from_json(&config_path)
        .context(format!("Failed to load application configuration from {}", config_path.display()))?;

    let args: Vec<String> = env::args().collect();
    let choice = if args.len() > 1 {
        args[1].trim().to_string()
    } else {
        prompt_choice()?
    };

    match choice.as_str() {
        "1" | "sync" => {
            println!("🚀 Starting Sync Process...");
            let sync_config = load_sync_config_from_json(&app_config.raw_json_config)
                .context("Failed to load sync configuration from JSON")?;
            app_config.operation = Some(OperationConfig::Sync(sync_config));
            sync::run_sync_flow(&app_config).await
                .context("Sync process failed")?;
        }
        "2" | "list" => {
            println!("🔍 Listing tagged Azure resources...");
            let list_config = load_list_config_from_json(&app_config.raw_json_config)
                .context("Failed to load list configuration from JSON")?;
            app_config.operation = Some(OperationConfig::List(list_config));
            sync::run_list_flow(&app_config).await
                .context("Listing Azure resources failed")?;
        }
        "3" | "verify" => {
            println!("🔐 Verifying LeanIX credentials...");
            let verify_config = load_verify_config_from_json(&app_config.raw_json_config)
                .context("Failed to load verify configuration from JSON")?;
            app_config.operation = Some(OperationConfig::Verify(verify_config));
            sync::run_verify_flow(&app_config).await
                .context("Credential verification failed")?;
        }
        _ => {
            println!("❌ Invalid choice. Please enter '1' (sync), '2' (list), or '3' (verify).");
            anyhow::bail!("Invalid operation choice");
        }
    }
    Ok(())
}

/// Prompts user to select an operation
///
/// Returns the user's choice as String
fn prompt_choice() -> Result<String> {
    use std::io::{Write, stdin, stdout};

    println!("Select an operation:");
    println!("1. Sync Azure resources to LeanIX (or type 'sync')");
    println!("2. List tagged Azure resources (or type 'list')");
    println!("3. Verify LeanIX credentials (or type 'verify')");
    print!("Enter your choice: ");
    stdout().flush().context("Failed to flush stdout")?;

    let mut input = String::new();
    stdin().read_line(&mut input).context("Failed to read user input")?;
    Ok(input.trim().to_string())
}
