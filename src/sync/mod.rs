// azure-leanix-sync/src/sync/mod.rs
pub(crate) mod logic;
pub(crate) mod report;

use anyhow::{Context, Result};
use log::{error, info};
use reqwest::Client;

use crate::azure;
use crate::config::{AppConfig, SyncConfig};
use crate::leanix::auth::fetch_access_token;
use crate::leanix::client::LeanixClient;
use crate::utils::current_user;
use logic::Reconciler;
use report::{ErrorReport, SyncReport};

/// Builds the HTTP client shared by the Azure and LeanIX calls of one run.
pub fn build_http_client(app_config: &AppConfig) -> Result<Client> {
    Client::builder()
        .timeout(app_config.http_timeout)
        .user_agent(concat!("azure-leanix-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Public entry point for the sync process.
/// Writes the results file on success and the error file on a fatal failure.
pub async fn run_sync_flow(app_config: &AppConfig) -> Result<SyncReport> {
    let sync_config = match &app_config.operation {
        Some(crate::config::OperationConfig::Sync(cfg)) => cfg,
        _ => anyhow::bail!("Sync operation selected but no sync configuration found."),
    };

    match perform_sync_orchestration(app_config, sync_config).await {
        Ok(report) => {
            let results_file = &app_config.output.results_file;
            report::write_json_file(results_file, &report)?;
            report::print_summary(&report);
            println!("Results saved to {}", results_file.display());
            Ok(report)
        }
        Err(e) => {
            let error_file = &app_config.output.error_file;
            println!("Execution failed: {:#}", e);
            match report::write_json_file(error_file, &ErrorReport::from_error(&e)) {
                Ok(()) => println!("Error details saved to {}", error_file.display()),
                Err(write_err) => error!("Could not save error details: {:#}", write_err),
            }
            Err(e)
        }
    }
}

/// Lists the tagged Azure resources, authenticates against LeanIX and reconciles.
async fn perform_sync_orchestration(
    app_config: &AppConfig,
    sync_config: &SyncConfig,
) -> Result<SyncReport> {
    println!("⚙️ Starting Azure → LeanIX synchronization...");
    let http = build_http_client(app_config)?;

    let resources = azure::list_tagged_resources(&http, &sync_config.azure, &app_config.mapping)
        .await
        .context("Azure resource enumeration failed")?;

    let token = fetch_access_token(&http, &sync_config.leanix)
        .await
        .context("LeanIX authentication failed")?;
    let catalog = LeanixClient::new(http, &sync_config.leanix.base_url, token);

    info!("Reconciling {} tagged resources", resources.len());
    let report = Reconciler::new(&catalog, &app_config.mapping, current_user())
        .run(&resources)
        .await
        .context("Reconciliation aborted")?;

    println!("✅ Synchronization completed.");
    Ok(report)
}

/// Prints the tagged Azure resources and the application each maps to.
/// The catalog is not contacted.
pub async fn run_list_flow(app_config: &AppConfig) -> Result<()> {
    let list_config = match &app_config.operation {
        Some(crate::config::OperationConfig::List(cfg)) => cfg,
        _ => anyhow::bail!("List operation selected but no list configuration found."),
    };

    let http = build_http_client(app_config)?;
    let resources = azure::list_tagged_resources(&http, &list_config.azure, &app_config.mapping)
        .await
        .context("Azure resource enumeration failed")?;

    if resources.is_empty() {
        println!("No Azure resources carry a mapped project tag.");
        return Ok(());
    }

    for resource in &resources {
        let project = resource.project_tag().unwrap_or_default();
        println!(
            "  {} [{}] project={} → {} ({})",
            resource.name,
            resource.service_type,
            project,
            app_config.mapping.resolve(project).unwrap_or("-"),
            crate::leanix::component_name(&resource.service_type)
        );
    }
    println!("✓ {} tagged resources found.", resources.len());
    Ok(())
}

/// Exchanges the configured LeanIX API token to check the credentials.
pub async fn run_verify_flow(app_config: &AppConfig) -> Result<()> {
    let verify_config = match &app_config.operation {
        Some(crate::config::OperationConfig::Verify(cfg)) => cfg,
        _ => anyhow::bail!("Verify operation selected but no verify configuration found."),
    };

    let http = build_http_client(app_config)?;
    fetch_access_token(&http, &verify_config.leanix)
        .await
        .context("LeanIX authentication failed")?;
    println!(
        "✓ LeanIX credentials accepted by {}",
        verify_config.leanix.base_url
    );

    println!("Configured project mappings:");
    for (project, application) in app_config.mapping.iter() {
        println!("  {} → {}", project, application);
    }
    Ok(())
}
