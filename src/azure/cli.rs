// azure-leanix-sync/src/azure/cli.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::process::{Command, Output};
use which::which;

use super::{ArmResource, Subscription};
use crate::errors::SyncError;

#[derive(Debug, Deserialize)]
struct CliAccount {
    id: String,
    name: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CliAccessToken {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Finds the az executable in the system PATH.
fn find_az_executable() -> Result<PathBuf> {
    which("az").context("az executable not found in PATH. Please install the Azure CLI and run 'az login', or configure a service principal.")
}

/// Runs `az <args> --output json` and decodes stdout.
fn run_az_json<T: DeserializeOwned>(args: &[&str]) -> Result<T> {
    let az_path = find_az_executable()?;
    let output = Command::new(&az_path)
        .args(args)
        .arg("--output")
        .arg("json")
        .output()
        .with_context(|| format!("Failed to execute az {}", args.join(" ")))?;

    check_az_output(args, &output)?;

    serde_json::from_slice(&output.stdout)
        .with_context(|| format!("Failed to parse JSON output of az {}", args.join(" ")))
}

fn check_az_output(args: &[&str], output: &Output) -> std::result::Result<(), SyncError> {
    if output.status.success() {
        return Ok(());
    }
    Err(SyncError::Command(format!(
        "az {} failed with status: {}\nStdout: {}\nStderr: {}",
        args.join(" "),
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )))
}

/// Bearer token for `resource` from the signed-in Azure CLI session.
pub fn get_access_token(resource: &str) -> Result<String> {
    let resource = format!("{}/", resource.trim_end_matches('/'));
    let token: CliAccessToken = run_az_json(&["account", "get-access-token", "--resource", &resource])
        .context("Failed to obtain an Azure access token from the Azure CLI")?;
    Ok(token.access_token)
}

pub fn list_subscriptions() -> Result<Vec<Subscription>> {
    let accounts: Vec<CliAccount> = run_az_json(&["account", "list"])
        .context("Failed to list Azure subscriptions with the Azure CLI")?;
    Ok(enabled_subscriptions(accounts))
}

pub fn list_resources(subscription_id: &str) -> Result<Vec<ArmResource>> {
    run_az_json(&["resource", "list", "--subscription", subscription_id])
        .with_context(|| format!("Failed to list resources for subscription {} with the Azure CLI", subscription_id))
}

fn enabled_subscriptions(accounts: Vec<CliAccount>) -> Vec<Subscription> {
    accounts
        .into_iter()
        .filter(|a| a.state.as_deref().is_none_or(|state| state.eq_ignore_ascii_case("Enabled")))
        .map(|a| Subscription {
            display_name: a.name.unwrap_or_else(|| a.id.clone()),
            id: a.id,
        })
        .collect()
}
