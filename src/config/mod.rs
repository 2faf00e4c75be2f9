// azure-leanix-sync/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::utils::mapping::ProjectAppMapping;

pub const DEFAULT_RESULTS_FILE: &str = "leanix_azure_integration_results.json";
pub const DEFAULT_ERROR_FILE: &str = "leanix_azure_integration_error.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonLeanixConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonAzureConfig {
    pub source: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub subscriptions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonOutputConfig {
    pub results_file: Option<PathBuf>,
    pub error_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub leanix: Option<JsonLeanixConfig>,
    pub azure: Option<JsonAzureConfig>,
    pub project_app_mapping: Option<HashMap<String, String>>,
    pub output: Option<JsonOutputConfig>,
    pub http_timeout_secs: Option<u64>,
}

// Application's internal configuration structs
#[derive(Debug, Clone)]
pub struct LeanixConfig {
    pub base_url: String,
    pub api_token: String,
}

/// Where the resource inventory comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AzureSource {
    /// Azure Resource Manager REST API.
    Arm,
    /// The `az` command line tool.
    Cli,
}

/// How a bearer token for the ARM API is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum AzureCredentials {
    AccessToken(String),
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    AzureCli,
}

#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub source: AzureSource,
    pub credentials: AzureCredentials,
    pub subscriptions: Option<Vec<String>>, // None lists every accessible subscription.
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub results_file: PathBuf,
    pub error_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub leanix: LeanixConfig,
    pub azure: AzureConfig,
}

#[derive(Debug, Clone)]
pub struct ListConfig {
    pub azure: AzureConfig,
}

#[derive(Debug, Clone)]
pub struct VerifyConfig {
    pub leanix: LeanixConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub operation: Option<OperationConfig>,
    pub mapping: ProjectAppMapping,
    pub output: OutputConfig,
    pub http_timeout: Duration,
    pub raw_json_config: RawJsonConfig,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Sync(SyncConfig),
    List(ListConfig),
    Verify(VerifyConfig),
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        Self::from_json_str(&config_content).with_context(|| {
            format!(
                "Failed to load configuration from {}",
                config_path.display()
            )
        })
    }

    pub fn from_json_str(config_content: &str) -> Result<Self> {
        let raw_json_config: RawJsonConfig =
            serde_json::from_str(config_content).context("Failed to parse config JSON")?;

        let mapping = raw_json_config
            .project_app_mapping
            .clone()
            .map(ProjectAppMapping::new)
            .context("project_app_mapping must be set in config.json")?;
        if mapping.is_empty() {
            return Err(anyhow::anyhow!(
                "project_app_mapping in config.json cannot be empty."
            ));
        }
        if let Some((tag, _)) = mapping.iter().find(|(_, app)| app.trim().is_empty()) {
            return Err(anyhow::anyhow!(
                "project_app_mapping entry '{}' has an empty application name.",
                tag
            ));
        }

        let output = OutputConfig {
            results_file: raw_json_config
                .output
                .as_ref()
                .and_then(|o| o.results_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_FILE)),
            error_file: raw_json_config
                .output
                .as_ref()
                .and_then(|o| o.error_file.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ERROR_FILE)),
        };

        let http_timeout = Duration::from_secs(
            raw_json_config
                .http_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
        );

        Ok(AppConfig {
            operation: None, // To be filled by main after parsing CLI args
            mapping,
            output,
            http_timeout,
            raw_json_config,
        })
    }
}

/// Environment value wins over the file value; blank values count as unset.
fn pick_setting(env_key: &str, file_value: Option<&String>) -> Option<String> {
    choose_setting(env::var(env_key).ok(), file_value)
}

fn choose_setting(env_value: Option<String>, file_value: Option<&String>) -> Option<String> {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| file_value.filter(|v| !v.trim().is_empty()).cloned())
        .map(|v| v.trim().to_string())
}

pub fn load_leanix_config_from_json(raw_config: &RawJsonConfig) -> Result<LeanixConfig> {
    let json = raw_config.leanix.as_ref();

    let base_url = pick_setting("LEANIX_BASE_URL", json.and_then(|l| l.base_url.as_ref()))
        .context("leanix.base_url must be set in config.json (or LEANIX_BASE_URL)")?;
    let parsed = Url::parse(&base_url)
        .with_context(|| format!("Invalid LeanIX base URL: {}", base_url))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(anyhow::anyhow!(
            "LeanIX base URL must use http or https, got: {}",
            base_url
        ));
    }

    let api_token = pick_setting("LEANIX_API_TOKEN", json.and_then(|l| l.api_token.as_ref()))
        .context("leanix.api_token must be set in config.json (or LEANIX_API_TOKEN)")?;

    Ok(LeanixConfig {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_token,
    })
}

pub fn load_azure_config_from_json(raw_config: &RawJsonConfig) -> Result<AzureConfig> {
    let json = raw_config.azure.as_ref();

    let source = match json.and_then(|a| a.source.as_deref()).map(str::trim) {
        None | Some("") | Some("arm") => AzureSource::Arm,
        Some("cli") => AzureSource::Cli,
        Some(other) => {
            return Err(anyhow::anyhow!(
                "azure.source must be either 'arm' or 'cli', got '{}'",
                other
            ));
        }
    };

    let access_token = pick_setting("AZURE_ACCESS_TOKEN", json.and_then(|a| a.access_token.as_ref()));
    let tenant_id = pick_setting("AZURE_TENANT_ID", json.and_then(|a| a.tenant_id.as_ref()));
    let client_id = pick_setting("AZURE_CLIENT_ID", json.and_then(|a| a.client_id.as_ref()));
    let client_secret =
        pick_setting("AZURE_CLIENT_SECRET", json.and_then(|a| a.client_secret.as_ref()));

    let credentials = resolve_azure_credentials(access_token, tenant_id, client_id, client_secret)?;

    let subscriptions = json
        .and_then(|a| a.subscriptions.clone())
        .map(|subs| {
            subs.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|subs| !subs.is_empty());

    Ok(AzureConfig {
        source,
        credentials,
        subscriptions,
    })
}

fn resolve_azure_credentials(
    access_token: Option<String>,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Result<AzureCredentials> {
    if let Some(token) = access_token {
        return Ok(AzureCredentials::AccessToken(token));
    }
    match (tenant_id, client_id, client_secret) {
        (Some(tenant_id), Some(client_id), Some(client_secret)) => {
            Ok(AzureCredentials::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            })
        }
        (None, None, None) => Ok(AzureCredentials::AzureCli),
        _ => Err(anyhow::anyhow!(
            "Azure service principal configuration is incomplete: tenant_id, client_id and client_secret must all be set."
        )),
    }
}

pub fn load_sync_config_from_json(raw_config: &RawJsonConfig) -> Result<SyncConfig> {
    Ok(SyncConfig {
        leanix: load_leanix_config_from_json(raw_config)
            .context("Failed to load LeanIX settings for sync operation")?,
        azure: load_azure_config_from_json(raw_config)
            .context("Failed to load Azure settings for sync operation")?,
    })
}

pub fn load_list_config_from_json(raw_config: &RawJsonConfig) -> Result<ListConfig> {
    Ok(ListConfig {
        azure: load_azure_config_from_json(raw_config)
            .context("Failed to load Azure settings for list operation")?,
    })
}

pub fn load_verify_config_from_json(raw_config: &RawJsonConfig) -> Result<VerifyConfig> {
    Ok(VerifyConfig {
        leanix: load_leanix_config_from_json(raw_config)
            .context("Failed to load LeanIX settings for verify operation")?,
    })
}
