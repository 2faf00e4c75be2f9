// azure-leanix-sync/src/azure/mod.rs
pub(crate) mod arm;
pub(crate) mod cli;

use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{AzureConfig, AzureSource};
use crate::errors::{Result, SyncError};
use crate::utils::mapping::ProjectAppMapping;

pub const PROJECT_TAG_KEY: &str = "project";

/// Snapshot of one Azure resource carrying a recognized project tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "service")]
    pub service_type: String,
    pub provider: String,
    pub location: Option<String>,
    pub subscription_id: String,
    pub tags: BTreeMap<String, String>,
}

impl CloudResource {
    /// Value of the canonical `project` tag.
    pub fn project_tag(&self) -> Option<&str> {
        self.tags.get(PROJECT_TAG_KEY).map(String::as_str)
    }
}

/// A resource as returned by ARM and by `az resource list`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ArmResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Subscription {
    pub id: String,
    pub display_name: String,
}

/// Splits `Microsoft.Compute/virtualMachines` into provider and service type.
/// Nested types keep the last segment: `Microsoft.Sql/servers/databases` → `databases`.
pub fn split_resource_type(resource_type: &str) -> (String, String) {
    let mut segments = resource_type.split('/').filter(|s| !s.is_empty());
    let provider = segments.next().unwrap_or_default().to_string();
    let service = segments.last().map(str::to_string).unwrap_or_else(|| provider.clone());
    (provider, service)
}

/// Finds the first tag whose key is `project` (any case) and whose value is mapped.
pub fn select_project_tag(
    tags: &BTreeMap<String, String>,
    mapping: &ProjectAppMapping,
) -> Option<String> {
    tags.iter()
        .find(|(key, value)| key.eq_ignore_ascii_case(PROJECT_TAG_KEY) && mapping.contains(value))
        .map(|(_, value)| value.clone())
}

/// Converts an inventory entry into a [`CloudResource`] when it carries a mapped
/// project tag. Any differently-cased project keys are folded into `project`.
pub(crate) fn to_cloud_resource(
    resource: ArmResource,
    subscription_id: &str,
    mapping: &ProjectAppMapping,
) -> Option<CloudResource> {
    let tags = resource.tags.unwrap_or_default();
    let project = select_project_tag(&tags, mapping)?;

    let mut tags: BTreeMap<String, String> = tags
        .into_iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case(PROJECT_TAG_KEY))
        .collect();
    tags.insert(PROJECT_TAG_KEY.to_string(), project);

    let (provider, service_type) = split_resource_type(&resource.resource_type);
    Some(CloudResource {
        id: resource.id,
        name: resource.name,
        service_type,
        provider,
        location: resource.location,
        subscription_id: subscription_id.to_string(),
        tags,
    })
}

fn keep_subscription(subscription: &Subscription, wanted: Option<&Vec<String>>) -> bool {
    match wanted {
        Some(ids) => ids
            .iter()
            .any(|id| id.eq_ignore_ascii_case(&subscription.id)),
        None => true,
    }
}

/// Lists every resource, across the accessible subscriptions, whose project tag maps
/// to an application. Any failure is returned as [`SyncError::ResourceList`].
pub async fn list_tagged_resources(
    http: &Client,
    azure_config: &AzureConfig,
    mapping: &ProjectAppMapping,
) -> Result<Vec<CloudResource>> {
    collect_tagged_resources(http, azure_config, mapping)
        .await
        .map_err(|e| SyncError::ResourceList(format!("{:#}", e)))
}

async fn collect_tagged_resources(
    http: &Client,
    azure_config: &AzureConfig,
    mapping: &ProjectAppMapping,
) -> anyhow::Result<Vec<CloudResource>> {
    let arm_client = match azure_config.source {
        AzureSource::Arm => Some(arm::ArmClient::connect(http.clone(), &azure_config.credentials).await?),
        AzureSource::Cli => None,
    };

    let subscriptions = match &arm_client {
        Some(client) => client.list_subscriptions().await?,
        None => cli::list_subscriptions()?,
    };
    info!("Found {} Azure subscriptions", subscriptions.len());

    let mut resources = Vec::new();
    for subscription in subscriptions
        .iter()
        .filter(|s| keep_subscription(s, azure_config.subscriptions.as_ref()))
    {
        info!(
            "🔍 Processing subscription: {} ({})",
            subscription.display_name, subscription.id
        );
        let listed = match &arm_client {
            Some(client) => client.list_resources(&subscription.id).await?,
            None => cli::list_resources(&subscription.id)?,
        };
        debug!("Subscription {} returned {} resources", subscription.id, listed.len());

        for resource in listed {
            if let Some(tagged) = to_cloud_resource(resource, &subscription.id, mapping) {
                info!(
                    "Found resource {} with {}={} tag",
                    tagged.name,
                    PROJECT_TAG_KEY,
                    tagged.project_tag().unwrap_or_default()
                );
                resources.push(tagged);
            }
        }
    }

    info!("Total Azure resources with project tags: {}", resources.len());
    Ok(resources)
}
