// azure-leanix-sync/src/azure/arm.rs
use anyhow::{Context, Result};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{ArmResource, Subscription, cli};
use crate::config::AzureCredentials;

pub const ARM_ENDPOINT: &str = "https://management.azure.com";
const ARM_SCOPE: &str = "https://management.azure.com/.default";
const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
const SUBSCRIPTIONS_API_VERSION: &str = "2020-01-01";
const RESOURCES_API_VERSION: &str = "2021-04-01";

/// One page of an ARM list call.
#[derive(Debug, Deserialize)]
struct ArmPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArmSubscription {
    #[serde(rename = "subscriptionId")]
    subscription_id: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Read-only client for the Azure Resource Manager API.
pub struct ArmClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl ArmClient {
    /// Acquires a bearer token for ARM using the configured credentials.
    pub async fn connect(http: Client, credentials: &AzureCredentials) -> Result<Self> {
        let token = match credentials {
            AzureCredentials::AccessToken(token) => token.clone(),
            AzureCredentials::ServicePrincipal {
                tenant_id,
                client_id,
                client_secret,
            } => fetch_service_principal_token(&http, tenant_id, client_id, client_secret).await?,
            AzureCredentials::AzureCli => cli::get_access_token(ARM_ENDPOINT)?,
        };
        Ok(ArmClient::new(http, ARM_ENDPOINT, token))
    }

    fn new(http: Client, endpoint: &str, token: String) -> Self {
        ArmClient {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        }
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>> {
        let url = subscriptions_url(&self.endpoint);
        let raw: Vec<ArmSubscription> = self
            .get_all_pages(url)
            .await
            .context("Failed to list Azure subscriptions")?;

        Ok(raw
            .into_iter()
            .filter(|s| s.state.as_deref().is_none_or(|state| state.eq_ignore_ascii_case("Enabled")))
            .map(|s| Subscription {
                display_name: s.display_name.unwrap_or_else(|| s.subscription_id.clone()),
                id: s.subscription_id,
            })
            .collect())
    }

    pub async fn list_resources(&self, subscription_id: &str) -> Result<Vec<ArmResource>> {
        let url = resources_url(&self.endpoint, subscription_id);
        self.get_all_pages(url)
            .await
            .with_context(|| format!("Failed to list resources for subscription {}", subscription_id))
    }

    /// Follows `nextLink` until the listing is exhausted.
    async fn get_all_pages<T: DeserializeOwned>(&self, first_url: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .send()
                .await
                .with_context(|| format!("Request to {} failed", url))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!(
                    "Azure API request failed. Status: {}\nResponse: {}",
                    status,
                    body
                ));
            }

            let page: ArmPage<T> = response
                .json()
                .await
                .with_context(|| format!("Failed to decode Azure response from {}", url))?;
            pages += 1;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }

        debug!("Fetched {} items over {} pages", items.len(), pages);
        Ok(items)
    }
}

fn subscriptions_url(endpoint: &str) -> String {
    format!("{}/subscriptions?api-version={}", endpoint, SUBSCRIPTIONS_API_VERSION)
}

fn resources_url(endpoint: &str, subscription_id: &str) -> String {
    format!(
        "{}/subscriptions/{}/resources?api-version={}",
        endpoint, subscription_id, RESOURCES_API_VERSION
    )
}

/// Client-credentials exchange against Microsoft Entra ID.
async fn fetch_service_principal_token(
    http: &Client,
    tenant_id: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String> {
    let url = format!("{}/{}/oauth2/v2.0/token", LOGIN_ENDPOINT, tenant_id);
    info!("Requesting Azure token for service principal {}", client_id);

    let response = http
        .post(&url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("scope", ARM_SCOPE),
        ])
        .send()
        .await
        .context("Azure token request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!(
            "Azure token request for tenant {} failed. Status: {}\nResponse: {}",
            tenant_id,
            status,
            body
        ));
    }

    let token: TokenResponse = response
        .json()
        .await
        .context("Azure token response did not contain an access_token")?;
    Ok(token.access_token)
}
