// azure-leanix-sync/src/leanix/client.rs
use log::{error, info, warn};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{
    APPLICATION_TYPE, Catalog, FactSheet, IT_COMPONENT_TYPE, RELATION_TYPE, Relation,
    STATUS_ACTIVE, component_name, extract_created_id, it_component_payload, match_application,
    relation_payload,
};
use crate::errors::{Result, SyncError};
use crate::utils::current_date;

const FACT_SHEETS_PATH: &str = "/services/pathfinder/v1/factSheets";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct DataItem<T> {
    data: Option<T>,
}

/// REST client for the LeanIX pathfinder API, authenticated with a bearer token.
pub struct LeanixClient {
    http: Client,
    base_url: String,
    token: String,
}

impl LeanixClient {
    pub fn new(http: Client, base_url: &str, token: String) -> Self {
        LeanixClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn fact_sheets_url(&self) -> String {
        format!("{}{}", self.base_url, FACT_SHEETS_PATH)
    }

    fn fact_sheet_url(&self, id: &str) -> String {
        format!("{}/{}", self.fact_sheets_url(), id)
    }

    fn relations_url(&self, fact_sheet_id: &str) -> String {
        format!("{}/relations", self.fact_sheet_url(fact_sheet_id))
    }

    /// Sends an authenticated request; non-2xx answers become [`SyncError::Api`]
    /// (or [`SyncError::Authentication`] for 401) after their status and body
    /// are logged.
    async fn send_checked(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request.bearer_auth(&self.token).send().await.map_err(|e| {
            error!("API request error during {}: {}", context, e);
            SyncError::Http(e)
        })?;
        check_status(response, context).await
    }

    async fn search_fact_sheets(
        &self,
        fact_sheet_type: &str,
        criteria: (&str, &str),
        context: &str,
    ) -> Result<Vec<FactSheet>> {
        let request = self.http.get(self.fact_sheets_url()).query(&[
            ("type", fact_sheet_type),
            ("pageSize", PAGE_SIZE),
            criteria,
        ]);
        let response = self.send_checked(request, context).await?;
        let list: DataList<FactSheet> = response.json().await?;
        Ok(list.data)
    }
}

async fn check_status(response: Response, context: &str) -> Result<Response> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        let body = response.text().await.unwrap_or_default();
        error!("API request failed during {}. Status: {}", context, status.as_u16());
        error!("Response: {}", body);
        if status == StatusCode::UNAUTHORIZED {
            return Err(SyncError::Authentication(format!(
                "{} rejected the access token: {}",
                context, body
            )));
        }
        return Err(SyncError::Api {
            context: context.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn name_filter(name: &str) -> String {
    format!("name=\"{}\"", name)
}

impl Catalog for LeanixClient {
    async fn find_it_component(&self, service_type: &str) -> Result<Option<FactSheet>> {
        let display_name = component_name(service_type);
        info!("Checking for existing IT Component: {}", display_name);

        let filter = name_filter(&display_name);
        let candidates = self
            .search_fact_sheets(IT_COMPONENT_TYPE, ("filter", filter.as_str()), "IT Component lookup")
            .await?;

        match candidates.into_iter().find(|fs| fs.name == display_name) {
            Some(found) => {
                info!("Found existing IT Component with ID: {}", found.id);
                Ok(Some(found))
            }
            None => {
                info!("No existing IT Component found for: {}", display_name);
                Ok(None)
            }
        }
    }

    async fn create_it_component(&self, service_type: &str) -> Result<(FactSheet, bool)> {
        if let Some(existing) = self.find_it_component(service_type).await? {
            return Ok((existing, false));
        }

        let display_name = component_name(service_type);
        info!("Creating fact sheet for {}", display_name);

        let request = self
            .http
            .post(self.fact_sheets_url())
            .json(&it_component_payload(service_type, &current_date()));
        let response = self.send_checked(request, "IT Component creation").await?;
        let body: Value = response.json().await?;

        let id = extract_created_id(&body).ok_or_else(|| {
            SyncError::UnexpectedResponse(format!(
                "IT Component creation for {}: no id in {}",
                display_name, body
            ))
        })?;
        info!("IT Component created successfully with ID: {}", id);

        let component = FactSheet {
            id,
            name: display_name,
            fact_sheet_type: Some(IT_COMPONENT_TYPE.to_string()),
            status: Some(STATUS_ACTIVE.to_string()),
        };
        Ok((component, true))
    }

    async fn find_application(&self, name: &str) -> Result<String> {
        info!("Searching for application with name: {}", name);

        let filter = name_filter(name);
        let exact = self
            .search_fact_sheets(APPLICATION_TYPE, ("filter", filter.as_str()), "Application lookup")
            .await?;
        if let Some(id) = match_application(name, &exact)? {
            info!("Found exact matching Application {} with ID: {}", name, id);
            return Ok(id);
        }

        info!("No exact match found, trying alternative search for: {}", name);
        let broader = self
            .search_fact_sheets(APPLICATION_TYPE, ("query", name), "Application search")
            .await?;
        if let Some(id) = match_application(name, &broader)? {
            info!("Found matching Application using alternative search: {} with ID: {}", name, id);
            return Ok(id);
        }

        let available: Vec<&str> = exact
            .iter()
            .chain(broader.iter())
            .map(|fs| fs.name.as_str())
            .collect();
        error!("No matching Application found for name: {}", name);
        error!("Available applications: {:?}", available);
        Err(SyncError::ApplicationNotFound(name.to_string()))
    }

    async fn get_fact_sheet(&self, id: &str) -> Result<Option<FactSheet>> {
        let response = self
            .http
            .get(self.fact_sheet_url(id))
            .bearer_auth(&self.token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            warn!("Fact sheet {} not found", id);
            return Ok(None);
        }

        let response = check_status(response, "fact sheet lookup").await?;
        let item: DataItem<FactSheet> = response.json().await?;
        Ok(item.data)
    }

    async fn list_relations(&self, component_id: &str) -> Result<Vec<Relation>> {
        let request = self.http.get(self.relations_url(component_id));
        let response = self.send_checked(request, "relation listing").await?;
        let list: DataList<Relation> = response.json().await?;
        Ok(list.data)
    }

    async fn create_relation(&self, component_id: &str, app_id: &str) -> Result<Relation> {
        if let Some(existing) = self.find_relation(component_id, app_id).await? {
            info!("Using existing relation {}", existing.id);
            return Ok(existing);
        }

        let active_from = current_date();
        let request = self
            .http
            .post(self.relations_url(component_id))
            .json(&relation_payload(component_id, app_id, &active_from));
        let response = self.send_checked(request, "relation creation").await?;
        let body: Value = response.json().await?;

        let id = extract_created_id(&body).ok_or_else(|| {
            SyncError::UnexpectedResponse(format!(
                "relation creation between {} and {}: no id in {}",
                component_id, app_id, body
            ))
        })?;
        info!("Created new relation {} between {} and {}", id, component_id, app_id);

        Ok(Relation {
            id,
            from_id: Some(component_id.to_string()),
            to_id: Some(app_id.to_string()),
            relation_type: Some(RELATION_TYPE.to_string()),
            status: Some(STATUS_ACTIVE.to_string()),
            active_from: Some(active_from),
        })
    }

    async fn delete_relation(&self, app_id: &str, relation_id: &str) -> bool {
        let url = format!("{}/{}", self.relations_url(app_id), relation_id);
        match self
            .send_checked(self.http.delete(url), "relation deletion")
            .await
        {
            Ok(_) => {
                info!(
                    "Successfully deleted relation {} from application {}",
                    relation_id, app_id
                );
                true
            }
            Err(e) => {
                error!("Error deleting relation {}: {}", relation_id, e);
                false
            }
        }
    }
}
