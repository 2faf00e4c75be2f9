//! LeanIX catalog access: fact sheet and relation types, the [`Catalog`] seam the
//! reconciler talks to, and the request payloads shared by every implementation.

pub(crate) mod auth;
pub(crate) mod client;
#[cfg(test)]
pub(crate) mod memory;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::errors::{Result, SyncError};
use crate::utils::mapping::normalize_application_name;

pub const IT_COMPONENT_PREFIX: &str = "AZURE-";
pub const IT_COMPONENT_TYPE: &str = "ITComponent";
pub const APPLICATION_TYPE: &str = "Application";
pub const RELATION_TYPE: &str = "relITComponentToApplication";
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Catalog name of the IT Component for an Azure service type.
pub fn component_name(service_type: &str) -> String {
    format!("{}{}", IT_COMPONENT_PREFIX, service_type.to_uppercase())
}

/// Lowercased service type encoded in an IT Component name, if it is one of ours.
pub fn service_from_component_name(name: &str) -> Option<String> {
    name.strip_prefix(IT_COMPONENT_PREFIX)
        .filter(|service| !service.is_empty())
        .map(str::to_lowercase)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSheet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub fact_sheet_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from_id: Option<String>,
    #[serde(default)]
    pub to_id: Option<String>,
    #[serde(rename = "type", default)]
    pub relation_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub active_from: Option<String>,
}

impl Relation {
    /// IT Component → Application link. Untyped entries are treated as such.
    pub fn is_application_link(&self) -> bool {
        self.relation_type
            .as_deref()
            .is_none_or(|t| t == RELATION_TYPE)
    }

    pub fn points_to(&self, app_id: &str) -> bool {
        self.to_id.as_deref() == Some(app_id)
    }
}

/// Operations the reconciler needs from the EA catalog.
///
/// Every create re-checks for an existing record first. The catalog offers no
/// conditional insert, so two overlapping runs can still both create.
pub trait Catalog {
    async fn find_it_component(&self, service_type: &str) -> Result<Option<FactSheet>>;

    /// The flag is `true` only when this call inserted the component; a record
    /// found by the re-check comes back with `false`.
    async fn create_it_component(&self, service_type: &str) -> Result<(FactSheet, bool)>;

    /// Id of the application whose normalized name equals `name`'s.
    async fn find_application(&self, name: &str) -> Result<String>;

    async fn get_fact_sheet(&self, id: &str) -> Result<Option<FactSheet>>;

    async fn list_relations(&self, component_id: &str) -> Result<Vec<Relation>>;

    async fn find_relation(&self, component_id: &str, app_id: &str) -> Result<Option<Relation>> {
        let relations = self.list_relations(component_id).await?;
        Ok(relations
            .into_iter()
            .find(|r| r.is_application_link() && r.points_to(app_id)))
    }

    async fn create_relation(&self, component_id: &str, app_id: &str) -> Result<Relation>;

    /// Best-effort: failures are logged and reported as `false`.
    async fn delete_relation(&self, app_id: &str, relation_id: &str) -> bool;
}

/// Picks the application whose normalized name equals `name`'s among `candidates`.
/// Distinct ids sharing that name are an error rather than a silent first pick.
pub fn match_application(name: &str, candidates: &[FactSheet]) -> Result<Option<String>> {
    let wanted = normalize_application_name(name);
    let mut ids: Vec<String> = candidates
        .iter()
        .filter(|fs| normalize_application_name(&fs.name) == wanted)
        .map(|fs| fs.id.clone())
        .collect();
    ids.sort();
    ids.dedup();

    match ids.len() {
        0 => Ok(None),
        1 => Ok(ids.pop()),
        _ => Err(SyncError::ApplicationAmbiguous {
            name: name.to_string(),
            ids,
        }),
    }
}

pub fn it_component_payload(service_type: &str, start_date: &str) -> Value {
    json!({
        "name": component_name(service_type),
        "description": format!("Azure {} resource", service_type),
        "type": IT_COMPONENT_TYPE,
        "status": STATUS_ACTIVE,
        "fields": [{
            "name": "lifecycle",
            "data": {
                "type": "Lifecycle",
                "phases": [{
                    "phase": STATUS_ACTIVE,
                    "startDate": start_date
                }]
            }
        }]
    })
}

pub fn relation_payload(component_id: &str, app_id: &str, active_from: &str) -> Value {
    json!({
        "fromId": component_id,
        "toId": app_id,
        "type": RELATION_TYPE,
        "typeFromFS": IT_COMPONENT_TYPE,
        "typeToFS": APPLICATION_TYPE,
        "status": STATUS_ACTIVE,
        "activeFrom": active_from,
    })
}

/// Created records come back either bare or wrapped in `data`.
pub fn unwrap_data(value: &Value) -> &Value {
    value.get("data").filter(|data| data.is_object()).unwrap_or(value)
}

pub fn extract_created_id(value: &Value) -> Option<String> {
    unwrap_data(value)
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
