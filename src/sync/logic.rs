// azure-leanix-sync/src/sync/logic.rs
use log::{error, info, warn};
use std::collections::{HashMap, HashSet};

use crate::azure::CloudResource;
use crate::errors::{Result, SyncError};
use crate::leanix::{Catalog, FactSheet, IT_COMPONENT_TYPE, STATUS_ACTIVE, service_from_component_name};
use crate::utils::current_timestamp;
use crate::utils::mapping::{ProjectAppMapping, normalize_application_name};

use super::report::{
    ComponentRecord, DeletedRelation, RelationRecord, RelationStatus, ResourceFailure,
    ResourceOutcome, Stage, SyncReport,
};

/// Normalized application name → lowercased service types it currently has resources for.
pub fn map_services_by_application(
    resources: &[CloudResource],
    mapping: &ProjectAppMapping,
) -> HashMap<String, HashSet<String>> {
    let mut services: HashMap<String, HashSet<String>> = HashMap::new();
    for resource in resources {
        let Some(app_name) = resource.project_tag().and_then(|tag| mapping.resolve(tag)) else {
            continue;
        };
        services
            .entry(normalize_application_name(app_name))
            .or_default()
            .insert(resource.service_type.to_lowercase());
    }
    services
}

/// Drives one reconciliation run against a [`Catalog`].
///
/// Resources are handled one at a time. Application lookups are cached for the
/// run, and each pre-existing IT Component is cleaned up at most once.
pub struct Reconciler<'a, C: Catalog> {
    catalog: &'a C,
    mapping: &'a ProjectAppMapping,
    user: String,
    application_ids: HashMap<String, String>,
    application_names: HashMap<String, String>,
    cleaned_components: HashSet<String>,
}

impl<'a, C: Catalog> Reconciler<'a, C> {
    pub fn new(catalog: &'a C, mapping: &'a ProjectAppMapping, user: String) -> Self {
        Reconciler {
            catalog,
            mapping,
            user,
            application_ids: HashMap::new(),
            application_names: HashMap::new(),
            cleaned_components: HashSet::new(),
        }
    }

    /// Reconciles every resource and returns the run report. Only fatal errors
    /// (the catalog rejecting the access token) abort the run; everything else is
    /// recorded per resource.
    pub async fn run(&mut self, resources: &[CloudResource]) -> Result<SyncReport> {
        let mut report = SyncReport::new(resources.len());

        for resource in resources {
            match self.process_resource(resource, Some(resources)).await {
                Ok(Some(outcome)) => report.record_outcome(outcome),
                Ok(None) => report.record_skipped(),
                Err((_, e)) if e.is_fatal() => return Err(e),
                Err((stage, e)) => {
                    error!("❌ Error processing resource {}: {}", resource.name, e);
                    report.record_failure(ResourceFailure {
                        resource: resource.clone(),
                        stage,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    /// Runs the per-resource pipeline. `Ok(None)` means the resource has no mapped
    /// project tag and was skipped without touching the catalog. Errors carry the
    /// last stage the resource reached.
    pub async fn process_resource(
        &mut self,
        resource: &CloudResource,
        all_resources: Option<&[CloudResource]>,
    ) -> std::result::Result<Option<ResourceOutcome>, (Stage, SyncError)> {
        info!(
            "Processing resource: {} ({})",
            resource.name, resource.service_type
        );

        let Some((project, app_name)) = resource
            .project_tag()
            .and_then(|tag| self.mapping.resolve(tag).map(|app| (tag.to_string(), app.to_string())))
        else {
            info!("No matching project tag found for resource: {}", resource.name);
            return Ok(None);
        };

        let mut stage = Stage::Start;

        let (component, created) = self
            .resolve_component(&resource.service_type)
            .await
            .map_err(|e| (stage, e))?;
        stage = Stage::ComponentResolved;

        let mut relation = RelationRecord {
            project,
            application: app_name.clone(),
            application_id: None,
            relation_id: None,
            status: RelationStatus::Error,
            error: None,
        };

        match self.resolve_application_id(&app_name).await {
            Ok(app_id) => {
                stage = Stage::ApplicationResolved;
                relation.application_id = Some(app_id.clone());
                match self.resolve_relation(&component.id, &app_id).await {
                    Ok((relation_id, status)) => {
                        stage = Stage::RelationResolved;
                        relation.relation_id = Some(relation_id);
                        relation.status = status;
                    }
                    Err(e) if e.is_fatal() => return Err((stage, e)),
                    Err(e) => {
                        error!("Failed to create relation for project {}: {}", relation.project, e);
                        relation.error = Some(e.to_string());
                    }
                }
            }
            Err(e) if e.is_fatal() => return Err((stage, e)),
            Err(e) => {
                error!("Failed to resolve application for project {}: {}", relation.project, e);
                relation.error = Some(e.to_string());
            }
        }

        let mut deleted_relations = Vec::new();
        let mut cleanup_error = None;
        let cleanup_due = !created && !self.cleaned_components.contains(&component.id);
        match all_resources {
            Some(all) if cleanup_due => match self.cleanup_component_relations(&component, all).await {
                Ok(deleted) => {
                    self.cleaned_components.insert(component.id.clone());
                    deleted_relations = deleted;
                    if stage == Stage::RelationResolved {
                        stage = Stage::Cleaned;
                    }
                }
                Err(e) if e.is_fatal() => return Err((stage, e)),
                Err(e) => {
                    error!("Error cleaning up relations of {}: {}", component.name, e);
                    cleanup_error = Some(e.to_string());
                }
            },
            _ => {
                if stage == Stage::RelationResolved {
                    stage = Stage::Cleaned;
                }
            }
        }
        if stage == Stage::Cleaned {
            stage = Stage::Done;
        }

        Ok(Some(ResourceOutcome {
            resource_id: resource.id.clone(),
            resource_name: resource.name.clone(),
            service: resource.service_type.clone(),
            it_component: ComponentRecord {
                id: component.id.clone(),
                name: component.name.clone(),
                fact_sheet_type: component
                    .fact_sheet_type
                    .clone()
                    .unwrap_or_else(|| IT_COMPONENT_TYPE.to_string()),
                status: component
                    .status
                    .clone()
                    .unwrap_or_else(|| STATUS_ACTIVE.to_string()),
                created,
            },
            relations: vec![relation],
            deleted_relations,
            cleanup_error,
            stage,
            timestamp: current_timestamp(),
            user: self.user.clone(),
        }))
    }

    /// Find-or-create the IT Component; the flag tells whether it was created now.
    async fn resolve_component(&self, service_type: &str) -> Result<(FactSheet, bool)> {
        if let Some(existing) = self.catalog.find_it_component(service_type).await? {
            info!(
                "Using existing IT Component: {} for service {}",
                existing.id, service_type
            );
            return Ok((existing, false));
        }
        let (component, inserted) = self.catalog.create_it_component(service_type).await?;
        if inserted {
            info!(
                "Created new IT Component: {} for service {}",
                component.id, service_type
            );
        } else {
            info!(
                "IT Component {} for service {} appeared before creation, reusing it",
                component.id, service_type
            );
        }
        Ok((component, inserted))
    }

    async fn resolve_application_id(&mut self, app_name: &str) -> Result<String> {
        if let Some(id) = self.application_ids.get(app_name) {
            return Ok(id.clone());
        }
        let id = self.catalog.find_application(app_name).await?;
        info!("Found Application ID {} for {}", id, app_name);
        self.application_ids.insert(app_name.to_string(), id.clone());
        self.application_names.insert(id.clone(), app_name.to_string());
        Ok(id)
    }

    async fn resolve_relation(
        &self,
        component_id: &str,
        app_id: &str,
    ) -> Result<(String, RelationStatus)> {
        if let Some(existing) = self.catalog.find_relation(component_id, app_id).await? {
            info!("Found existing relation between {} and {}", component_id, app_id);
            return Ok((existing.id, RelationStatus::Existing));
        }
        info!("Creating new relation between {} and {}", component_id, app_id);
        let created = self.catalog.create_relation(component_id, app_id).await?;
        Ok((created.id, RelationStatus::New))
    }

    async fn application_name(&mut self, app_id: &str) -> Result<Option<String>> {
        if let Some(name) = self.application_names.get(app_id) {
            return Ok(Some(name.clone()));
        }
        let name = self
            .catalog
            .get_fact_sheet(app_id)
            .await?
            .map(|fs| fs.name)
            .filter(|name| !name.is_empty());
        if let Some(name) = &name {
            self.application_names.insert(app_id.to_string(), name.clone());
        }
        Ok(name)
    }

    /// Deletes relations of `component` whose application no longer owns a resource
    /// of the component's service type in `all_resources`.
    async fn cleanup_component_relations(
        &mut self,
        component: &FactSheet,
        all_resources: &[CloudResource],
    ) -> Result<Vec<DeletedRelation>> {
        info!("Starting cleanup for IT Component {}", component.id);

        let Some(service) = service_from_component_name(&component.name) else {
            warn!("Invalid IT Component name format: {}", component.name);
            return Ok(Vec::new());
        };

        let existing_relations = self.catalog.list_relations(&component.id).await?;
        if existing_relations.is_empty() {
            info!("No existing relations found to clean up");
            return Ok(Vec::new());
        }

        let services_by_app = map_services_by_application(all_resources, self.mapping);
        let mut deleted = Vec::new();

        for relation in existing_relations.iter().filter(|r| r.is_application_link()) {
            let Some(app_id) = relation.to_id.as_deref() else {
                continue;
            };
            let Some(app_name) = self.application_name(app_id).await? else {
                continue;
            };

            let still_used = services_by_app
                .get(&normalize_application_name(&app_name))
                .is_some_and(|services| services.contains(&service));
            if still_used {
                info!(
                    "Application {} still has {} resources, keeping relation {}",
                    app_name, service, relation.id
                );
                continue;
            }

            info!(
                "Application {} no longer has {} resources, deleting relation {}",
                app_name, service, relation.id
            );
            if self.catalog.delete_relation(app_id, &relation.id).await {
                deleted.push(DeletedRelation {
                    relation_id: relation.id.clone(),
                    it_component_name: component.name.clone(),
                    service: service.clone(),
                    application_id: app_id.to_string(),
                    application_name: app_name,
                    timestamp: current_timestamp(),
                    user: self.user.clone(),
                });
            } else {
                warn!("Relation {} was not deleted", relation.id);
            }
        }

        Ok(deleted)
    }
}
