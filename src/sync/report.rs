// azure-leanix-sync/src/sync/report.rs
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::azure::CloudResource;
use crate::utils::{current_timestamp, current_user};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub timestamp: String,
    pub user: String,
}

impl RunMetadata {
    pub fn now() -> Self {
        RunMetadata {
            timestamp: current_timestamp(),
            user: current_user(),
        }
    }
}

/// Pipeline stage a resource had reached; failures record where they stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Start,
    ComponentResolved,
    ApplicationResolved,
    RelationResolved,
    Cleaned,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationStatus {
    New,
    Existing,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub fact_sheet_type: String,
    pub status: String,
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationRecord {
    pub project: String,
    pub application: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_id: Option<String>,
    pub status: RelationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletedRelation {
    pub relation_id: String,
    pub it_component_name: String,
    pub service: String,
    pub application_id: String,
    pub application_name: String,
    pub timestamp: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceOutcome {
    pub resource_id: String,
    pub resource_name: String,
    pub service: String,
    pub it_component: ComponentRecord,
    pub relations: Vec<RelationRecord>,
    pub deleted_relations: Vec<DeletedRelation>,
    /// Set when pruning this component's stale relations failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,
    pub stage: Stage,
    pub timestamp: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceFailure {
    pub resource: CloudResource,
    pub stage: Stage,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResourceResult {
    Processed(ResourceOutcome),
    Failed(ResourceFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub azure_resources: usize,
    pub resources_processed: usize,
    pub resources_skipped: usize,
    pub resources_failed: usize,
    pub components_created: usize,
    pub relations_created: usize,
    pub relations_deleted: usize,
    pub cleanup_errors: usize,
    pub leanix_results: Vec<ResourceResult>,
    pub metadata: RunMetadata,
}

impl SyncReport {
    pub fn new(azure_resources: usize) -> Self {
        SyncReport {
            azure_resources,
            resources_processed: 0,
            resources_skipped: 0,
            resources_failed: 0,
            components_created: 0,
            relations_created: 0,
            relations_deleted: 0,
            cleanup_errors: 0,
            leanix_results: Vec::new(),
            metadata: RunMetadata::now(),
        }
    }

    pub fn record_skipped(&mut self) {
        self.resources_skipped += 1;
    }

    pub fn record_outcome(&mut self, outcome: ResourceOutcome) {
        self.resources_processed += 1;
        if outcome.it_component.created {
            self.components_created += 1;
        }
        self.relations_created += outcome
            .relations
            .iter()
            .filter(|r| r.status == RelationStatus::New)
            .count();
        self.relations_deleted += outcome.deleted_relations.len();
        if outcome.cleanup_error.is_some() {
            self.cleanup_errors += 1;
        }
        self.leanix_results.push(ResourceResult::Processed(outcome));
    }

    pub fn record_failure(&mut self, failure: ResourceFailure) {
        self.resources_failed += 1;
        self.leanix_results.push(ResourceResult::Failed(failure));
    }

    /// Relation entries that ended in an error, across all processed resources.
    pub fn relation_errors(&self) -> usize {
        self.leanix_results
            .iter()
            .filter_map(|r| match r {
                ResourceResult::Processed(outcome) => Some(outcome),
                ResourceResult::Failed(_) => None,
            })
            .flat_map(|outcome| outcome.relations.iter())
            .filter(|r| r.status == RelationStatus::Error)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error: String,
    pub metadata: RunMetadata,
}

impl ErrorReport {
    pub fn from_error(error: &anyhow::Error) -> Self {
        ErrorReport {
            error: format!("{:#}", error),
            metadata: RunMetadata::now(),
        }
    }
}

/// Pretty-prints `value` as JSON into `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create parent directory for {}", path.display())
            })?;
        }
    }
    let content = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialize report for {}", path.display()))?;
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

pub fn print_summary(report: &SyncReport) {
    println!("\nExecution complete.");
    println!("Total Azure resources found: {}", report.azure_resources);
    println!("Resources processed: {}", report.resources_processed);
    println!("Resources skipped: {}", report.resources_skipped);
    println!("Resources failed: {}", report.resources_failed);
    println!("IT Components created: {}", report.components_created);
    println!("Relations created: {}", report.relations_created);
    println!("Relations deleted: {}", report.relations_deleted);
    let relation_errors = report.relation_errors();
    if relation_errors > 0 {
        println!("⚠️  Relation errors: {}", relation_errors);
    }
    if report.cleanup_errors > 0 {
        println!("⚠️  Cleanup errors: {}", report.cleanup_errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn outcome(created: bool, status: RelationStatus) -> ResourceOutcome {
        ResourceOutcome {
            resource_id: "r1".into(),
            resource_name: "st1".into(),
            service: "Storage".into(),
            it_component: ComponentRecord {
                id: "c1".into(),
                name: "AZURE-STORAGE".into(),
                fact_sheet_type: "ITComponent".into(),
                status: "ACTIVE".into(),
                created,
            },
            relations: vec![RelationRecord {
                project: "xemay".into(),
                application: "Auth0-AS".into(),
                application_id: Some("a1".into()),
                relation_id: None,
                status,
                error: None,
            }],
            deleted_relations: Vec::new(),
            cleanup_error: None,
            stage: Stage::Done,
            timestamp: "2026-10-19 10:00:00".into(),
            user: "tester".into(),
        }
    }

    #[test]
    fn test_counters_follow_recorded_results() {
        let mut report = SyncReport::new(3);
        report.record_outcome(outcome(true, RelationStatus::New));
        report.record_outcome(outcome(false, RelationStatus::Error));
        report.record_skipped();

        assert_eq!(report.resources_processed, 2);
        assert_eq!(report.resources_skipped, 1);
        assert_eq!(report.components_created, 1);
        assert_eq!(report.relations_created, 1);
        assert_eq!(report.relation_errors(), 1);
        assert_eq!(report.cleanup_errors, 0);

        let mut failed_cleanup = outcome(false, RelationStatus::Existing);
        failed_cleanup.stage = Stage::RelationResolved;
        failed_cleanup.cleanup_error = Some("relation listing failed with status 500".into());
        report.record_outcome(failed_cleanup);
        assert_eq!(report.cleanup_errors, 1);
        assert_eq!(report.resources_processed, 3);
    }

    #[test]
    fn test_serialized_shape() {
        let mut report = SyncReport::new(1);
        report.record_outcome(outcome(true, RelationStatus::New));
        report.record_failure(ResourceFailure {
            resource: CloudResource {
                id: "r2".into(),
                name: "vm1".into(),
                service_type: "virtualMachines".into(),
                provider: "Microsoft.Compute".into(),
                location: None,
                subscription_id: "s1".into(),
                tags: BTreeMap::new(),
            },
            stage: Stage::Start,
            error: "boom".into(),
        });

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["leanix_results"][0]["relations"][0]["status"], "new");
        assert_eq!(value["leanix_results"][0]["it_component"]["type"], "ITComponent");
        assert_eq!(value["leanix_results"][0]["stage"], "DONE");
        assert!(value["leanix_results"][0]["relations"][0].get("error").is_none());
        assert!(value["leanix_results"][0].get("cleanup_error").is_none());
        assert_eq!(value["leanix_results"][1]["resource"]["service"], "virtualMachines");
        assert_eq!(value["leanix_results"][1]["stage"], "START");
        assert_eq!(value["resources_failed"], 1);
    }

    #[test]
    fn test_write_json_file_creates_parent_dirs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("error.json");
        let report = ErrorReport::from_error(&anyhow::anyhow!("token rejected"));

        write_json_file(&path, &report)?;

        let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(written["error"], "token rejected");
        assert!(written["metadata"]["timestamp"].is_string());
        Ok(())
    }
}
