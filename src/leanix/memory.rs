// In-memory catalog used by the reconciler tests.
use std::sync::Mutex;

use super::{
    APPLICATION_TYPE, Catalog, FactSheet, IT_COMPONENT_TYPE, RELATION_TYPE, Relation,
    STATUS_ACTIVE, component_name, match_application,
};
use crate::errors::{Result, SyncError};

#[derive(Default)]
struct State {
    fact_sheets: Vec<FactSheet>,
    relations: Vec<Relation>,
    next_id: usize,
    writes: usize,
    fail_deletes: bool,
}

impl State {
    fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Default)]
pub(crate) struct InMemoryCatalog {
    state: Mutex<State>,
}

impl InMemoryCatalog {
    pub fn with_applications(names: &[&str]) -> Self {
        let catalog = InMemoryCatalog::default();
        for name in names {
            catalog.add_application(name);
        }
        catalog
    }

    pub fn add_application(&self, name: &str) -> String {
        self.insert_fact_sheet(name, APPLICATION_TYPE, "app")
    }

    pub fn add_it_component(&self, name: &str) -> String {
        self.insert_fact_sheet(name, IT_COMPONENT_TYPE, "itc")
    }

    fn insert_fact_sheet(&self, name: &str, fact_sheet_type: &str, prefix: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id(prefix);
        state.fact_sheets.push(FactSheet {
            id: id.clone(),
            name: name.to_string(),
            fact_sheet_type: Some(fact_sheet_type.to_string()),
            status: Some(STATUS_ACTIVE.to_string()),
        });
        id
    }

    pub fn add_relation(&self, from_id: &str, to_id: &str, relation_type: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.allocate_id("rel");
        state.relations.push(Relation {
            id: id.clone(),
            from_id: Some(from_id.to_string()),
            to_id: Some(to_id.to_string()),
            relation_type: Some(relation_type.to_string()),
            status: Some(STATUS_ACTIVE.to_string()),
            active_from: None,
        });
        id
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.state.lock().unwrap().fail_deletes = fail;
    }

    /// Number of create and delete calls that changed the catalog.
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    pub fn component_count(&self) -> usize {
        self.count_fact_sheets(IT_COMPONENT_TYPE)
    }

    fn count_fact_sheets(&self, fact_sheet_type: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .fact_sheets
            .iter()
            .filter(|fs| fs.fact_sheet_type.as_deref() == Some(fact_sheet_type))
            .count()
    }

    pub fn relation_count(&self) -> usize {
        self.state.lock().unwrap().relations.len()
    }

    pub fn id_of(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .fact_sheets
            .iter()
            .find(|fs| fs.name == name)
            .map(|fs| fs.id.clone())
    }

    pub fn has_relation(&self, from_id: &str, to_id: &str) -> bool {
        self.state.lock().unwrap().relations.iter().any(|r| {
            r.from_id.as_deref() == Some(from_id) && r.to_id.as_deref() == Some(to_id)
        })
    }

    fn applications(&self) -> Vec<FactSheet> {
        self.state
            .lock()
            .unwrap()
            .fact_sheets
            .iter()
            .filter(|fs| fs.fact_sheet_type.as_deref() == Some(APPLICATION_TYPE))
            .cloned()
            .collect()
    }
}

impl Catalog for InMemoryCatalog {
    async fn find_it_component(&self, service_type: &str) -> Result<Option<FactSheet>> {
        let name = component_name(service_type);
        Ok(self
            .state
            .lock()
            .unwrap()
            .fact_sheets
            .iter()
            .find(|fs| {
                fs.name == name && fs.fact_sheet_type.as_deref() == Some(IT_COMPONENT_TYPE)
            })
            .cloned())
    }

    async fn create_it_component(&self, service_type: &str) -> Result<(FactSheet, bool)> {
        if let Some(existing) = self.find_it_component(service_type).await? {
            return Ok((existing, false));
        }
        let id = self.add_it_component(&component_name(service_type));
        self.state.lock().unwrap().writes += 1;
        let created = self
            .get_fact_sheet(&id)
            .await?
            .expect("component was just inserted");
        Ok((created, true))
    }

    async fn find_application(&self, name: &str) -> Result<String> {
        let applications = self.applications();
        let exact: Vec<FactSheet> = applications
            .iter()
            .filter(|fs| fs.name == name)
            .cloned()
            .collect();
        if let Some(id) = match_application(name, &exact)? {
            return Ok(id);
        }
        match_application(name, &applications)?
            .ok_or_else(|| SyncError::ApplicationNotFound(name.to_string()))
    }

    async fn get_fact_sheet(&self, id: &str) -> Result<Option<FactSheet>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .fact_sheets
            .iter()
            .find(|fs| fs.id == id)
            .cloned())
    }

    async fn list_relations(&self, component_id: &str) -> Result<Vec<Relation>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .relations
            .iter()
            .filter(|r| r.from_id.as_deref() == Some(component_id))
            .cloned()
            .collect())
    }

    async fn create_relation(&self, component_id: &str, app_id: &str) -> Result<Relation> {
        if let Some(existing) = self.find_relation(component_id, app_id).await? {
            return Ok(existing);
        }
        if self.get_fact_sheet(app_id).await?.is_none() {
            return Err(SyncError::Api {
                context: "relation creation".to_string(),
                status: 400,
                body: format!("unknown fact sheet {}", app_id),
            });
        }
        let id = self.add_relation(component_id, app_id, RELATION_TYPE);
        let mut state = self.state.lock().unwrap();
        state.writes += 1;
        Ok(state
            .relations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .expect("relation was just inserted"))
    }

    async fn delete_relation(&self, app_id: &str, relation_id: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return false;
        }
        let before = state.relations.len();
        state
            .relations
            .retain(|r| !(r.id == relation_id && r.to_id.as_deref() == Some(app_id)));
        let deleted = state.relations.len() < before;
        if deleted {
            state.writes += 1;
        }
        deleted
    }
}
