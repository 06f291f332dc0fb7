//! In-process directory for local development and tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::error::DatabaseResult;
use tokio::sync::RwLock;

use super::Directory;
use crate::models::{EventRecord, Station};

#[derive(Debug, Default)]
struct Tables {
    tenants: HashMap<String, Option<String>>,
    events: HashMap<String, (String, String)>,
    stations: HashMap<String, Station>,
}

/// Directory backed by in-memory maps
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_tenant(&self, tenant_id: &str, api_key: Option<&str>) {
        self.tables
            .write()
            .await
            .tenants
            .insert(tenant_id.to_string(), api_key.map(str::to_string));
    }

    pub async fn insert_event(&self, event_id: &str, slug: &str, tenant_id: &str) {
        self.tables.write().await.events.insert(
            event_id.to_string(),
            (slug.to_string(), tenant_id.to_string()),
        );
    }

    pub async fn insert_station(&self, station: Station) {
        self.tables
            .write()
            .await
            .stations
            .insert(station.id.clone(), station);
    }

    /// Flip a station's active flag; returns false when it does not exist
    pub async fn set_station_active(&self, station_id: &str, active: bool) -> bool {
        match self.tables.write().await.stations.get_mut(station_id) {
            Some(station) => {
                station.active = active;
                true
            }
            None => false,
        }
    }

    /// Rebind a station to another event; returns false when it does not exist
    pub async fn reassign_station(&self, station_id: &str, event_id: &str) -> bool {
        match self.tables.write().await.stations.get_mut(station_id) {
            Some(station) => {
                station.event_id = event_id.to_string();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_event(&self, identifier: &str) -> DatabaseResult<Option<EventRecord>> {
        let tables = self.tables.read().await;

        let found = tables
            .events
            .iter()
            .find(|(_, (slug, _))| slug == identifier)
            .or_else(|| tables.events.get_key_value(identifier));

        Ok(found.map(|(id, (slug, tenant_id))| EventRecord {
            id: id.clone(),
            slug: slug.clone(),
            owner_tenant_id: tenant_id.clone(),
            tenant_api_key: tables.tenants.get(tenant_id).cloned().flatten(),
        }))
    }

    async fn find_station(&self, station_id: &str) -> DatabaseResult<Option<Station>> {
        Ok(self.tables.read().await.stations.get(station_id).cloned())
    }

    async fn find_station_by_code(
        &self,
        event_id: &str,
        code: &str,
    ) -> DatabaseResult<Option<Station>> {
        Ok(self
            .tables
            .read()
            .await
            .stations
            .values()
            .find(|station| station.event_id == event_id && station.code == code)
            .cloned())
    }

    async fn tenant_exists(&self, tenant_id: &str) -> DatabaseResult<bool> {
        Ok(self.tables.read().await.tenants.contains_key(tenant_id))
    }
}
