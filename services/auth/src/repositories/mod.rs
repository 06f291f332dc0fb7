//! Lookups the session layer needs from the registration database
//!
//! Events, tenants and stations are owned elsewhere; this layer only reads
//! them, at most once per authorization decision.

use async_trait::async_trait;
use common::error::DatabaseResult;

use crate::models::{EventRecord, Station};

pub mod memory;
pub mod postgres;

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

/// Read-only view of events, tenants and stations
#[async_trait]
pub trait Directory: Send + Sync {
    /// Find an event by slug or id, with its owner's API key
    async fn find_event(&self, identifier: &str) -> DatabaseResult<Option<EventRecord>>;

    async fn find_station(&self, station_id: &str) -> DatabaseResult<Option<Station>>;

    /// Find the station signing in with `code` for `event_id`
    async fn find_station_by_code(
        &self,
        event_id: &str,
        code: &str,
    ) -> DatabaseResult<Option<Station>>;

    async fn tenant_exists(&self, tenant_id: &str) -> DatabaseResult<bool>;
}
