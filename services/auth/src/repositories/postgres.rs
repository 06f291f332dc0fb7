//! Postgres-backed directory

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::debug;

use super::Directory;
use crate::models::{EventRecord, Station};

/// Directory reading the registration app's tables
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_event(&self, identifier: &str) -> DatabaseResult<Option<EventRecord>> {
        debug!("Finding event by identifier: {}", identifier);

        sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT e.id, e.slug, e.organizer_id AS owner_tenant_id, o.api_key AS tenant_api_key
            FROM events e
            JOIN organizers o ON o.id = e.organizer_id
            WHERE e.slug = $1 OR e.id = $1
            ORDER BY (e.slug = $1) DESC
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_station(&self, station_id: &str) -> DatabaseResult<Option<Station>> {
        debug!("Finding station by ID: {}", station_id);

        sqlx::query_as::<_, Station>(
            r#"
            SELECT id, event_id, code, active, secret_hash
            FROM stations
            WHERE id = $1
            "#,
        )
        .bind(station_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn find_station_by_code(
        &self,
        event_id: &str,
        code: &str,
    ) -> DatabaseResult<Option<Station>> {
        debug!("Finding station {} for event {}", code, event_id);

        sqlx::query_as::<_, Station>(
            r#"
            SELECT id, event_id, code, active, secret_hash
            FROM stations
            WHERE event_id = $1 AND code = $2
            "#,
        )
        .bind(event_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn tenant_exists(&self, tenant_id: &str) -> DatabaseResult<bool> {
        let found: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM organizers WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(found.is_some())
    }
}
