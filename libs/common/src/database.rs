//! Database module for handling PostgreSQL connections
//!
//! Event, station and tenant records are owned by the registration
//! application; services in this workspace only read them through a pool
//! created here.

use crate::error::{DatabaseError, DatabaseResult};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

/// Database configuration struct
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Initialize a PostgreSQL connection pool
///
/// The pool connects lazily, so a service can start while the database is
/// still coming up; the first query surfaces connection errors.
///
/// # Arguments
///
/// * `config` - Database configuration
pub fn init_pool(config: &DatabaseConfig) -> DatabaseResult<PgPool> {
    let options = config
        .database_url
        .parse()
        .map_err(|e| DatabaseError::Configuration(format!("Invalid database URL: {}", e)))?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_lazy_with(options);

    info!(
        "Database pool configured with {} max connections",
        config.max_connections
    );
    Ok(pool)
}

/// Check database connectivity
pub async fn health_check(pool: &PgPool) -> DatabaseResult<bool> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(DatabaseError::Connection)?;

    Ok(true)
}
