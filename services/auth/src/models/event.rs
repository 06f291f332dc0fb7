//! Event ownership as seen by the authorization gate

use serde::Serialize;
use sqlx::FromRow;

/// An event and the tenant that owns it
///
/// `tenant_api_key` is the owning tenant's key, joined in so scope resolution
/// needs a single lookup.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EventRecord {
    pub id: String,
    pub slug: String,
    pub owner_tenant_id: String,
    #[serde(skip_serializing)]
    pub tenant_api_key: Option<String>,
}
