//! Check-in station credentials

use serde::Serialize;
use sqlx::FromRow;

/// A check-in terminal credential bound to one event
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Station {
    pub id: String,
    pub event_id: String,
    pub code: String,
    pub active: bool,
    #[serde(skip_serializing)]
    pub secret_hash: String,
}
