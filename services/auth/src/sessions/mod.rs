//! Session issuing and verification
//!
//! Three session kinds ride on the [`TokenCodec`]: admin sessions, tenant
//! (organizer/superadmin) sessions and scanner (station) sessions. Every
//! verifier is a pure function of the token, the signing key and `now`; nothing
//! is stored server-side, so a changed session is always a newly issued token.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec::TokenCodec;

pub mod admin;
pub mod scanner;
pub mod tenant;

pub use admin::{ADMIN_KEY_SESSION_TTL, ADMIN_SESSION_TTL, AdminSession, AdminSessionRejection};
pub use scanner::{SCANNER_SESSION_TTL, ScannerSession};
pub use tenant::{TENANT_SESSION_TTL, TenantRole, TenantSession};

/// Current unix time in seconds
pub fn now_unix() -> anyhow::Result<i64> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("Failed to get current time: {}", e))?
        .as_secs();
    Ok(i64::try_from(secs)?)
}

/// Mints and checks the typed session payloads
#[derive(Debug, Clone)]
pub struct SessionService {
    codec: TokenCodec,
}

impl SessionService {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }
}
