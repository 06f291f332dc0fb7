//! Organizer sessions: `{ role, oid, iat, exp }`
//!
//! `superadmin` may carry a null `oid` (platform-wide). Any other role names
//! exactly one tenant.

use serde::{Deserialize, Serialize};

use super::SessionService;
use crate::{codec::CodecError, error::AuthError};

pub const TENANT_SESSION_TTL: i64 = 12 * 60 * 60;

/// Role carried by a tenant session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Superadmin,
    Admin,
    Staff,
}

/// Tenant session payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSession {
    pub role: TenantRole,
    pub oid: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl TenantSession {
    /// Platform-wide superadmin session
    pub fn superadmin(now: i64) -> Self {
        Self {
            role: TenantRole::Superadmin,
            oid: None,
            iat: now,
            exp: now.saturating_add(TENANT_SESSION_TTL),
        }
    }

    /// Session scoped to one tenant
    pub fn for_tenant(role: TenantRole, tenant_id: &str, now: i64) -> Self {
        Self {
            role,
            oid: Some(tenant_id.to_string()),
            iat: now,
            exp: now.saturating_add(TENANT_SESSION_TTL),
        }
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == TenantRole::Superadmin
    }

    /// Whether this session may act on `tenant_id`
    pub fn covers(&self, tenant_id: &str) -> bool {
        self.is_superadmin() || self.oid.as_deref() == Some(tenant_id)
    }

    fn is_well_formed(&self) -> bool {
        match self.oid.as_deref() {
            Some(oid) => !oid.is_empty(),
            None => self.is_superadmin(),
        }
    }
}

impl SessionService {
    pub fn issue_tenant_session(&self, session: &TenantSession) -> Result<String, CodecError> {
        if !session.is_well_formed() {
            return Err(CodecError::InvalidPayload);
        }
        self.codec().encode(session)
    }

    /// Verify a tenant session token at time `now`
    pub fn verify_tenant_session(&self, token: &str, now: i64) -> Result<TenantSession, AuthError> {
        let session: TenantSession = self.codec().decode_as(token)?;

        if !session.is_well_formed() {
            return Err(AuthError::Malformed);
        }
        if now >= session.exp {
            return Err(AuthError::Expired);
        }
        Ok(session)
    }
}
