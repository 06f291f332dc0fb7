//! Admin sessions: `{ u, k: "admin", iat, exp }`

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{SessionService, now_unix};
use crate::codec::CodecError;

/// Credential login lifetime
pub const ADMIN_SESSION_TTL: i64 = 12 * 60 * 60;
/// Admin key login lifetime
pub const ADMIN_KEY_SESSION_TTL: i64 = 7 * 24 * 60 * 60;

const ADMIN_KIND: &str = "admin";

#[derive(Serialize)]
struct AdminSessionPayload<'a> {
    u: &'a str,
    k: &'a str,
    iat: i64,
    exp: i64,
}

/// A verified admin session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why an admin session was not accepted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSessionRejection {
    #[error("missing")]
    Missing,
    #[error("format")]
    Format,
    #[error("bad-signature")]
    BadSignature,
    #[error("expired")]
    Expired,
    #[error("not-admin")]
    NotAdmin,
    #[error("invalid-payload")]
    InvalidPayload,
    #[error("exception")]
    Exception,
}

impl From<CodecError> for AdminSessionRejection {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed => AdminSessionRejection::Format,
            CodecError::BadSignature => AdminSessionRejection::BadSignature,
            CodecError::InvalidPayload => AdminSessionRejection::InvalidPayload,
        }
    }
}

impl SessionService {
    /// Issue a credential-login admin session (12 hours)
    pub fn issue_admin_session(&self, username: &str, now: i64) -> Result<String, CodecError> {
        self.issue_admin_session_with_ttl(username, now, ADMIN_SESSION_TTL)
    }

    pub fn issue_admin_session_with_ttl(
        &self,
        username: &str,
        now: i64,
        ttl: i64,
    ) -> Result<String, CodecError> {
        self.codec().encode(&AdminSessionPayload {
            u: username,
            k: ADMIN_KIND,
            iat: now,
            exp: now.saturating_add(ttl),
        })
    }

    /// Verify an admin session token at time `now`
    pub fn verify_admin_session(
        &self,
        token: Option<&str>,
        now: i64,
    ) -> Result<AdminSession, AdminSessionRejection> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AdminSessionRejection::Missing)?;

        let payload = self.codec().decode(token)?;
        let session = admin_from_payload(&payload)?;

        if now >= session.exp {
            return Err(AdminSessionRejection::Expired);
        }
        Ok(session)
    }

    /// Verify against the wall clock
    pub fn verify_admin_session_now(
        &self,
        token: Option<&str>,
    ) -> Result<AdminSession, AdminSessionRejection> {
        let now = now_unix().map_err(|e| {
            tracing::error!("{}", e);
            AdminSessionRejection::Exception
        })?;
        self.verify_admin_session(token, now)
    }
}

fn admin_from_payload(payload: &Map<String, Value>) -> Result<AdminSession, AdminSessionRejection> {
    if payload.get("k").and_then(Value::as_str) != Some(ADMIN_KIND) {
        return Err(AdminSessionRejection::NotAdmin);
    }

    let username = payload
        .get("u")
        .and_then(Value::as_str)
        .filter(|u| !u.is_empty())
        .ok_or(AdminSessionRejection::InvalidPayload)?;
    let iat = payload
        .get("iat")
        .and_then(Value::as_i64)
        .ok_or(AdminSessionRejection::InvalidPayload)?;
    let exp = payload
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(AdminSessionRejection::InvalidPayload)?;

    Ok(AdminSession {
        username: username.to_string(),
        iat,
        exp,
    })
}
