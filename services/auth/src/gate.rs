//! Authorization gate
//!
//! Every privileged route resolves its scope here instead of re-deriving the
//! precedence order itself. For an event, first match wins:
//!
//! 1. `x-api-key` equals the owning tenant's key → tenant API client
//! 2. `x-api-key` equals the platform admin key → platform admin
//! 3. a valid tenant session → superadmin (any tenant) or same-tenant only (403 otherwise)
//! 4. nothing usable → 401
//!
//! An invalid or expired session cookie is treated exactly like no cookie.

use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::{
    cookies::{SCANNER_COOKIE, SESSION_COOKIE, read_cookie},
    error::{AuthError, AuthResult},
    models::EventRecord,
    repositories::Directory,
    sessions::SessionService,
};

pub const API_KEY_HEADER: &str = "x-api-key";

/// How a request was authorized for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    TenantApiKey,
    PlatformKey,
    Superadmin,
    TenantSession,
}

/// Resolved event scope handed to route handlers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventScope {
    pub event_id: String,
    pub tenant_id: String,
    pub grant: Grant,
}

/// Live station scope for scanner routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationScope {
    pub station_id: String,
    pub event_id: String,
    pub code: String,
}

/// Credentials carried by a request
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub tenant_session: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let api_key = headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string);

        Self {
            api_key,
            tenant_session: read_cookie(headers, SESSION_COOKIE),
        }
    }
}

fn keys_match(presented: &str, expected: &str) -> bool {
    let presented = presented.trim().as_bytes();
    let expected = expected.trim().as_bytes();
    !expected.is_empty() && presented.len() == expected.len() && bool::from(presented.ct_eq(expected))
}

/// Decides which requests may act on which tenant's events
#[derive(Clone)]
pub struct AuthorizationGate {
    sessions: SessionService,
    admin_key: Option<String>,
    directory: Arc<dyn Directory>,
}

impl AuthorizationGate {
    pub fn new(
        sessions: SessionService,
        admin_key: Option<String>,
        directory: Arc<dyn Directory>,
    ) -> Self {
        Self {
            sessions,
            admin_key,
            directory,
        }
    }

    /// Whether `presented` is the platform admin key
    pub fn is_platform_key(&self, presented: &str) -> bool {
        self.admin_key
            .as_deref()
            .is_some_and(|expected| keys_match(presented, expected))
    }

    /// Resolve the scope a request has for the event named by `identifier`
    pub async fn resolve_event_scope(
        &self,
        headers: &HeaderMap,
        identifier: &str,
        now: i64,
    ) -> AuthResult<EventScope> {
        let credentials = Credentials::from_headers(headers);

        let Some(event) = self.directory.find_event(identifier).await? else {
            // Only callers that could have been authorized learn the event is missing.
            return Err(if self.holds_any_valid_credential(&credentials, now) {
                AuthError::NotFound("Event")
            } else {
                AuthError::Unauthenticated
            });
        };

        self.decide(&credentials, &event, now)
    }

    /// Same precedence as [`Self::resolve_event_scope`], for bulk-mutation routes
    ///
    /// The event is looked up by slug first and a missing event is a 404 even
    /// for anonymous callers; slugs are public.
    pub async fn require_admin_for_slug(
        &self,
        headers: &HeaderMap,
        slug: &str,
        now: i64,
    ) -> AuthResult<EventScope> {
        let event = self
            .directory
            .find_event(slug)
            .await?
            .filter(|event| event.slug == slug)
            .ok_or(AuthError::NotFound("Event"))?;

        self.decide(&Credentials::from_headers(headers), &event, now)
    }

    /// Check the scanner cookie against the live station record
    ///
    /// With `event_id` set, the station must currently be bound to that event.
    pub async fn authorize_station(
        &self,
        headers: &HeaderMap,
        event_id: Option<&str>,
        now: i64,
    ) -> AuthResult<StationScope> {
        let session = read_cookie(headers, SCANNER_COOKIE)
            .and_then(|token| self.sessions.verify_scanner_session(&token, now))
            .ok_or(AuthError::Unauthenticated)?;

        let Some(station) = self.directory.find_station(&session.station_id).await? else {
            info!("Scanner session names unknown station {}", session.station_id);
            return Err(AuthError::Unauthenticated);
        };

        if !station.active || station.event_id != session.event_id {
            warn!(
                "Station {} is inactive or no longer bound to event {}",
                station.id, session.event_id
            );
            return Err(AuthError::NotAuthorized);
        }

        if event_id.is_some_and(|expected| expected != station.event_id) {
            warn!("Station {} used outside its event", station.id);
            return Err(AuthError::NotAuthorized);
        }

        Ok(StationScope {
            station_id: station.id,
            event_id: station.event_id,
            code: station.code,
        })
    }

    fn decide(
        &self,
        credentials: &Credentials,
        event: &EventRecord,
        now: i64,
    ) -> AuthResult<EventScope> {
        let scope = |grant| EventScope {
            event_id: event.id.clone(),
            tenant_id: event.owner_tenant_id.clone(),
            grant,
        };

        if let Some(key) = credentials.api_key.as_deref() {
            if event
                .tenant_api_key
                .as_deref()
                .is_some_and(|tenant_key| keys_match(key, tenant_key))
            {
                return Ok(scope(Grant::TenantApiKey));
            }
            if self.is_platform_key(key) {
                return Ok(scope(Grant::PlatformKey));
            }
            debug!("x-api-key did not match for event {}", event.id);
        }

        if let Some(token) = credentials.tenant_session.as_deref() {
            match self.sessions.verify_tenant_session(token, now) {
                Ok(session) if session.is_superadmin() => return Ok(scope(Grant::Superadmin)),
                Ok(session) if session.covers(&event.owner_tenant_id) => {
                    return Ok(scope(Grant::TenantSession));
                }
                Ok(session) => {
                    warn!(
                        "Tenant session for {:?} denied on event {} owned by {}",
                        session.oid, event.id, event.owner_tenant_id
                    );
                    return Err(AuthError::NotAuthorized);
                }
                Err(e) => debug!("Ignoring unusable tenant session: {}", e),
            }
        }

        Err(AuthError::Unauthenticated)
    }

    fn holds_any_valid_credential(&self, credentials: &Credentials, now: i64) -> bool {
        credentials
            .api_key
            .as_deref()
            .is_some_and(|key| self.is_platform_key(key))
            || credentials
                .tenant_session
                .as_deref()
                .is_some_and(|token| self.sessions.verify_tenant_session(token, now).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::Station,
        repositories::MemoryDirectory,
        sessions::{TenantRole, TenantSession, test_support::service},
    };
    use axum::http::{HeaderValue, header::COOKIE};

    const NOW: i64 = 100_000;

    async fn fixture() -> (AuthorizationGate, MemoryDirectory) {
        let directory = MemoryDirectory::new();
        directory.insert_tenant("org_a", Some("key-a")).await;
        directory.insert_tenant("org_b", Some("key-b")).await;
        directory.insert_tenant("org_c", None).await;
        directory.insert_event("ev_a", "gala-a", "org_a").await;
        directory.insert_event("ev_b", "gala-b", "org_b").await;
        directory.insert_event("ev_c", "gala-c", "org_c").await;
        directory
            .insert_station(Station {
                id: "st_1".to_string(),
                event_id: "ev_a".to_string(),
                code: "DOOR-A".to_string(),
                active: true,
                secret_hash: String::new(),
            })
            .await;

        let gate = AuthorizationGate::new(
            service(),
            Some("platform-key".to_string()),
            Arc::new(directory.clone()),
        );
        (gate, directory)
    }

    fn with_cookie(name: &str, token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", name, token)).unwrap(),
        );
        headers
    }

    fn with_api_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    fn tenant_cookie(session: &TenantSession) -> HeaderMap {
        let token = service().issue_tenant_session(session).unwrap();
        with_cookie(SESSION_COOKIE, &token)
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let (gate, _) = fixture().await;
        let headers = tenant_cookie(&TenantSession::for_tenant(TenantRole::Staff, "org_a", NOW));

        let own = gate.resolve_event_scope(&headers, "gala-a", NOW).await.unwrap();
        assert_eq!(
            own,
            EventScope {
                event_id: "ev_a".to_string(),
                tenant_id: "org_a".to_string(),
                grant: Grant::TenantSession,
            }
        );

        let other = gate.resolve_event_scope(&headers, "gala-b", NOW).await;
        assert!(matches!(other, Err(AuthError::NotAuthorized)));
    }

    #[tokio::test]
    async fn test_superadmin_override() {
        let (gate, _) = fixture().await;
        let headers = tenant_cookie(&TenantSession::superadmin(NOW));

        for (slug, tenant) in [("gala-a", "org_a"), ("gala-b", "org_b"), ("ev_c", "org_c")] {
            let scope = gate.resolve_event_scope(&headers, slug, NOW).await.unwrap();
            assert_eq!(scope.grant, Grant::Superadmin);
            assert_eq!(scope.tenant_id, tenant);
        }
    }

    #[tokio::test]
    async fn test_tenant_api_key_wins_without_session() {
        let (gate, _) = fixture().await;

        let scope = gate
            .resolve_event_scope(&with_api_key("key-a"), "gala-a", NOW)
            .await
            .unwrap();
        assert_eq!(scope.grant, Grant::TenantApiKey);

        let foreign = gate
            .resolve_event_scope(&with_api_key("key-a"), "gala-b", NOW)
            .await;
        assert!(matches!(foreign, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_api_key_precedes_mismatched_session() {
        let (gate, _) = fixture().await;
        let mut headers = tenant_cookie(&TenantSession::for_tenant(TenantRole::Admin, "org_a", NOW));
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("key-b"));

        let scope = gate.resolve_event_scope(&headers, "gala-b", NOW).await.unwrap();
        assert_eq!(scope.grant, Grant::TenantApiKey);
        assert_eq!(scope.tenant_id, "org_b");
    }

    #[tokio::test]
    async fn test_platform_key_is_trimmed_and_covers_any_tenant() {
        let (gate, _) = fixture().await;

        let scope = gate
            .resolve_event_scope(&with_api_key("  platform-key "), "gala-c", NOW)
            .await
            .unwrap();
        assert_eq!(scope.grant, Grant::PlatformKey);
        assert_eq!(scope.tenant_id, "org_c");

        assert!(gate.is_platform_key("platform-key"));
        assert!(!gate.is_platform_key("platform-ke"));
        assert!(!gate.is_platform_key(""));
    }

    #[tokio::test]
    async fn test_no_admin_key_configured() {
        let directory = MemoryDirectory::new();
        directory.insert_tenant("org_a", None).await;
        directory.insert_event("ev_a", "gala-a", "org_a").await;
        let gate = AuthorizationGate::new(service(), None, Arc::new(directory));

        assert!(!gate.is_platform_key(""));
        let result = gate.resolve_event_scope(&with_api_key("anything"), "gala-a", NOW).await;
        assert!(matches!(result, Err(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_invalid_or_expired_session_reads_as_anonymous() {
        let (gate, _) = fixture().await;
        let expired = tenant_cookie(&TenantSession::for_tenant(TenantRole::Staff, "org_a", 0));
        let forged = with_cookie(SESSION_COOKIE, "eyJyb2xlIjoic3VwZXJhZG1pbiJ9.AAAA");

        for headers in [expired, forged, HeaderMap::new()] {
            let result = gate.resolve_event_scope(&headers, "gala-a", NOW).await;
            assert!(matches!(result, Err(AuthError::Unauthenticated)));
        }
    }

    #[tokio::test]
    async fn test_missing_event_hidden_from_anonymous_callers() {
        let (gate, _) = fixture().await;

        let anonymous = gate.resolve_event_scope(&HeaderMap::new(), "nope", NOW).await;
        assert!(matches!(anonymous, Err(AuthError::Unauthenticated)));

        let admin = gate
            .resolve_event_scope(&with_api_key("platform-key"), "nope", NOW)
            .await;
        assert!(matches!(admin, Err(AuthError::NotFound("Event"))));
    }

    #[tokio::test]
    async fn test_require_admin_for_slug_checks_existence_first() {
        let (gate, _) = fixture().await;

        let missing = gate.require_admin_for_slug(&HeaderMap::new(), "nope", NOW).await;
        assert!(matches!(missing, Err(AuthError::NotFound("Event"))));

        let by_id = gate
            .require_admin_for_slug(&with_api_key("platform-key"), "ev_a", NOW)
            .await;
        assert!(matches!(by_id, Err(AuthError::NotFound("Event"))));

        let anonymous = gate.require_admin_for_slug(&HeaderMap::new(), "gala-a", NOW).await;
        assert!(matches!(anonymous, Err(AuthError::Unauthenticated)));

        let owner = tenant_cookie(&TenantSession::for_tenant(TenantRole::Admin, "org_b", NOW));
        let scope = gate.require_admin_for_slug(&owner, "gala-b", NOW).await.unwrap();
        assert_eq!(scope.event_id, "ev_b");
    }

    #[tokio::test]
    async fn test_station_session_checked_against_live_record() {
        let (gate, directory) = fixture().await;
        let token = service().issue_scanner_session("st_1", "ev_a", NOW).unwrap();
        let headers = with_cookie(SCANNER_COOKIE, &token);

        let scope = gate.authorize_station(&headers, None, NOW).await.unwrap();
        assert_eq!(scope.station_id, "st_1");
        assert_eq!(scope.code, "DOOR-A");
        assert!(gate.authorize_station(&headers, Some("ev_a"), NOW).await.is_ok());
        assert!(matches!(
            gate.authorize_station(&headers, Some("ev_b"), NOW).await,
            Err(AuthError::NotAuthorized)
        ));

        directory.reassign_station("st_1", "ev_b").await;
        assert!(matches!(
            gate.authorize_station(&headers, None, NOW).await,
            Err(AuthError::NotAuthorized)
        ));

        directory.reassign_station("st_1", "ev_a").await;
        directory.set_station_active("st_1", false).await;
        assert!(matches!(
            gate.authorize_station(&headers, None, NOW).await,
            Err(AuthError::NotAuthorized)
        ));
    }

    #[tokio::test]
    async fn test_station_session_missing_or_unknown() {
        let (gate, _) = fixture().await;
        let ghost = service().issue_scanner_session("st_ghost", "ev_a", NOW).unwrap();

        assert!(matches!(
            gate.authorize_station(&HeaderMap::new(), None, NOW).await,
            Err(AuthError::Unauthenticated)
        ));
        assert!(matches!(
            gate.authorize_station(&with_cookie(SCANNER_COOKIE, &ghost), None, NOW)
                .await,
            Err(AuthError::Unauthenticated)
        ));
    }
}
