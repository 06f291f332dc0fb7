//! Superadmin impersonation of tenant admins
//!
//! Beginning parks the superadmin's own token, verbatim, in the
//! previous-session cookie and installs a freshly issued tenant admin session.
//! Exiting copies the parked token back and clears the slot in the same
//! response. There is a single slot: since only a superadmin session may begin
//! impersonating, and the impersonated session is a tenant admin, nesting is
//! refused rather than overwriting the restore target.

use axum::http::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use crate::{
    cookies::{CookiePolicy, PREV_SESSION_COOKIE, SESSION_COOKIE, read_cookie},
    error::{AuthError, AuthResult},
    sessions::{SessionService, TENANT_SESSION_TTL, TenantRole, TenantSession},
    validation::safe_redirect,
};

/// Result of an exit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The parked session was restored; both cookies must be sent together
    Restored {
        redirect: String,
        cookies: Vec<HeaderValue>,
    },
    /// Nothing was parked; cookies stay untouched
    NotImpersonating { redirect: String },
}

impl ExitOutcome {
    pub fn redirect(&self) -> &str {
        match self {
            ExitOutcome::Restored { redirect, .. } | ExitOutcome::NotImpersonating { redirect } => {
                redirect
            }
        }
    }
}

/// Begins and ends impersonation
#[derive(Debug, Clone)]
pub struct ImpersonationController {
    sessions: SessionService,
    cookies: CookiePolicy,
}

impl ImpersonationController {
    pub fn new(sessions: SessionService, cookies: CookiePolicy) -> Self {
        Self { sessions, cookies }
    }

    /// Switch a verified superadmin into an admin session for `tenant_id`
    ///
    /// Returns the `Set-Cookie` values for the new session and the parked one.
    pub fn begin_impersonation(
        &self,
        current_token: Option<&str>,
        tenant_id: &str,
        now: i64,
    ) -> AuthResult<Vec<HeaderValue>> {
        let current_token = current_token.ok_or(AuthError::Unauthenticated)?;
        let current = self
            .sessions
            .verify_tenant_session(current_token, now)
            .map_err(|_| AuthError::Unauthenticated)?;

        if !current.is_superadmin() {
            warn!("Impersonation of {} refused for a non-superadmin session", tenant_id);
            return Err(AuthError::NotAuthorized);
        }

        let target = TenantSession::for_tenant(TenantRole::Admin, tenant_id, now);
        let target_token = self
            .sessions
            .issue_tenant_session(&target)
            .map_err(|_| AuthError::Internal)?;

        info!("Superadmin began impersonating tenant {}", tenant_id);

        Ok(vec![
            self.cookies
                .set(SESSION_COOKIE, &target_token, TENANT_SESSION_TTL)?,
            self.cookies
                .set(PREV_SESSION_COOKIE, current_token, TENANT_SESSION_TTL)?,
        ])
    }

    /// Restore the parked session, if any
    pub fn exit_impersonation(
        &self,
        headers: &HeaderMap,
        redirect: Option<&str>,
    ) -> AuthResult<ExitOutcome> {
        let current = read_cookie(headers, SESSION_COOKIE);
        let previous = read_cookie(headers, PREV_SESSION_COOKIE);
        let redirect = safe_redirect(redirect).to_string();

        match (current, previous) {
            (None, None) => Err(AuthError::Unauthenticated),
            (_, None) => Ok(ExitOutcome::NotImpersonating { redirect }),
            (_, Some(previous)) => {
                info!("Impersonation ended; restoring parked session");
                Ok(ExitOutcome::Restored {
                    redirect,
                    cookies: vec![
                        self.cookies
                            .set(SESSION_COOKIE, &previous, TENANT_SESSION_TTL)?,
                        self.cookies.clear(PREV_SESSION_COOKIE)?,
                    ],
                })
            }
        }
    }
}
