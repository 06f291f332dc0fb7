//! Session cookie names, attributes and parsing
//!
//! Every session cookie is `HttpOnly; SameSite=Lax; Path=/`, plus `Secure` in
//! production. Clearing a cookie overwrites it with an empty value and
//! `Max-Age=0`.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use tracing::error;

use crate::error::AuthError;

/// Admin session
pub const ADMIN_COOKIE: &str = "turnstile_admin";
/// Tenant or superadmin session
pub const SESSION_COOKIE: &str = "turnstile_session";
/// Superadmin session parked during impersonation
pub const PREV_SESSION_COOKIE: &str = "turnstile_prev_session";
/// Station session
pub const SCANNER_COOKIE: &str = "turnstile_station";

/// Cookie attributes shared by every session cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CookiePolicy {
    pub secure: bool,
}

impl CookiePolicy {
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Build a `Set-Cookie` value carrying `value` for `max_age` seconds
    pub fn set(&self, name: &str, value: &str, max_age: i64) -> Result<HeaderValue, AuthError> {
        self.render(format!(
            "{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
        ))
    }

    /// Build a `Set-Cookie` value that removes `name`
    pub fn clear(&self, name: &str) -> Result<HeaderValue, AuthError> {
        self.render(format!("{name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"))
    }

    fn render(&self, mut cookie: String) -> Result<HeaderValue, AuthError> {
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|e| {
            error!("Failed to build cookie header: {}", e);
            AuthError::Internal
        })
    }
}

/// Append `Set-Cookie` values to a header map
pub fn append_cookies(headers: &mut HeaderMap, cookies: impl IntoIterator<Item = HeaderValue>) {
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
}

/// Read a cookie value from the request; empty values count as absent
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
