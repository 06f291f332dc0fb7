//! Session and authorization core for the Turnstile event registration app
//!
//! Admins, organizer staff (tenant-scoped) and check-in stations each carry a
//! stateless HMAC-signed session cookie. The [`gate::AuthorizationGate`] turns
//! those cookies, plus API keys, into a resolved tenant/event scope, and the
//! [`impersonation::ImpersonationController`] lets a superadmin step into a
//! tenant admin session and back out again.

use std::sync::Arc;

use common::Settings;

pub mod codec;
pub mod cookies;
pub mod error;
pub mod gate;
pub mod hasher;
pub mod impersonation;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod sessions;
pub mod validation;

use crate::{
    codec::{SigningKey, TokenCodec},
    cookies::CookiePolicy,
    error::AuthResult,
    gate::AuthorizationGate,
    impersonation::ImpersonationController,
    repositories::Directory,
    sessions::SessionService,
};

/// Credential login settings for the platform admin
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password_hash: Option<String>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub gate: AuthorizationGate,
    pub impersonation: ImpersonationController,
    pub directory: Arc<dyn Directory>,
    pub cookies: CookiePolicy,
    pub admin: AdminCredentials,
}

impl AppState {
    /// Build the state from settings; fails when the signing key is unusable
    pub fn new(settings: &Settings, directory: Arc<dyn Directory>) -> AuthResult<Self> {
        let key = SigningKey::resolve(settings)?;
        let sessions = SessionService::new(TokenCodec::new(&key)?);
        let cookies = CookiePolicy::new(settings.cookie_secure());

        Ok(Self {
            gate: AuthorizationGate::new(
                sessions.clone(),
                settings.admin_key().map(str::to_string),
                directory.clone(),
            ),
            impersonation: ImpersonationController::new(sessions.clone(), cookies),
            sessions,
            directory,
            cookies,
            admin: AdminCredentials {
                username: settings.admin_username.clone(),
                password_hash: settings.admin_password_hash.clone(),
            },
        })
    }
}
