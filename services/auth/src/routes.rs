//! HTTP routes for sign-in, impersonation and scope resolution

use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::{
    AppState,
    cookies::{
        ADMIN_COOKIE, PREV_SESSION_COOKIE, SCANNER_COOKIE, SESSION_COOKIE, append_cookies,
        read_cookie,
    },
    error::{AuthError, AuthResult},
    gate::StationScope,
    hasher::{DECOY_HASH, verify_secret},
    impersonation::ExitOutcome,
    middleware::require_station,
    models::Station,
    sessions::{
        ADMIN_KEY_SESSION_TTL, ADMIN_SESSION_TTL, SCANNER_SESSION_TTL, TENANT_SESSION_TTL,
        TenantSession, now_unix,
    },
    validation::{validate_event_identifier, validate_station_code},
};

/// Request for admin credential login
#[derive(Deserialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Request for admin key login
#[derive(Deserialize)]
pub struct AdminKeyLoginRequest {
    pub key: String,
}

/// Request for station sign-in
#[derive(Deserialize)]
pub struct StationLoginRequest {
    /// Event slug or id
    pub event: String,
    pub code: String,
    pub secret: String,
}

/// Response for a successful sign-in
#[derive(Serialize)]
pub struct SessionResponse {
    pub subject: String,
    pub expires_in: i64,
}

#[derive(Deserialize)]
pub struct ExitQuery {
    pub redirect: Option<String>,
}

/// Create the router for the authentication service
pub fn create_router(state: AppState) -> Router {
    let station_routes = Router::new()
        .route("/station/me", get(station_me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_station,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/admin/login", post(admin_login))
        .route("/admin/key-login", post(admin_key_login))
        .route("/admin/logout", post(admin_logout))
        .route("/org/superadmin", post(enter_superadmin))
        .route("/org/impersonate/exit", get(exit_impersonation))
        .route("/org/impersonate/:tenant_id", post(begin_impersonation))
        .route("/org/logout", post(org_logout))
        .route("/station/login", post(station_login))
        .route("/station/logout", post(station_logout))
        .route("/events/:identifier/scope", get(event_scope))
        .route("/events/:slug/admin-scope", get(event_admin_scope))
        .merge(station_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "auth-service"
    }))
}

fn clock() -> AuthResult<i64> {
    now_unix().map_err(|e| {
        error!("{}", e);
        AuthError::Internal
    })
}

async fn verify_off_thread(secret: String, stored: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || verify_secret(&secret, &stored))
        .await
        .map_err(|e| {
            error!("Secret verification task failed: {}", e);
            AuthError::Internal
        })
}

/// Admin credential login (12 hour session)
pub async fn admin_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminLoginRequest>,
) -> AuthResult<impl IntoResponse> {
    info!("Admin login attempt for user: {}", payload.username);

    let Some(stored) = state.admin.password_hash.clone() else {
        warn!("Admin credential login attempted but ADMIN_PASSWORD_HASH is not set");
        return Err(AuthError::Unauthenticated);
    };

    let verified = verify_off_thread(payload.password, stored).await?;
    if !verified || payload.username != state.admin.username {
        return Err(AuthError::Unauthenticated);
    }

    let now = clock()?;
    let token = state
        .sessions
        .issue_admin_session(&payload.username, now)
        .map_err(|_| AuthError::Internal)?;

    let mut headers = HeaderMap::new();
    append_cookies(
        &mut headers,
        [state.cookies.set(ADMIN_COOKIE, &token, ADMIN_SESSION_TTL)?],
    );

    Ok((
        headers,
        Json(SessionResponse {
            subject: payload.username,
            expires_in: ADMIN_SESSION_TTL,
        }),
    ))
}

/// Admin key login (7 day session)
pub async fn admin_key_login(
    State(state): State<AppState>,
    Json(payload): Json<AdminKeyLoginRequest>,
) -> AuthResult<impl IntoResponse> {
    if !state.gate.is_platform_key(&payload.key) {
        info!("Admin key login rejected");
        return Err(AuthError::Unauthenticated);
    }

    let now = clock()?;
    let token = state
        .sessions
        .issue_admin_session_with_ttl(&state.admin.username, now, ADMIN_KEY_SESSION_TTL)
        .map_err(|_| AuthError::Internal)?;

    let mut headers = HeaderMap::new();
    append_cookies(
        &mut headers,
        [state.cookies.set(ADMIN_COOKIE, &token, ADMIN_KEY_SESSION_TTL)?],
    );

    Ok((
        headers,
        Json(SessionResponse {
            subject: state.admin.username.clone(),
            expires_in: ADMIN_KEY_SESSION_TTL,
        }),
    ))
}

/// Admin logout endpoint
pub async fn admin_logout(State(state): State<AppState>) -> AuthResult<impl IntoResponse> {
    let mut headers = HeaderMap::new();
    append_cookies(&mut headers, [state.cookies.clear(ADMIN_COOKIE)?]);
    Ok((StatusCode::NO_CONTENT, headers))
}

/// Exchange an admin session for a platform-wide superadmin organizer session
pub async fn enter_superadmin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse> {
    let admin = state
        .sessions
        .verify_admin_session_now(read_cookie(&headers, ADMIN_COOKIE).as_deref())
        .map_err(|reason| {
            debug!("Admin session rejected: {}", reason);
            AuthError::Unauthenticated
        })?;

    let now = clock()?;

    let token = state
        .sessions
        .issue_tenant_session(&TenantSession::superadmin(now))
        .map_err(|_| AuthError::Internal)?;

    info!("Admin {} entered the organizer console as superadmin", admin.username);

    let mut response_headers = HeaderMap::new();
    append_cookies(
        &mut response_headers,
        [
            state.cookies.set(SESSION_COOKIE, &token, TENANT_SESSION_TTL)?,
            state.cookies.clear(PREV_SESSION_COOKIE)?,
        ],
    );

    Ok((
        response_headers,
        Json(SessionResponse {
            subject: admin.username,
            expires_in: TENANT_SESSION_TTL,
        }),
    ))
}

/// Begin impersonating a tenant admin
pub async fn begin_impersonation(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse> {
    let now = clock()?;
    let cookies = state.impersonation.begin_impersonation(
        read_cookie(&headers, SESSION_COOKIE).as_deref(),
        &tenant_id,
        now,
    )?;

    if !state.directory.tenant_exists(&tenant_id).await? {
        return Err(AuthError::NotFound("Tenant"));
    }

    let mut response_headers = HeaderMap::new();
    append_cookies(&mut response_headers, cookies);

    Ok((
        response_headers,
        Json(json!({
            "impersonating": tenant_id,
        })),
    ))
}

/// Restore the parked superadmin session
pub async fn exit_impersonation(
    State(state): State<AppState>,
    Query(query): Query<ExitQuery>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse> {
    let outcome = state
        .impersonation
        .exit_impersonation(&headers, query.redirect.as_deref())?;

    let mut response_headers = HeaderMap::new();
    let redirect = Redirect::to(outcome.redirect());
    if let ExitOutcome::Restored { cookies, .. } = outcome {
        append_cookies(&mut response_headers, cookies);
    }

    Ok((response_headers, redirect))
}

/// Organizer logout endpoint
pub async fn org_logout(State(state): State<AppState>) -> AuthResult<impl IntoResponse> {
    let mut headers = HeaderMap::new();
    append_cookies(
        &mut headers,
        [
            state.cookies.clear(SESSION_COOKIE)?,
            state.cookies.clear(PREV_SESSION_COOKIE)?,
        ],
    );
    Ok((StatusCode::NO_CONTENT, headers))
}

/// Station sign-in with code and secret for one event
pub async fn station_login(
    State(state): State<AppState>,
    Json(payload): Json<StationLoginRequest>,
) -> AuthResult<impl IntoResponse> {
    validate_event_identifier(&payload.event).map_err(AuthError::BadRequest)?;
    validate_station_code(&payload.code).map_err(AuthError::BadRequest)?;

    info!("Station sign-in attempt: {} for {}", payload.code, payload.event);

    let station = match state.directory.find_event(&payload.event).await? {
        Some(event) => {
            state
                .directory
                .find_station_by_code(&event.id, &payload.code)
                .await?
        }
        None => None,
    };

    let stored = secret_hash_or_decoy(station.as_ref());
    let verified = verify_off_thread(payload.secret, stored).await?;

    let Some(station) = station.filter(|s| verified && s.active) else {
        return Err(AuthError::Unauthenticated);
    };

    let now = clock()?;
    let token = state
        .sessions
        .issue_scanner_session(&station.id, &station.event_id, now)
        .map_err(|_| AuthError::Internal)?;

    let mut headers = HeaderMap::new();
    append_cookies(
        &mut headers,
        [state.cookies.set(SCANNER_COOKIE, &token, SCANNER_SESSION_TTL)?],
    );

    Ok((
        headers,
        Json(SessionResponse {
            subject: station.id,
            expires_in: SCANNER_SESSION_TTL,
        }),
    ))
}

/// Hash to verify a sign-in against; unknown stations still pay for a full scrypt run
fn secret_hash_or_decoy(station: Option<&Station>) -> String {
    station.map_or_else(|| DECOY_HASH.to_string(), |s| s.secret_hash.clone())
}

/// Station logout endpoint
pub async fn station_logout(State(state): State<AppState>) -> AuthResult<impl IntoResponse> {
    let mut headers = HeaderMap::new();
    append_cookies(&mut headers, [state.cookies.clear(SCANNER_COOKIE)?]);
    Ok((StatusCode::NO_CONTENT, headers))
}

/// Current station scope
pub async fn station_me(Extension(scope): Extension<StationScope>) -> impl IntoResponse {
    Json(scope)
}

/// Scope the caller holds for an event
pub async fn event_scope(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse> {
    validate_event_identifier(&identifier).map_err(AuthError::BadRequest)?;

    let scope = state
        .gate
        .resolve_event_scope(&headers, &identifier, clock()?)
        .await?;
    Ok(Json(scope))
}

/// Scope the caller holds for bulk changes to an event
pub async fn event_admin_scope(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> AuthResult<impl IntoResponse> {
    let scope = state
        .gate
        .require_admin_for_slug(&headers, &slug, clock()?)
        .await?;
    Ok(Json(scope))
}
