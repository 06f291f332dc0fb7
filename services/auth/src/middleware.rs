//! Middleware for station session enforcement

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use tracing::error;

use crate::{AppState, error::AuthError, sessions::now_unix};

/// Require a live station session
///
/// The scanner cookie is verified and cross-checked against the station
/// record; the resulting [`crate::gate::StationScope`] is inserted into the
/// request extensions for handlers.
pub async fn require_station(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let now = now_unix().map_err(|e| {
        error!("{}", e);
        AuthError::Internal
    })?;

    let scope = state.gate.authorize_station(req.headers(), None, now).await?;

    req.extensions_mut().insert(scope);

    Ok(next.run(req).await)
}
