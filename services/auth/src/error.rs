//! Error taxonomy for the session and authorization layer

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::codec::CodecError;

/// Errors surfaced by the authorization gate and the HTTP layer
#[derive(Error, Debug)]
pub enum AuthError {
    /// Structurally invalid token
    #[error("Malformed token")]
    Malformed,

    /// HMAC mismatch
    #[error("Bad token signature")]
    BadSignature,

    /// Token `exp` is in the past
    #[error("Session expired")]
    Expired,

    /// No usable credential was presented
    #[error("Unauthorized")]
    Unauthenticated,

    /// A credential was presented but does not cover the target
    #[error("Forbidden")]
    NotAuthorized,

    /// Referenced event or station does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Signing key missing in a production deployment
    #[error("SESSION_SECRET must be set in production")]
    MisconfiguredSecret,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Directory lookup failed
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),

    /// Internal server error
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Malformed
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::NotAuthorized => StatusCode::FORBIDDEN,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::MisconfiguredSecret | AuthError::Database(_) | AuthError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller
    ///
    /// Invalid, expired and absent sessions all read the same, and forbidden
    /// responses never say which check failed.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Malformed
            | AuthError::BadSignature
            | AuthError::Expired
            | AuthError::Unauthenticated => "Unauthorized".to_string(),
            AuthError::NotAuthorized => "Forbidden".to_string(),
            AuthError::NotFound(what) => format!("{} not found", what),
            AuthError::BadRequest(msg) => msg.clone(),
            AuthError::MisconfiguredSecret | AuthError::Database(_) | AuthError::Internal => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<CodecError> for AuthError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed | CodecError::InvalidPayload => AuthError::Malformed,
            CodecError::BadSignature => AuthError::BadSignature,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let AuthError::Database(ref e) = self {
            tracing::error!("Directory lookup failed: {}", e);
        }

        let body = Json(json!({
            "error": self.public_message(),
        }));

        (self.status(), body).into_response()
    }
}

/// Type alias for results in this crate
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_failures_look_alike() {
        for err in [
            AuthError::Malformed,
            AuthError::BadSignature,
            AuthError::Expired,
            AuthError::Unauthenticated,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.public_message(), "Unauthorized");
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(AuthError::NotAuthorized.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthError::NotFound("Event").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AuthError::MisconfiguredSecret.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthError::NotFound("Event").public_message(), "Event not found");
    }
}
