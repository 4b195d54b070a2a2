//! HTTP API handlers.

pub mod query;
pub mod transactions;

use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;

use crate::auth::UserContext;

/// Standard error body: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorBody>);

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

/// Resolve the authenticated user or reject with 401.
///
/// The auth middleware injects the extension when a valid token is present;
/// in dev mode (`jwt_required = false`) a request can reach a handler
/// without one, and identity-requiring endpoints still refuse it.
pub(crate) fn require_user(user: Option<Extension<UserContext>>) -> Result<String, ApiError> {
    user.map(|Extension(ctx)| ctx.user_id)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Unauthorized"))
}
