//! Question answering endpoints, direct and agentic.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::{ApiError, error_response, require_user};
use crate::auth::UserContext;
use crate::qa::QueryContext;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub response: String,
}

/// POST /api/query - Classify the question and run the matching strategy.
pub async fn direct_query(
    State(state): State<AppState>,
    user: Option<Extension<UserContext>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let user_id = require_user(user)?;
    if req.question.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Missing question"));
    }

    let ctx = QueryContext::new(user_id);
    let response = state.router.route(&ctx, &req.question).await;
    Ok(Json(QueryResponse { response }))
}

/// POST /api/agent/query - Run the agent loop over the question.
pub async fn agentic_query(
    State(state): State<AppState>,
    user: Option<Extension<UserContext>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let user_id = require_user(user)?;
    if req.question.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "Missing question"));
    }

    let ctx = QueryContext::new(user_id);
    match state.agent.run(&ctx, &req.question).await {
        Ok(response) => Ok(Json(QueryResponse { response })),
        Err(e) => {
            tracing::error!(user_id = %ctx.user_id, error = %e, "Agent run failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Agent error: {e}"),
            ))
        }
    }
}
