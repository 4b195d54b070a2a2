//! Transaction ingestion and listing.

use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::api::{ApiError, error_response, require_user};
use crate::auth::UserContext;
use crate::store::Transaction;

/// Ingestion payload. All five fields are required; deserialization rejects
/// the request before any store is touched.
#[derive(Debug, Deserialize)]
pub struct TransactionPayload {
    pub amount: f64,
    pub transaction_type: String,
    pub category: String,
    pub description: String,
    pub date: String,
}

impl From<TransactionPayload> for Transaction {
    fn from(p: TransactionPayload) -> Self {
        Self {
            amount: p.amount,
            transaction_type: p.transaction_type,
            category: p.category,
            description: p.description,
            date: p.date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub transactions: Vec<Transaction>,
}

/// POST /api/transactions - Log a transaction and index its rendering.
///
/// Log first, index second. If the index write fails after the log append,
/// the stores have diverged: the entry is recoverable from the log and the
/// failure is surfaced to the client.
pub async fn create_transaction(
    State(state): State<AppState>,
    user: Option<Extension<UserContext>>,
    Json(payload): Json<TransactionPayload>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let user_id = require_user(user)?;
    let txn: Transaction = payload.into();

    state.log.append(&user_id, &txn).await.map_err(|e| {
        tracing::error!(user_id = %user_id, error = %e, "Log append failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    if let Err(e) = state.index.upsert(&user_id, &txn.render()).await {
        tracing::error!(
            user_id = %user_id,
            error = %e,
            "Index update failed after log append; log and index have diverged"
        );
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("transaction logged but not indexed: {e}"),
        ));
    }

    tracing::info!(
        name: "transaction.recorded",
        user_id = %user_id,
        category = %txn.category,
        "Transaction recorded"
    );

    Ok((
        StatusCode::OK,
        Json(IngestResponse {
            message: "Transaction recorded".to_string(),
        }),
    ))
}

/// GET /api/transactions - Full history in submission order.
pub async fn list_transactions(
    State(state): State<AppState>,
    user: Option<Extension<UserContext>>,
) -> Result<Json<ListResponse>, ApiError> {
    let user_id = require_user(user)?;

    let transactions = state.log.list(&user_id).await.map_err(|e| {
        tracing::error!(user_id = %user_id, error = %e, "Listing failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(ListResponse { transactions }))
}
