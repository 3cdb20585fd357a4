// HTTP handlers for the node API

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use super::api_types::{ApiErrorBody, ApiErrorCode, ChainInfo, SubmitResponse};
use super::AppState;
use crate::chain::{Address, TxHash};
use crate::errors::AllowlistError;
use crate::ledger::{Query, QueryResult, Receipt, TransactionRequest};

/// Error response: status code plus a JSON `ApiErrorBody`.
pub struct ApiError {
    status: StatusCode,
    body: ApiErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: ApiErrorCode, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ApiErrorBody {
                code,
                error: error.into(),
                registry: None,
            },
        }
    }
}

impl From<AllowlistError> for ApiError {
    fn from(err: AllowlistError) -> Self {
        match err {
            AllowlistError::UnknownRegistry(registry) => Self {
                status: StatusCode::NOT_FOUND,
                body: ApiErrorBody {
                    code: ApiErrorCode::UnknownRegistry,
                    error: err.to_string(),
                    registry: Some(registry),
                },
            },
            AllowlistError::InvalidAddress(_) | AllowlistError::InvalidTxHash(_) => {
                Self::new(StatusCode::BAD_REQUEST, ApiErrorCode::InvalidRequest, err.to_string())
            }
            other => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorCode::Internal,
                other.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Build the node router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/v1/chain", get(handle_chain_info))
        .route("/v1/transactions", post(handle_submit_transaction))
        .route("/v1/transactions/:tx_hash/receipt", get(handle_get_receipt))
        .route("/v1/registries/:address/call", post(handle_call_registry))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state.metrics.render().map_err(|e| {
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorCode::Internal, e.to_string())
    })?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        text,
    )
        .into_response())
}

pub async fn handle_chain_info(State(state): State<AppState>) -> Json<ChainInfo> {
    Json(ChainInfo {
        chain_id: state.ledger.chain_id(),
        block_number: state.ledger.block_number().await,
    })
}

pub async fn handle_submit_transaction(
    State(state): State<AppState>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if !state.limiter.check(request.from) {
        tracing::warn!(from = %request.from, "Rate limit exceeded");
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            ApiErrorCode::RateLimited,
            format!("Too many transactions from {}", request.from),
        ));
    }
    let tx_hash = state.ledger.submit(request).await?;
    Ok(Json(SubmitResponse { tx_hash }))
}

pub async fn handle_get_receipt(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> Result<Json<Receipt>, ApiError> {
    let tx_hash: TxHash = tx_hash.parse()?;
    match state.ledger.receipt(&tx_hash).await {
        Some(receipt) => Ok(Json(receipt)),
        None => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            ApiErrorCode::Pending,
            format!("No receipt for {tx_hash} yet"),
        )),
    }
}

pub async fn handle_call_registry(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(query): Json<Query>,
) -> Result<Json<QueryResult>, ApiError> {
    let registry: Address = address.parse()?;
    let result = state.ledger.call(registry, query).await?;
    Ok(Json(result))
}
