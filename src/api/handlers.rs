use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, Method, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::api::requests::CreateTransactionRequest;
use crate::api::responses::{ApiResponse, HealthResponse, ServiceHealth, TransactionResponse};
use crate::error::AppError;
use crate::services::{CreateOutcome, TransactionService};

use super::routes::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    let redis_healthy = state
        .redis_client
        .get_multiplexed_async_connection()
        .await
        .is_ok();

    let response = HealthResponse {
        status: if db_healthy && redis_healthy {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        services: ServiceHealth {
            database: db_healthy,
            redis: redis_healthy,
        },
    };

    Json(ApiResponse::success("Health check", response, "/health"))
}

/// Readiness check endpoint.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    let db_healthy = sqlx::query("SELECT 1").fetch_one(&state.pool).await.is_ok();

    if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Liveness check endpoint.
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

/// Create a transaction, protected by an idempotency key. Retries with the
/// same key and body replay the recorded response with 200; the first
/// admission returns 201.
pub async fn create_transaction(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), (StatusCode, Json<ApiResponse<serde_json::Value>>)>
{
    let path = uri.path().to_string();

    let idempotency_key = headers
        .get(&state.idempotency.header_name)
        .and_then(|v| v.to_str().ok());

    let request: CreateTransactionRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiResponse::error(
                    "Request validation failed",
                    format!("Invalid request body: {}", e),
                    path,
                )),
            ));
        }
    };

    if let Err(errors) = request.validate() {
        let detail = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");

        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Request validation failed", detail, path)),
        ));
    }

    let service = TransactionService::new(
        state.pool.clone(),
        state.redis_client.clone(),
        state.idempotency.clone(),
        state.metrics.clone(),
    );

    match service
        .create(&Method::POST, idempotency_key, &body, request.into())
        .await
    {
        Ok(CreateOutcome::Created(record)) => {
            let data = serde_json::to_value(TransactionResponse::from(record)).map_err(|e| {
                internal_error(AppError::Internal(e.into()), &path)
            })?;
            Ok((
                StatusCode::CREATED,
                Json(ApiResponse::success("Transaction created", data, path)),
            ))
        }
        Ok(CreateOutcome::Replayed(payload)) => Ok((
            StatusCode::OK,
            Json(ApiResponse::success("Transaction replayed", payload, path)),
        )),
        Err(e) => {
            if matches!(
                e,
                AppError::Database(_) | AppError::Redis(_) | AppError::Internal(_)
            ) {
                tracing::error!("Failed to create transaction: {}", e);
            }
            Err((
                e.status_code(),
                Json(ApiResponse::error(
                    "Transaction request rejected",
                    e.public_message(),
                    path,
                )),
            ))
        }
    }
}

/// Get transaction by ID.
pub async fn get_transaction(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransactionResponse>>, (StatusCode, Json<ApiResponse<TransactionResponse>>)>
{
    let path = uri.path().to_string();

    let service = TransactionService::new(
        state.pool.clone(),
        state.redis_client.clone(),
        state.idempotency.clone(),
        state.metrics.clone(),
    );

    match service.find_transaction(id).await {
        Ok(record) => Ok(Json(ApiResponse::success(
            "Transaction found",
            TransactionResponse::from(record),
            path,
        ))),
        Err(e) => {
            if matches!(e, AppError::Database(_)) {
                tracing::error!("Failed to get transaction: {}", e);
            }
            Err((
                e.status_code(),
                Json(ApiResponse::error(
                    "Transaction lookup failed",
                    e.public_message(),
                    path,
                )),
            ))
        }
    }
}

fn internal_error(
    e: AppError,
    path: &str,
) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    tracing::error!("Internal error: {}", e);
    (
        e.status_code(),
        Json(ApiResponse::error(
            "Transaction request rejected",
            e.public_message(),
            path.to_string(),
        )),
    )
}
