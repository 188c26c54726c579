use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::IdempotencySettings;
use crate::idempotency::IdempotencyMetrics;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis_client: redis::Client,
    pub idempotency: IdempotencySettings,
    pub metrics: Arc<IdempotencyMetrics>,
}

impl AppState {
    pub fn new(pool: PgPool, redis_client: redis::Client, idempotency: IdempotencySettings) -> Self {
        Self {
            pool,
            redis_client,
            idempotency,
            metrics: Arc::new(IdempotencyMetrics::new()),
        }
    }
}

/// Creates the main API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check))
        // Transaction endpoints
        .route("/transactions", post(handlers::create_transaction))
        .route("/transactions/:id", get(handlers::get_transaction))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
