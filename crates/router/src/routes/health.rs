use axum::extract::State;
use axum::{routing::get, Json, Router};
use mia_core::pool::WorkerAddress;
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Base URLs of the pool, in dispatch order.
    pub configured_workers: Vec<WorkerAddress>,
}

/// GET /health -- reports the configured pool. Workers are not probed.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "Router is active.",
        configured_workers: state.dispatcher.pool().workers().to_vec(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
