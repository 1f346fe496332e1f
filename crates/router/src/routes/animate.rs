//! `POST /animate` -- forward to the next worker.

use axum::body::{Body, Bytes};
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::dispatcher::check_envelope;
use crate::error::AppResult;
use crate::state::AppState;

/// The worker's body is relayed byte-for-byte with its status code.
async fn animate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Response> {
    let body = body?;
    check_envelope(&body)?;

    let reply = state.dispatcher.dispatch(body, &headers).await?;
    let content_type = reply
        .content_type
        .unwrap_or_else(|| HeaderValue::from_static("application/json"));

    Ok((reply.status, [(CONTENT_TYPE, content_type)], Body::from(reply.body)).into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/animate", post(animate))
}
