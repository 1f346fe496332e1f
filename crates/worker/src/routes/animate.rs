//! `POST /animate`.

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use mia_core::job::{AnimationJobRequest, AnimationJobResult};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// The body is taken as raw bytes and parsed here so malformed JSON and
/// over-limit bodies are reported in the same envelope as every other
/// failure.
async fn animate(
    user: AuthUser,
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<Json<AnimationJobResult>> {
    let request = AnimationJobRequest::from_json(&body?)?;
    tracing::debug!(
        subject = user.attributes.subject().unwrap_or("unknown"),
        animation = %request.animation_name,
        "Animate request authenticated",
    );
    let result = state.service.animate(request).await?;
    Ok(Json(result))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/animate", post(animate))
}
