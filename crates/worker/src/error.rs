use std::any::Any;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mia_core::error::{CoreError, ErrorBody};

/// Application-level error type for worker handlers.
///
/// Wraps [`CoreError`] for domain errors and adds the pipeline failure
/// modes. Every variant renders as an [`ErrorBody`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The pipeline failed. The message is returned to the caller; the full
    /// diagnostic has already been logged.
    #[error("Pipeline failed: {0}")]
    Pipeline(String),

    /// The pipeline reported success but its artifact is not on disk.
    #[error("No GLB file was produced.")]
    NoArtifact,

    /// The request body could not be read, e.g. it exceeds the size limit.
    #[error(transparent)]
    Body(#[from] BytesRejection),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let internal = || {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("INTERNAL_ERROR", "An internal error occurred"),
            )
        };

        let (status, body) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound(msg) => {
                    (StatusCode::NOT_FOUND, ErrorBody::new("NOT_FOUND", msg.as_str()))
                }
                CoreError::Validation(msg) => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody::new("VALIDATION_ERROR", msg.as_str()),
                ),
                CoreError::Unauthorized(msg) => (
                    StatusCode::UNAUTHORIZED,
                    ErrorBody::new("UNAUTHORIZED", msg.as_str()),
                ),
                CoreError::Forbidden(msg) => {
                    (StatusCode::FORBIDDEN, ErrorBody::new("FORBIDDEN", msg.as_str()))
                }
                CoreError::Config(msg) | CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },
            AppError::Pipeline(_) | AppError::NoArtifact => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("PIPELINE_ERROR", self.to_string()),
            ),
            AppError::Body(rejection) => body_rejection(rejection),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn body_rejection(rejection: &BytesRejection) -> (StatusCode, ErrorBody) {
    let status = rejection.status();
    let detail = if status.is_server_error() {
        tracing::error!(error = %rejection, "Failed to read request body");
        "An internal error occurred".to_string()
    } else {
        tracing::warn!(status = status.as_u16(), error = %rejection, "Rejected request body");
        rejection.body_text()
    };
    (status, ErrorBody::for_status(status.as_u16(), detail))
}

/// Panic handler for `CatchPanicLayer`: a 500 in the standard envelope.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = err
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| err.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %message, "Handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(ErrorBody::new("INTERNAL_ERROR", "An internal error occurred")),
    )
        .into_response()
}
