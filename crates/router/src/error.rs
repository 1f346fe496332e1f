use std::any::Any;

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mia_core::error::{CoreError, ErrorBody};

use crate::dispatcher::DispatchError;

/// Application-level error type for router handlers.
///
/// Worker errors keep the worker's status and detail; the router's own
/// failures use the gateway status codes. Every variant renders as an
/// [`ErrorBody`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The request body could not be read, e.g. it exceeds the size limit.
    #[error(transparent)]
    Body(#[from] BytesRejection),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Core(CoreError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("VALIDATION_ERROR", msg),
            ),
            AppError::Core(other) => {
                tracing::error!(error = %other, "Internal core error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("INTERNAL_ERROR", "An internal error occurred"),
                )
            }
            AppError::Body(rejection) => {
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
            AppError::Dispatch(err) => {
                let detail = err.to_string();
                match err {
                    DispatchError::Unavailable { .. } => (
                        StatusCode::SERVICE_UNAVAILABLE,
                        ErrorBody::new("SERVICE_UNAVAILABLE", detail),
                    ),
                    DispatchError::Timeout { .. } => (
                        StatusCode::GATEWAY_TIMEOUT,
                        ErrorBody::new("GATEWAY_TIMEOUT", detail),
                    ),
                    DispatchError::Worker { status, body, .. } => (status, body),
                    DispatchError::BadGateway { .. } => (
                        StatusCode::BAD_GATEWAY,
                        ErrorBody::new("BAD_GATEWAY", detail),
                    ),
                }
            }
        };

        (status, axum::Json(body)).into_response()
    }
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
