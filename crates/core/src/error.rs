use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error envelope shared by the router and the workers.
///
/// Both services emit exactly this shape for every failure, so a caller can
/// only tell the layers apart by status code and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description of the failure.
    pub detail: String,
    /// Stable machine-readable tag, e.g. `VALIDATION_ERROR`.
    #[serde(default)]
    pub code: String,
}

impl ErrorBody {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: code.into(),
        }
    }

    /// Envelope for a failure the HTTP framework raised before a handler
    /// ran, such as an over-limit body. The code follows the status class.
    pub fn for_status(status: u16, detail: impl Into<String>) -> Self {
        let code = match status {
            413 => "PAYLOAD_TOO_LARGE",
            400..=499 => "VALIDATION_ERROR",
            _ => "INTERNAL_ERROR",
        };
        Self::new(code, detail)
    }
}
