//! Forwarding of animation requests to the worker pool.
//!
//! Each dispatch advances the pool cursor exactly once, forwards the body
//! unchanged to the selected worker and classifies whatever comes back.
//! There is no retry on another worker: a request is tied to the worker the
//! cursor picked for it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use mia_core::error::{CoreError, ErrorBody};
use mia_core::pool::{WorkerAddress, WorkerPool};
use serde::de::IgnoredAny;

/// Detail used when a worker fails without a readable error envelope.
pub const UNKNOWN_WORKER_ERROR: &str = "An unknown error occurred on the worker server.";

/// Caller headers copied onto the forwarded request. Everything else is
/// dropped.
const FORWARDED_HEADERS: [HeaderName; 2] = [AUTHORIZATION, HeaderName::from_static("x-api-key")];

/// A worker's successful answer, relayed to the caller as-is.
#[derive(Debug)]
pub struct WorkerReply {
    pub worker: WorkerAddress,
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The worker did not accept the connection.
    #[error("Could not connect to worker server at {worker}. The service may be down.")]
    Unavailable { worker: WorkerAddress },

    /// The worker did not answer within the forwarding timeout.
    #[error("Request to worker server at {worker} timed out after {timeout_secs} seconds.")]
    Timeout {
        worker: WorkerAddress,
        timeout_secs: u64,
    },

    /// The worker answered with a non-success status.
    #[error("{}", body.detail)]
    Worker {
        worker: WorkerAddress,
        status: StatusCode,
        body: ErrorBody,
    },

    /// Any other transport failure.
    #[error("Invalid response from worker server.")]
    BadGateway {
        worker: WorkerAddress,
        reason: String,
    },
}

/// Check that `body` is a JSON object without materialising its values.
pub fn check_envelope(body: &[u8]) -> Result<(), CoreError> {
    serde_json::from_slice::<HashMap<String, IgnoredAny>>(body)
        .map(|_| ())
        .map_err(|e| CoreError::Validation(format!("Request body must be a JSON object: {e}")))
}

/// Round-robin dispatcher over a fixed worker pool.
pub struct Dispatcher {
    pool: WorkerPool,
    client: reqwest::Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(pool: WorkerPool, timeout: Duration) -> Result<Self, reqwest::Error> {
        // Workers live on the private network; never route them via a proxy.
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            pool,
            client,
            timeout,
        })
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Forward `body` to the next worker and wait for its answer.
    pub async fn dispatch(
        &self,
        body: Bytes,
        headers: &HeaderMap,
    ) -> Result<WorkerReply, DispatchError> {
        let worker = self.pool.next().clone();
        let started = Instant::now();
        tracing::info!(worker = %worker, body_bytes = body.len(), "Forwarding animation request");

        let mut request = self
            .client
            .post(worker.endpoint("/animate"))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);
        for name in &FORWARDED_HEADERS {
            if let Some(value) = headers.get(name) {
                request = request.header(name.clone(), value.clone());
            }
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Err(self.classify(worker, e)),
        };

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Err(self.classify(worker, e)),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        if status.is_success() {
            tracing::info!(worker = %worker, status = status.as_u16(), duration_ms, "Worker answered");
            return Ok(WorkerReply {
                worker,
                status,
                content_type,
                body,
            });
        }

        let mut error = serde_json::from_slice::<ErrorBody>(&body)
            .unwrap_or_else(|_| ErrorBody::new("WORKER_ERROR", UNKNOWN_WORKER_ERROR));
        if error.code.is_empty() {
            error.code = "WORKER_ERROR".to_string();
        }
        tracing::warn!(
            worker = %worker,
            status = status.as_u16(),
            duration_ms,
            detail = %error.detail,
            "Worker returned an error",
        );
        Err(DispatchError::Worker {
            worker,
            status,
            body: error,
        })
    }

    fn classify(&self, worker: WorkerAddress, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            tracing::warn!(worker = %worker, timeout_secs = self.timeout.as_secs(), "Worker timed out");
            DispatchError::Timeout {
                worker,
                timeout_secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            tracing::warn!(worker = %worker, error = %err, "Worker unreachable");
            DispatchError::Unavailable { worker }
        } else {
            tracing::error!(worker = %worker, error = %err, "Forwarding to worker failed");
            DispatchError::BadGateway {
                worker,
                reason: err.to_string(),
            }
        }
    }
}
