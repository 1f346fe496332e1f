use std::sync::Arc;

use crate::dispatcher::Dispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// The worker pool and its HTTP client.
    pub dispatcher: Arc<Dispatcher>,
}
