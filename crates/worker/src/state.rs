use std::sync::Arc;

use crate::auth::AuthGate;
use crate::service::AnimationService;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything lives behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Credential verification with its TTL cache.
    pub auth: Arc<AuthGate>,
    /// Animation jobs and the GPU lease.
    pub service: Arc<AnimationService>,
}
