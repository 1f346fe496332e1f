//! Credential-checking extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use mia_core::error::CoreError;

use crate::auth::identity::UserAttributes;
use crate::auth::Credential;
use crate::error::AppError;
use crate::state::AppState;

/// Caller whose credential the identity service accepted.
///
/// Use this as the first extractor parameter so unauthenticated requests are
/// rejected before the body is read:
///
/// ```ignore
/// async fn animate(user: AuthUser, body: Bytes) -> AppResult<Json<()>> {
///     tracing::info!(subject = ?user.attributes.subject(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user record returned by the identity service.
    pub attributes: UserAttributes,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let credential = Credential::from_headers(&parts.headers).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing auth header".into()))
        })?;

        let attributes = state
            .auth
            .authenticate(&credential)
            .await
            .map_err(|e| AppError::Core(CoreError::Forbidden(e.to_string())))?;

        Ok(AuthUser { attributes })
    }
}
