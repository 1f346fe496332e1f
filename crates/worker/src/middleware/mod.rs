//! Request extractors shared by worker handlers.
//!
//! - [`auth::AuthUser`] -- Authenticates the caller's `x-api-key` or
//!   `Authorization` header against the identity service.

pub mod auth;
