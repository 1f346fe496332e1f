//! Caller authentication for the worker.
//!
//! Callers present either an `x-api-key` or an `Authorization` header. The
//! credential is checked against the identity service and successful checks
//! are cached for a fixed TTL, keyed by a hash of the header name and value.

pub mod identity;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;

use self::identity::{IdentityError, IdentityProvider, UserAttributes};

/// Which header carried the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialHeader {
    ApiKey,
    Authorization,
}

impl CredentialHeader {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialHeader::ApiKey => "x-api-key",
            CredentialHeader::Authorization => "authorization",
        }
    }
}

/// A credential exactly as the caller sent it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    header: CredentialHeader,
    value: String,
}

impl Credential {
    pub fn new(header: CredentialHeader, value: impl Into<String>) -> Self {
        Self {
            header,
            value: value.into(),
        }
    }

    /// Pick the credential from request headers. `x-api-key` wins when both
    /// are present; empty or non-ASCII values count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        [CredentialHeader::ApiKey, CredentialHeader::Authorization]
            .into_iter()
            .find_map(|header| {
                headers
                    .get(header.as_str())
                    .and_then(|v| v.to_str().ok())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| Credential::new(header, v))
            })
    }

    pub fn header(&self) -> CredentialHeader {
        self.header
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Cache key. The raw secret is never stored.
    fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.header.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(self.value.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("header", &self.header)
            .field("value", &"<redacted>")
            .finish()
    }
}

struct CachedUser {
    user: UserAttributes,
    expires_at: Instant,
}

/// Verifies credentials and remembers the ones that passed.
pub struct AuthGate {
    provider: Arc<dyn IdentityProvider>,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedUser>>,
}

impl AuthGate {
    pub fn new(provider: Arc<dyn IdentityProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Return the caller's user record, consulting the cache first.
    ///
    /// Rejections are not cached, so a credential that was just issued is
    /// accepted on the next attempt.
    pub async fn authenticate(
        &self,
        credential: &Credential,
    ) -> Result<UserAttributes, IdentityError> {
        let key = credential.cache_key();

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.user.clone());
                }
            }
        }

        let user = self.provider.verify(credential).await?;

        let now = Instant::now();
        let mut cache = self.cache.write().await;
        cache.retain(|_, entry| entry.expires_at > now);
        cache.insert(
            key,
            CachedUser {
                user: user.clone(),
                expires_at: now + self.ttl,
            },
        );
        Ok(user)
    }

    /// Number of live cache entries.
    pub async fn cached_len(&self) -> usize {
        let now = Instant::now();
        self.cache
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}
