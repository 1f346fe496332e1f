//! Client for the external identity service.
//!
//! A credential is valid when any configured identity endpoint answers
//! `GET` with 200 and a JSON body. Endpoints are tried in order, so the
//! production endpoint can be listed before its development fallback.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Credential;

/// Opaque user record returned by the identity service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserAttributes(pub serde_json::Map<String, serde_json::Value>);

impl UserAttributes {
    /// A display-friendly identifier for logs, when the record carries one.
    pub fn subject(&self) -> Option<&str> {
        ["email", "username", "id", "_id"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(|v| v.as_str()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// No endpoint accepted the credential.
    #[error("Invalid credentials")]
    Rejected,
}

/// Something that can turn a credential into a user record.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &Credential) -> Result<UserAttributes, IdentityError>;
}

/// [`IdentityProvider`] backed by HTTP identity endpoints.
pub struct HttpIdentityClient {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

impl HttpIdentityClient {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoints })
    }

    async fn try_endpoint(
        &self,
        endpoint: &str,
        credential: &Credential,
    ) -> Result<UserAttributes, String> {
        let response = self
            .client
            .get(endpoint)
            .header(credential.header().as_str(), credential.value())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(format!("status {status}"));
        }
        response
            .json::<UserAttributes>()
            .await
            .map_err(|e| format!("invalid body: {e}"))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityClient {
    async fn verify(&self, credential: &Credential) -> Result<UserAttributes, IdentityError> {
        for endpoint in &self.endpoints {
            match self.try_endpoint(endpoint, credential).await {
                Ok(user) => return Ok(user),
                Err(reason) => {
                    tracing::debug!(endpoint = %endpoint, reason = %reason, "Identity endpoint rejected credential");
                }
            }
        }
        Err(IdentityError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::Json;
    use tokio::net::TcpListener;

    use super::*;
    use crate::auth::CredentialHeader;

    async fn spawn(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/user/userdata")
    }

    fn accepting(key: &'static str) -> axum::Router {
        axum::Router::new().route(
            "/user/userdata",
            get(move |headers: HeaderMap| async move {
                if headers.get("x-api-key").and_then(|v| v.to_str().ok()) == Some(key) {
                    Ok(Json(serde_json::json!({"email": "dev@example.com"})))
                } else {
                    Err(StatusCode::UNAUTHORIZED)
                }
            }),
        )
    }

    #[tokio::test]
    async fn falls_back_to_second_endpoint() {
        let primary = spawn(accepting("other")).await;
        let fallback = spawn(accepting("k1")).await;
        let client =
            HttpIdentityClient::new(vec![primary, fallback], Duration::from_secs(5)).unwrap();

        let user = client
            .verify(&Credential::new(CredentialHeader::ApiKey, "k1"))
            .await
            .unwrap();
        assert_eq!(user.subject(), Some("dev@example.com"));
    }

    #[tokio::test]
    async fn rejected_when_no_endpoint_accepts() {
        let only = spawn(accepting("other")).await;
        let client = HttpIdentityClient::new(vec![only], Duration::from_secs(5)).unwrap();

        let err = client
            .verify(&Credential::new(CredentialHeader::ApiKey, "k1"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_rejection() {
        let client = HttpIdentityClient::new(
            vec!["http://127.0.0.1:1/user/userdata".to_string()],
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client
            .verify(&Credential::new(CredentialHeader::Authorization, "Bearer t"))
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Rejected));
    }
}
