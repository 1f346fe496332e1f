use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use mia_core::job::{AnimationJobRequest, AnimationJobResult, AnimationName, AnimationOptions};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Sends animation jobs to a router or worker.
pub struct AnimateClient {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl AnimateClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            url: config.animate_url(),
            api_key: config.api_key.clone(),
        })
    }

    /// Build the request body for a mesh file's raw bytes.
    pub fn job_for(mesh: &[u8], animation: AnimationName) -> AnimationJobRequest {
        AnimationJobRequest {
            mesh_b64_str: STANDARD.encode(mesh),
            animation_name: animation,
            options: AnimationOptions::default(),
        }
    }

    /// Post one job and wait for the finished result.
    pub async fn animate(
        &self,
        job: &AnimationJobRequest,
    ) -> Result<AnimationJobResult, ClientError> {
        let response = self
            .http
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .json(job)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}
