//! HTTP client for the proxy endpoint.

use crate::composer::Submission;
use crate::errors::ClientError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body the chat client posts to `/api/generate`.
///
/// Every image travels as a `data:<mime>;base64,<payload>` URI so each one
/// keeps its own mime type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub prompt: String,
    pub images: Vec<String>,
}

impl From<&Submission> for ProxyRequest {
    fn from(submission: &Submission) -> Self {
        ProxyRequest {
            prompt: submission.text.clone(),
            images: submission
                .attachments
                .iter()
                .map(|a| format!("data:{};base64,{}", a.mime_type, a.data))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProxyReply {
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyErrorReply {
    error: String,
}

#[async_trait]
pub trait ProxyClient: Send + Sync {
    /// The `output` of a successful reply; empty when the proxy sent none.
    async fn generate(&self, request: &ProxyRequest) -> Result<String, ClientError>;

    async fn health_check(&self) -> Result<(), ClientError>;
}

pub struct HttpProxyClient {
    base_url: String,
    client: Client,
    timeout: Option<Duration>,
}

impl HttpProxyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ProxyClient for HttpProxyClient {
    async fn generate(&self, request: &ProxyRequest) -> Result<String, ClientError> {
        let url = format!("{}/api/generate", self.base_url);
        log::debug!(
            "Posting prompt with {} image(s) to {}",
            request.images.len(),
            url
        );

        let mut builder = self.client.post(&url).json(request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProxyErrorReply>(&body)
                .map(|reply| reply.error)
                .unwrap_or(body);
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let reply: ProxyReply = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;

        Ok(reply.output.unwrap_or_default())
    }

    async fn health_check(&self) -> Result<(), ClientError> {
        let url = format!("{}/health", self.base_url);
        let mut builder = self.client.get(&url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                status: response.status().as_u16(),
                message: "health check failed".to_string(),
            });
        }
        Ok(())
    }
}
