//! Generative provider abstraction.
//!
//! The proxy only needs one capability from a provider: take a list of input
//! parts plus generation parameters and hand back the raw response object. Text
//! extraction lives in [`extract`] so the proxy never depends on the provider's
//! exact response shape.

use crate::config::GenerationConfig;
use crate::errors::ProxyError;
use async_trait::async_trait;
use serde_json::Value;

pub mod extract;
pub mod gemini;

pub use extract::{normalize_output, TextExtractor};
pub use gemini::{GeminiClient, GeminiTextExtractor};

#[derive(Debug, Clone, PartialEq)]
pub enum InputPart {
    Text(String),
    InlineData { data: String, mime_type: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub parts: Vec<InputPart>,
    pub config: GenerationConfig,
}

/// Provider response kept as the raw JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse(pub Value);

impl ProviderResponse {
    pub fn raw(&self) -> &Value {
        &self.0
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProxyError>;
}
