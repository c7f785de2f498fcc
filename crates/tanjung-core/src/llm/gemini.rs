//! Google Gemini API client implementation
//!
//! Talks to the `generateContent` REST endpoint directly. The response body is
//! returned untouched; [`GeminiTextExtractor`] knows how to read text out of it.

use super::extract::TextExtractor;
use super::{GenerationRequest, Generator, InputPart, ProviderResponse};
use crate::config::DEFAULT_GEMINI_BASE_URL;
use crate::errors::{ExtractionError, ProxyError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Google Gemini API client
pub struct GeminiClient {
    client: Client,
    base_url: String,
}

impl GeminiClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GEMINI_BASE_URL.to_string())
    }

    /// Create a new Gemini client with custom base URL
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiInlineData {
    data: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "topP")]
    top_p: f32,
    #[serde(rename = "topK")]
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback", default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason", default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason", default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    code: u16,
    message: String,
}

fn to_gemini_request(request: &GenerationRequest) -> GeminiRequest {
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            InputPart::Text(text) => GeminiPart::Text { text: text.clone() },
            InputPart::InlineData { data, mime_type } => GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    data: data.clone(),
                    mime_type: mime_type.clone(),
                },
            },
        })
        .collect();

    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config: GeminiGenerationConfig {
            temperature: request.config.temperature,
            max_output_tokens: request.config.max_output_tokens,
            top_p: request.config.top_p,
            top_k: request.config.top_k,
        },
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(
        &self,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProxyError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.config.model
        );
        log::debug!(
            "Sending {} part(s) to Gemini model {}",
            request.parts.len(),
            request.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&to_gemini_request(request))
            .send()
            .await
            .map_err(|e| ProxyError::upstream(format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if let Ok(gemini_error) = serde_json::from_str::<GeminiError>(&error_text) {
                return Err(ProxyError::upstream(format!(
                    "Gemini API error {}: {}",
                    gemini_error.error.code, gemini_error.error.message
                )));
            }

            return Err(ProxyError::upstream(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            ProxyError::upstream(format!("Failed to parse Gemini response: {}", e))
        })?;

        Ok(ProviderResponse(body))
    }
}

/// Reads the text of the first candidate, the way the Gemini SDKs'
/// `response.text()` accessor does.
pub struct GeminiTextExtractor;

const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "SPII"];

impl TextExtractor for GeminiTextExtractor {
    fn extract_text(&self, response: &ProviderResponse) -> Result<String, ExtractionError> {
        let parsed: GeminiResponse =
            serde_json::from_value(response.raw().clone()).map_err(|_| ExtractionError::NoCandidates)?;

        let candidate = match parsed.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
                    return Err(ExtractionError::Blocked(reason));
                }
                return Err(ExtractionError::NoCandidates);
            }
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if BLOCKING_FINISH_REASONS.contains(&reason) {
                return Err(ExtractionError::Blocked(reason.to_string()));
            }
        }

        let texts: Vec<String> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                GeminiPart::Text { text } => Some(text),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            return Err(ExtractionError::NoText);
        }

        Ok(texts.concat())
    }
}
