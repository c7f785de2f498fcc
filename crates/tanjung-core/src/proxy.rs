//! The proxy behind `POST /api/generate`.
//!
//! [`ProxyService`] is framework independent: it takes the decoded JSON body,
//! validates it, resolves the API key, calls the provider and normalises the
//! answer to plain text. The HTTP layer only maps its errors to status codes.

use crate::config::{GenerationConfig, TanjungConfig};
use crate::errors::ProxyError;
use crate::llm::{
    normalize_output, GeminiClient, GeminiTextExtractor, GenerationRequest, Generator, InputPart,
    TextExtractor,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::sync::{Arc, OnceLock};

pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/png";
pub const MISSING_PROMPT_MESSAGE: &str = "Prompt wajib diisi";

fn data_uri_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^data:(image/\w+);base64,").expect("static regex"))
}

/// Strips a `data:image/<type>;base64,` header, returning the payload and the
/// mime type named in the header, if there was one.
pub fn strip_data_uri(image: &str) -> (&str, Option<&str>) {
    match data_uri_prefix().captures(image) {
        Some(caps) => {
            let header = caps.get(0).map(|m| m.end()).unwrap_or(0);
            (&image[header..], caps.get(1).map(|m| m.as_str()))
        }
        None => (image, None),
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl GenerateRequest {
    /// Validates and decodes a raw request body.
    pub fn from_json(body: Value) -> Result<Self, ProxyError> {
        let prompt_ok = body
            .get("prompt")
            .and_then(Value::as_str)
            .map(|p| !p.is_empty())
            .unwrap_or(false);
        if !prompt_ok {
            return Err(ProxyError::invalid_input(MISSING_PROMPT_MESSAGE));
        }

        serde_json::from_value(body)
            .map_err(|e| ProxyError::invalid_input(format!("Request tidak valid: {}", e)))
    }

    /// Request fields override the configured defaults.
    pub fn generation_config(&self, defaults: &GenerationConfig) -> GenerationConfig {
        GenerationConfig {
            model: self.model.clone().unwrap_or_else(|| defaults.model.clone()),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_output_tokens: self.max_output_tokens.unwrap_or(defaults.max_output_tokens),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            top_k: self.top_k.unwrap_or(defaults.top_k),
        }
    }

    /// Text part first, then one inline image part per supplied image.
    pub fn input_parts(&self) -> Vec<InputPart> {
        let mut parts = vec![InputPart::Text(self.prompt.clone())];

        let images = self
            .image
            .iter()
            .chain(self.images.iter().flatten())
            .filter(|image| !image.is_empty());

        for image in images {
            let (data, header_mime) = strip_data_uri(image);
            let mime_type = header_mime
                .or(self.mime_type.as_deref().filter(|m| !m.is_empty()))
                .unwrap_or(DEFAULT_IMAGE_MIME_TYPE);
            parts.push(InputPart::InlineData {
                data: data.to_string(),
                mime_type: mime_type.to_string(),
            });
        }

        parts
    }

    pub fn to_generation_request(&self, defaults: &GenerationConfig) -> GenerationRequest {
        GenerationRequest {
            parts: self.input_parts(),
            config: self.generation_config(defaults),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub output: String,
}

/// Where the provider API key comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Read the named environment variable on every request.
    Env(String),
    Static(Option<String>),
}

impl CredentialSource {
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            CredentialSource::Env(name) => env::var(name).ok(),
            CredentialSource::Static(key) => key.clone(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn describe(&self) -> &str {
        match self {
            CredentialSource::Env(name) => name,
            CredentialSource::Static(_) => "API key",
        }
    }
}

pub struct ProxyService {
    generator: Arc<dyn Generator>,
    extractor: Arc<dyn TextExtractor>,
    credentials: CredentialSource,
    defaults: GenerationConfig,
}

impl ProxyService {
    pub fn new(
        generator: Arc<dyn Generator>,
        extractor: Arc<dyn TextExtractor>,
        credentials: CredentialSource,
        defaults: GenerationConfig,
    ) -> Self {
        Self {
            generator,
            extractor,
            credentials,
            defaults,
        }
    }

    /// Gemini-backed service built from configuration.
    pub fn from_config(config: &TanjungConfig) -> Self {
        Self::new(
            Arc::new(GeminiClient::with_base_url(config.provider.base_url.clone())),
            Arc::new(GeminiTextExtractor),
            CredentialSource::Env(config.provider.api_key_env.clone()),
            config.generation.clone(),
        )
    }

    pub fn defaults(&self) -> &GenerationConfig {
        &self.defaults
    }

    pub async fn handle(&self, body: Value) -> Result<GenerateResponse, ProxyError> {
        let request = GenerateRequest::from_json(body)?;

        let api_key = self.credentials.resolve().ok_or_else(|| {
            ProxyError::missing_credential(format!(
                "{} belum diset",
                self.credentials.describe()
            ))
        })?;

        let generation = request.to_generation_request(&self.defaults);
        log::info!(
            "Generating with model {} ({} image part(s))",
            generation.config.model,
            generation.parts.len() - 1
        );

        let response = self.generator.generate(&api_key, &generation).await?;
        let output = normalize_output(self.extractor.as_ref(), &response);

        Ok(GenerateResponse { output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderResponse;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingGenerator {
        response: Result<Value, ProxyError>,
        seen: Mutex<Vec<(String, GenerationRequest)>>,
    }

    impl RecordingGenerator {
        fn new(response: Result<Value, ProxyError>) -> Arc<Self> {
            Arc::new(Self {
                response,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        async fn generate(
            &self,
            api_key: &str,
            request: &GenerationRequest,
        ) -> Result<ProviderResponse, ProxyError> {
            self.seen
                .lock()
                .unwrap()
                .push((api_key.to_string(), request.clone()));
            self.response.clone().map(ProviderResponse)
        }
    }

    fn service(generator: Arc<RecordingGenerator>, key: Option<&str>) -> ProxyService {
        ProxyService::new(
            generator,
            Arc::new(GeminiTextExtractor),
            CredentialSource::Static(key.map(str::to_string)),
            GenerationConfig::default(),
        )
    }

    fn gemini_text(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    #[test]
    fn test_strip_data_uri() {
        assert_eq!(
            strip_data_uri("data:image/jpeg;base64,AAAA"),
            ("AAAA", Some("image/jpeg"))
        );
        assert_eq!(strip_data_uri("AAAA"), ("AAAA", None));
        assert_eq!(
            strip_data_uri("data:text/plain;base64,AAAA"),
            ("data:text/plain;base64,AAAA", None)
        );
    }

    #[test]
    fn test_missing_prompt_is_invalid_input() {
        for body in [
            json!({}),
            json!({"prompt": null}),
            json!({"prompt": 42}),
            json!({"prompt": ["a"]}),
            json!({"prompt": ""}),
            json!("just a string"),
        ] {
            let err = GenerateRequest::from_json(body.clone()).unwrap_err();
            assert_eq!(err.status_code(), 400, "body: {}", body);
        }
    }

    #[test]
    fn test_wrong_optional_type_is_invalid_input() {
        let err = GenerateRequest::from_json(json!({"prompt": "hi", "temperature": "hot"}))
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidInput(_)));
    }

    #[test]
    fn test_generation_config_defaults_and_overrides() {
        let request = GenerateRequest::from_json(json!({"prompt": "hi", "topK": 5, "model": "m"}))
            .unwrap();
        let config = request.generation_config(&GenerationConfig::default());
        assert_eq!(config.model, "m");
        assert_eq!(config.top_k, 5);
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(config.top_p, 0.8);
    }

    #[test]
    fn test_input_parts_text_only() {
        let request = GenerateRequest::from_json(json!({"prompt": "hi", "images": []})).unwrap();
        assert_eq!(request.input_parts(), vec![InputPart::Text("hi".to_string())]);
    }

    #[test]
    fn test_input_parts_with_images() {
        let request = GenerateRequest::from_json(json!({
            "prompt": "what is this",
            "image": "data:image/jpeg;base64,JPEG",
            "images": ["PNG1"],
        }))
        .unwrap();
        assert_eq!(
            request.input_parts(),
            vec![
                InputPart::Text("what is this".to_string()),
                InputPart::InlineData {
                    data: "JPEG".to_string(),
                    mime_type: "image/jpeg".to_string()
                },
                InputPart::InlineData {
                    data: "PNG1".to_string(),
                    mime_type: "image/png".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_data_uri_header_wins_over_request_mime_type() {
        let request = GenerateRequest::from_json(json!({
            "prompt": "p",
            "images": ["data:image/jpeg;base64,X", "Y"],
            "mimeType": "image/webp"
        }))
        .unwrap();
        assert_eq!(
            request.input_parts()[1..].to_vec(),
            vec![
                InputPart::InlineData {
                    data: "X".to_string(),
                    mime_type: "image/jpeg".to_string()
                },
                InputPart::InlineData {
                    data: "Y".to_string(),
                    mime_type: "image/webp".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_handle_success() {
        let generator = RecordingGenerator::new(Ok(gemini_text("Halo")));
        let service = service(generator.clone(), Some("secret"));

        let response = service.handle(json!({"prompt": "Apa itu React?"})).await.unwrap();
        assert_eq!(response.output, "Halo");

        let seen = generator.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "secret");
        assert_eq!(seen[0].1.config, GenerationConfig::default());
    }

    #[tokio::test]
    async fn test_handle_missing_credential() {
        let generator = RecordingGenerator::new(Ok(gemini_text("unused")));
        let service = service(generator.clone(), None);

        for prompt in ["a", "Apa itu React?", "long prompt with spaces"] {
            let err = service.handle(json!({ "prompt": prompt })).await.unwrap_err();
            assert!(matches!(err, ProxyError::MissingCredential(_)));
            assert_eq!(err.status_code(), 500);
        }
        assert!(generator.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_input_checked_before_credential() {
        let generator = RecordingGenerator::new(Ok(gemini_text("unused")));
        let service = service(generator, None);
        let err = service.handle(json!({"prompt": 1})).await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn test_handle_falls_back_to_raw_json() {
        let raw = json!({"candidates": []});
        let generator = RecordingGenerator::new(Ok(raw.clone()));
        let service = service(generator, Some("k"));

        let response = service.handle(json!({"prompt": "x"})).await.unwrap();
        assert_eq!(response.output, serde_json::to_string(&raw).unwrap());
    }

    #[tokio::test]
    async fn test_handle_upstream_failure_passes_message() {
        let generator = RecordingGenerator::new(Err(ProxyError::upstream("quota exceeded")));
        let service = service(generator, Some("k"));

        let err = service.handle(json!({"prompt": "x"})).await.unwrap_err();
        assert_eq!(err, ProxyError::UpstreamFailure("quota exceeded".to_string()));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_blank_static_key_is_absent() {
        assert_eq!(CredentialSource::Static(Some("  ".to_string())).resolve(), None);
    }

    #[test]
    fn test_env_key_is_read_on_every_resolve() {
        let name = "TANJUNG_TEST_KEY_ENV_RESOLVE";
        let source = CredentialSource::Env(name.to_string());
        assert_eq!(source.describe(), name);

        env::remove_var(name);
        assert_eq!(source.resolve(), None);

        env::set_var(name, "abc");
        assert_eq!(source.resolve(), Some("abc".to_string()));

        env::set_var(name, "   ");
        assert_eq!(source.resolve(), None);

        env::remove_var(name);
        assert_eq!(source.resolve(), None);
    }

    #[tokio::test]
    async fn test_handle_names_unset_env_var() {
        let name = "TANJUNG_TEST_KEY_ENV_UNSET";
        env::remove_var(name);
        let generator = RecordingGenerator::new(Ok(gemini_text("unused")));
        let service = ProxyService::new(
            generator.clone(),
            Arc::new(GeminiTextExtractor),
            CredentialSource::Env(name.to_string()),
            GenerationConfig::default(),
        );

        let err = service.handle(json!({"prompt": "hai"})).await.unwrap_err();
        assert!(matches!(err, ProxyError::MissingCredential(_)));
        assert!(err.to_string().contains(name));
        assert!(generator.seen.lock().unwrap().is_empty());
    }
}
