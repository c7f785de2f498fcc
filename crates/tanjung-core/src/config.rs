//! Configuration types and the YAML loader
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup that talks to the public Gemini endpoint.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Parameters sent to the provider with every prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            max_output_tokens: 1024,
            top_p: 0.8,
            top_k: 40,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind_addr: String,
    pub enable_cors: bool,
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            enable_cors: true,
            cors_origins: None,
            // Inline images travel base64 encoded in the body.
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TanjungConfig {
    pub server: ServerSection,
    pub provider: ProviderConfig,
    pub generation: GenerationConfig,
}

impl TanjungConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Invalid("generation.model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid(format!(
                "generation.temperature must be within 0.0..=2.0, got {}",
                self.generation.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(ConfigError::Invalid(format!(
                "generation.top_p must be within 0.0..=1.0, got {}",
                self.generation.top_p
            )));
        }
        if self.provider.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.api_key_env must not be empty".to_string()));
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<TanjungConfig, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str(&content)
    }

    /// Load from a file when it exists, otherwise use defaults.
    pub async fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<TanjungConfig, ConfigError> {
        let path = path.as_ref();
        if fs::try_exists(path).await.unwrap_or(false) {
            Self::from_file(path).await
        } else {
            log::info!("No config file at {}, using defaults", path.display());
            Ok(TanjungConfig::default())
        }
    }

    pub fn from_str(content: &str) -> Result<TanjungConfig, ConfigError> {
        let config: TanjungConfig = if content.trim().is_empty() {
            TanjungConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_defaults() {
        let config = GenerationConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_output_tokens, 1024);
        assert_eq!(config.top_p, 0.8);
        assert_eq!(config.top_k, 40);
    }

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = ConfigLoader::from_str("").unwrap();
        assert_eq!(config, TanjungConfig::default());
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
server:
  bind_addr: "0.0.0.0:8080"
generation:
  model: gemini-2.0-flash
  temperature: 0.7
"#;
        let config = ConfigLoader::from_str(yaml).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert!(config.server.enable_cors);
        assert_eq!(config.generation.model, "gemini-2.0-flash");
        assert_eq!(config.generation.temperature, 0.7);
        assert_eq!(config.generation.top_k, 40);
        assert_eq!(config.provider.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_invalid_temperature_rejected() {
        let yaml = "generation:\n  temperature: 5.0\n";
        let err = ConfigLoader::from_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = ConfigLoader::from_str("server: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::from_file_or_default(dir.path().join("tanjung.yaml"))
            .await
            .unwrap();
        assert_eq!(config, TanjungConfig::default());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tanjung.yaml");
        std::fs::write(&path, "provider:\n  api_key_env: MY_KEY\n").unwrap();
        let config = ConfigLoader::from_file(&path).await.unwrap();
        assert_eq!(config.provider.api_key_env, "MY_KEY");
    }
}
