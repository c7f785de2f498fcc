//! Error types for the proxy, the chat client and local persistence
//!
//! Server-side failures are grouped by who can fix them: the user (bad input),
//! the operator (missing credential) or nobody in particular (the upstream
//! service failed). Client-side failures never escape the chat loop; they are
//! turned into chat messages by the controller.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProxyError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    MissingCredential(String),
    #[error("{0}")]
    UpstreamFailure(String),
}

impl ProxyError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn missing_credential(msg: impl Into<String>) -> Self {
        Self::MissingCredential(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::UpstreamFailure(msg.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::InvalidInput(_) => 400,
            ProxyError::MissingCredential(_) | ProxyError::UpstreamFailure(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ProxyError::InvalidInput(_) => "invalid_input",
            ProxyError::MissingCredential(_) => "missing_credential",
            ProxyError::UpstreamFailure(_) => "upstream_failure",
        }
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        ProxyError::UpstreamFailure(err.to_string())
    }
}

/// The provider answered, but not in a shape we can read text from.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("response has no candidates")]
    NoCandidates,
    #[error("first candidate has no text parts")]
    NoText,
    #[error("response was blocked: {0}")]
    Blocked(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No data directory available on this platform")]
    NoDataDir,
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request to proxy failed: {0}")]
    Network(String),
    #[error("proxy answered with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode proxy response: {0}")]
    Decode(String),
    #[error("could not read attachment: {0}")]
    Attachment(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
