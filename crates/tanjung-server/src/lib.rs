//! HTTP front for the Gemini proxy.
//!
//! Exposes `POST /api/generate` (prompt plus optional inline images in, plain
//! text out) and `GET /health`. The provider credential never leaves the
//! server process.

pub mod error;

pub use error::{Result, ServerError};

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tanjung_core::config::ServerSection;
use tanjung_core::errors::ProxyError;
use tanjung_core::proxy::{GenerateResponse, ProxyService};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub enable_cors: bool,
    /// CORS allowed origins (if None, allows any origin)
    pub cors_origins: Option<Vec<String>>,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let section = ServerSection::default();
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            enable_cors: section.enable_cors,
            cors_origins: section.cors_origins,
            max_body_size: section.max_body_size,
        }
    }
}

impl ServerConfig {
    /// Server settings from the `server` section of the configuration file.
    pub fn from_section(section: &ServerSection) -> Result<Self> {
        let config = Self {
            enable_cors: section.enable_cors,
            cors_origins: section.cors_origins.clone(),
            max_body_size: section.max_body_size,
            ..Self::default()
        };
        config.with_bind_addr_str(&section.bind_addr)
    }

    /// Parse and set the bind address from a string.
    pub fn with_bind_addr_str(mut self, addr: &str) -> Result<Self> {
        self.bind_addr = addr
            .parse()
            .map_err(|e| ServerError::config_error(format!("Invalid bind address '{}': {}", addr, e)))?;
        Ok(self)
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProxyService>,
}

/// Handler for the /api/generate POST endpoint.
///
/// The body is parsed by hand so a malformed or oversized payload gets the
/// same `{error}` shape as every other failure.
async fn generate_handler(
    State(state): State<AppState>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> std::result::Result<Json<GenerateResponse>, ServerError> {
    let body = body.map_err(|rejection| {
        log::warn!("Generate request body rejected: {}", rejection.body_text());
        ServerError::from(rejection)
    })?;

    let result = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => state.service.handle(value).await,
        Err(e) => Err(ProxyError::invalid_input(format!("Request tidak valid: {}", e))),
    };

    match result {
        Ok(response) => {
            log::debug!("Generated {} character(s)", response.output.chars().count());
            Ok(Json(response))
        }
        Err(e) => {
            log::error!("Generate request failed ({}): {}", e.error_type(), e);
            Err(ServerError::from(e))
        }
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub struct ProxyServer {
    service: Arc<ProxyService>,
    config: ServerConfig,
}

impl ProxyServer {
    pub fn with_config(service: ProxyService, config: ServerConfig) -> Self {
        Self {
            service: Arc::new(service),
            config,
        }
    }

    /// Build the Axum router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/api/generate", post(generate_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(state);

        router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            let cors_layer = match &self.config.cors_origins {
                Some(origins) => {
                    let parsed: std::result::Result<Vec<_>, _> =
                        origins.iter().map(|s| s.parse()).collect();
                    match parsed {
                        Ok(origins) => CorsLayer::new()
                            .allow_origin(origins)
                            .allow_methods(Any)
                            .allow_headers(Any),
                        Err(_) => {
                            log::warn!("Unparseable CORS origin in {:?}, allowing any", origins);
                            CorsLayer::permissive()
                        }
                    }
                }
                None => CorsLayer::permissive(),
            };
            router = router.layer(cors_layer);
        }

        router
    }

    /// Start the server; returns once `shutdown_signal` resolves and in-flight
    /// requests have finished.
    pub async fn serve_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|e| {
                ServerError::config_error(format!(
                    "Failed to bind to {}: {}",
                    self.config.bind_addr, e
                ))
            })?;

        log::info!("Tanjung proxy listening on {}", self.config.bind_addr);
        log::info!("Health check: http://{}/health", self.config.bind_addr);
        log::info!("Generate endpoint: http://{}/api/generate", self.config.bind_addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::internal(format!("Server error: {}", e)))?;

        log::info!("Tanjung proxy shut down gracefully");
        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            log::info!("Received SIGTERM, shutting down...");
        },
    }
}
