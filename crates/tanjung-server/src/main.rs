//! Tanjung proxy server binary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use tanjung_core::config::{ConfigLoader, TanjungConfig};
use tanjung_core::proxy::ProxyService;
use tanjung_server::{shutdown_signal, ProxyServer, ServerConfig};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Tanjung Server - Gemini proxy for the Tanjung AI chat")]
struct Cli {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(long, short, default_value = "tanjung.yaml", help = "Configuration file; defaults are used when it does not exist")]
    config: String,

    #[clap(long, help = "Bind address, overrides server.bind_addr")]
    bind: Option<String>,

    #[clap(long, short, default_value = "info")]
    log_level: String,

    #[clap(long, value_delimiter = ',', help = "Comma separated CORS origins, overrides server.cors_origins")]
    cors_origins: Option<Vec<String>>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the proxy server (default command)
    Run,
    /// Print the effective configuration and exit
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = cli.log_level.parse().unwrap_or(LevelFilter::Info);
    env_logger::Builder::new()
        .filter_level(log_level_filter)
        .parse_default_env()
        .init();

    let config = load_config(&cli).await?;

    match cli.command {
        Some(Commands::ShowConfig) => {
            print!("{}", serde_yaml::to_string(&config)?);
            Ok(())
        }
        Some(Commands::Run) | None => run_server(config).await,
    }
}

async fn load_config(cli: &Cli) -> Result<TanjungConfig> {
    log::info!("Loading configuration from: {}", cli.config);
    let mut config = ConfigLoader::from_file_or_default(&cli.config).await?;

    if let Some(bind) = &cli.bind {
        config.server.bind_addr = bind.clone();
    }
    if let Some(origins) = &cli.cors_origins {
        config.server.cors_origins = Some(origins.clone());
    }
    Ok(config)
}

async fn run_server(config: TanjungConfig) -> Result<()> {
    let server_config = ServerConfig::from_section(&config.server)?;

    if std::env::var(&config.provider.api_key_env)
        .map(|key| key.trim().is_empty())
        .unwrap_or(true)
    {
        log::warn!(
            "{} is not set; generate requests will fail until it is",
            config.provider.api_key_env
        );
    }

    log::info!(
        "Using model {} via {}",
        config.generation.model,
        config.provider.base_url
    );

    let server = ProxyServer::with_config(ProxyService::from_config(&config), server_config);

    if let Err(e) = server.serve_with_shutdown(shutdown_signal()).await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
