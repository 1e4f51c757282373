use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grantbloom::{
    cli::{execute_command, Cli},
    config::{Config, LogFormat},
    gemini::{AiGateway, GeminiClient},
    storage::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore},
    Workspace,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "GrantBloom starting");

    // Initialize storage
    let store: Arc<dyn SnapshotStore> = if cli.ephemeral {
        info!("Ephemeral mode, workspace kept in memory");
        Arc::new(MemorySnapshotStore::new())
    } else {
        match SqliteSnapshotStore::new(&config.storage).await {
            Ok(s) => {
                info!(path = %config.storage.path.display(), "Database initialized");
                Arc::new(s)
            }
            Err(e) => {
                error!(error = %e, "Failed to initialize database");
                return Err(e.into());
            }
        }
    };

    // Initialize Gemini client
    let client = match GeminiClient::new(&config.gemini, &config.request) {
        Ok(c) => {
            info!(base_url = %c.base_url(), model = %c.model(), "Gemini client initialized");
            c
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Gemini client");
            return Err(e.into());
        }
    };
    if !client.has_credentials() {
        warn!("GEMINI_API_KEY is not set; AI features will fail");
    }

    let workspace = Workspace::open(store, AiGateway::new(Arc::new(client))).await;

    let result = execute_command(cli.command, &workspace).await;
    if result.exit_code == 0 {
        println!("{}", result.message);
    } else {
        eprintln!("{}", result.message);
    }
    std::process::exit(result.exit_code);
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
