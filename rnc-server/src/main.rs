//! rnc-server - Non-conformity (RNC) register
//!
//! Serves the register UI and HTTP API: records with their open/close/reopen
//! lifecycle, photo evidence, PDF reports, CSV backup and e-mail notices.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rnc_common::config::{AppConfig, CliOverrides};
use rnc_common::db::init_database;
use rnc_server::{build_router, AppState};
use tracing::{error, info, warn};
use tracing_subscriber::{prelude::*, reload, EnvFilter};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "rnc-server", version, about = "Non-conformity register service")]
struct Cli {
    /// Data folder holding the database and logo
    #[arg(long, value_name = "DIR")]
    root_folder: Option<PathBuf>,

    /// Config file (default: ~/.config/rnc/config.toml or /etc/rnc/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:5780
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise start at info and apply [logging] level once
    // the config file has been read
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting RNC register (rnc-server) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let overrides = CliOverrides {
        root_folder: cli.root_folder,
        config_file: cli.config,
        bind_address: cli.bind,
    };
    let config = AppConfig::load(&overrides).context("Failed to load configuration")?;

    if !rust_log_set {
        filter_handle
            .reload(EnvFilter::new(&config.log_level))
            .context("Failed to apply configured log level")?;
    }

    config.ensure_root_folder()?;
    info!("Data folder: {}", config.root_folder.display());

    let db_path = config.database_path();
    let pool = match init_database(&db_path).await {
        Ok(pool) => {
            info!("✓ Database ready: {}", db_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to open database {}: {}", db_path.display(), e);
            return Err(e.into());
        }
    };

    if config.access_password.is_none() {
        warn!("No access password configured: the register is read-only");
    }

    let bind_address = config.bind_address.clone();
    let state = AppState::new(pool, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("rnc-server listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
