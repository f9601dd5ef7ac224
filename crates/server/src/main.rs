//! Service broker binary.

use anyhow::{Context, Result};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use porter_core::config::AppConfig;
use porter_server::{AppState, Broker, BrokerCredentials, create_router};
use porter_vault::VaultClient;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Porter - a vault service broker
#[derive(Parser, Debug)]
#[command(name = "porterd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "PORTER_CONFIG",
        default_value = "config/broker.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Porter v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (the file is optional, env vars can provide or
    // override everything).
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    if config_path.exists() {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("PORTER_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    // Connect to the vault.
    let vault_address = config.vault.normalized_address();
    let advertise_address = config.vault.normalized_advertise_address();
    let vault = VaultClient::new(&vault_address, &config.vault.token)
        .context("failed to create vault client")?;
    tracing::info!(address = %vault_address, "Vault client initialized");

    // Start the broker: recover persisted tenants and begin renewals.
    let broker = Arc::new(Broker::new(
        vault,
        config.service.clone(),
        advertise_address,
        config.vault.renew_token,
        None,
    ));
    broker.start().await.context("failed to start broker")?;

    let credentials =
        BrokerCredentials::new(&config.security.username, &config.security.password);
    let state = AppState::new(broker.clone(), credentials);
    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the renewers before exiting.
    broker.stop().await;

    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
