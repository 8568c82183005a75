#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod shutdown;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vaultflow_runtime::RuntimeService;
use vaultflow_runtime::action::{ActionRegistry, HttpRequestAction};
use vaultflow_server::{AppState, routes};

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "vaultflow_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "vaultflow_cli::shutdown";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();
    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        "starting vaultflow server"
    );

    let service = create_service();
    let router = routes(AppState::new(Arc::clone(&service)));

    let addr = cli.server.server_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        addr = %addr,
        "server is ready and listening for connections"
    );
    if cli.server.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_STARTUP,
            "server is bound to all interfaces, ensure firewall rules are configured"
        );
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown::shutdown_signal())
        .await
        .context("server encountered an error")?;

    // Let in-flight workflow runs finish before exiting.
    let drained = tokio::time::timeout(cli.server.shutdown_timeout(), service.shutdown()).await;
    if drained.is_err() {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            timeout_secs = cli.server.shutdown_timeout,
            "shutdown timeout elapsed with workflow runs still in flight"
        );
    }

    tracing::info!(target: TRACING_TARGET_SHUTDOWN, "server shut down gracefully");
    Ok(())
}

/// Builds the runtime service with the built-in action catalogue.
fn create_service() -> Arc<RuntimeService> {
    let mut registry = ActionRegistry::new();
    registry.register(Arc::new(HttpRequestAction::new()));
    Arc::new(RuntimeService::new(Arc::new(registry)))
}

/// Initializes tracing with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
