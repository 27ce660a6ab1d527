// Copyright 2026 The Thinkrelay Project
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use thinkrelay::config::{self, Config};
use thinkrelay::models::CommandModelLister;
use thinkrelay::proxy::{self, AppState};
use thinkrelay::registry::RequestRegistry;
use thinkrelay::relay::Relay;
use thinkrelay::thinking::ThinkingClassifier;
use thinkrelay::upstream::OllamaBackend;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "thinkrelay",
    about = "Streaming relay that separates reasoning from answers"
)]
struct Cli {
    /// Path to the thinkrelay.yaml config file (built-in defaults when absent)
    #[arg(long, env = "THINKRELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1", env = "THINKRELAY_HOST")]
    host: std::net::IpAddr,

    /// Port to listen on
    #[arg(long, default_value_t = 3001, env = "PORT")]
    port: u16,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .json()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let addr = SocketAddr::new(cli.host, cli.port);
    tracing::info!(%addr, "thinkrelay starting");

    let config = match &cli.config {
        Some(path) => {
            let source = config::FileSource { path: path.clone() };
            match config::load_config(&source) {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("failed to load config: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => Config::default(),
    };

    tracing::info!(
        base_url = %config.upstream.base_url,
        default_model = %config.upstream.default_model,
        idle_timeout_ms = config.upstream.idle_timeout.map(|d| d.as_millis() as u64),
        "config loaded"
    );

    let backend = Arc::new(OllamaBackend::new(
        reqwest::Client::new(),
        config.upstream.base_url.clone(),
    ));
    let registry = Arc::new(RequestRegistry::new());
    let relay = Relay::new(backend, registry.clone())
        .with_classifier(ThinkingClassifier::new(config.markers.clone()))
        .with_template(config.prompt.clone())
        .with_default_model(config.upstream.default_model.clone())
        .with_idle_timeout(config.upstream.idle_timeout);
    let models = Arc::new(CommandModelLister::new(config.models.command.clone()));

    let app = proxy::build_router(AppState::new(relay, models));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(%addr, "failed to bind: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(%addr, "thinkrelay listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("server error: {e}");
    }

    let summary = registry.drain();
    tracing::info!(
        cancelled = summary.cancelled,
        failed = summary.failed,
        "thinkrelay stopped"
    );
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
