//! OTel Demo API Server
//!
//! This crate provides the HTTP server for the OpenTelemetry demo service.
//! It emits traces, metrics and logs over OTLP and proxies range queries to a
//! Prometheus-compatible metrics store.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - `/health` and `/weatherforecast`
//! - `/telemetry/test/*` synthetic signal generators
//! - `/metrics/*` read-through queries against the metrics store
//!
//! Telemetry is initialized once by the binary (see [`init_telemetry`]) and
//! handed to the router through [`AppState`].
//!
//! # Example
//!
//! ```no_run
//! use api::{init_telemetry, run_server_with_config, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let telemetry = init_telemetry(&config)?;
//!     run_server_with_config(config, telemetry.instrumentation()).await?;
//!     telemetry.shutdown()
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
mod request_metrics;
mod routes;
mod state;
mod telemetry;

pub use config::{Config, ConfigError, LogFormat, MetricsStoreConfig, OtlpProtocol, TelemetryConfig};
pub use state::AppState;
pub use telemetry::{build_providers, init_telemetry, resource, Providers, TelemetryHandle};

use anyhow::Result;
use axum::middleware;
use axum::Router;
use shared::instrumentation::Instrumentation;
use shared::metrics_proxy::MetricsClient;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Runs the API server with telemetry configured from the environment.
///
/// Loads `.env` if present, initializes telemetry, serves until SIGTERM/SIGINT
/// and flushes telemetry on the way out.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - Telemetry cannot be initialized
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    let telemetry = init_telemetry(&config)?;

    let served = run_server_with_config(config, telemetry.instrumentation()).await;
    let flushed = telemetry.shutdown();

    served.and(flushed)
}

/// Runs the API server with the provided configuration and instrumentation.
///
/// This is useful for testing or when you want to provide configuration programmatically.
///
/// # Errors
///
/// Returns an error if:
/// - The metrics store client cannot be built
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server_with_config(
    config: Config,
    instrumentation: Arc<Instrumentation>,
) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        metrics_store = %config.metrics_store.endpoint,
        "OTel demo API server starting"
    );

    let metrics_client = MetricsClient::new(
        config.metrics_store.endpoint.clone(),
        config.metrics_store.timeout,
    )?;
    let state = AppState::new(
        instrumentation,
        metrics_client,
        config.telemetry.environment.clone(),
    );

    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Creates the main application router with all routes and middleware.
///
/// Every request gets a server span from `TraceLayer` and is recorded in the
/// request duration histogram.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::weather_routes(state.clone()))
        .merge(routes::telemetry_routes(state.clone()))
        .merge(routes::metrics_routes(state.clone()))
        .layer(middleware::from_fn_with_state(
            state,
            request_metrics::record_request_duration,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
///
/// If a handler cannot be installed, only the other signal is awaited.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
