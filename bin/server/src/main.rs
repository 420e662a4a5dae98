//! Authentication gateway server.
//!
//! Fronts a web application with one of three authentication strategies
//! chosen at startup: federated OAuth2, directory bind, or none. See the
//! strategy crates for the flows themselves; this binary wires them to HTTP.

mod config;
mod forms;
mod gateway;
mod routes;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::gateway::Gateway;
use crate::routes::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Select the authentication strategy; a bad method name is fatal here
    // rather than surfacing per request.
    let gateway = Gateway::from_config(&config).expect("failed to construct the gateway");
    tracing::info!(
        method = gateway.method_display_name(),
        "Authentication gateway ready"
    );

    let state = Arc::new(AppState {
        gateway,
        session: config.session.clone(),
    });

    let app = Router::new()
        .route("/health", get(routes::health))
        .fallback(routes::gate)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("shutting down");
}
