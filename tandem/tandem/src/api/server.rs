//! HTTP server for the Tandem API

use anyhow::{Context, Result};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tandem_agent::HybridAgent;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info, warn};

use super::{middleware as api_middleware, routes};

/// Build the full application router, with every route under `/api`.
pub fn build_router(agent: Arc<HybridAgent>, permissive_cors: bool) -> Router {
    let state = routes::AppState { agent };

    let mut api_routes = routes::create_routes(state)
        .layer(middleware::from_fn(api_middleware::logging))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        );

    if permissive_cors {
        // The UI is served from a file:// page or another local port
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .max_age(Duration::from_secs(3600));
        api_routes = api_routes.layer(cors);
    }

    Router::new()
        .nest("/api", api_routes)
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "Not found") })
}

/// Run the API server until Ctrl+C or SIGTERM.
pub async fn start_server(
    agent: Arc<HybridAgent>,
    host: &str,
    port: u16,
    permissive_cors: bool,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    if !addr.ip().is_loopback() {
        warn!("Binding to non-loopback address {}; the API has no authentication", addr);
    }

    let app = build_router(agent, permissive_cors);

    info!("Tandem API server starting...");
    info!("  Listening: http://{}", addr);
    info!("  API:       http://{}/api/", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Tandem API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT signal (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}
