//! API middleware

use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info};

/// Request logging middleware
pub async fn logging(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();

    debug!("Request: {} {}", method, uri);

    let response = next.run(req).await;

    info!(
        "{} {} -> {} ({}ms)",
        method,
        uri,
        response.status(),
        started.elapsed().as_millis()
    );

    Ok(response)
}
