use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

pub async fn request_logger(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(%method, %uri, status, duration_ms, "request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %uri, status, duration_ms, "request rejected");
    } else {
        tracing::info!(%method, %uri, status, duration_ms, "request completed");
    }

    response
}
