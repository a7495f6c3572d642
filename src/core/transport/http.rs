//! HTTP plumbing shared by the network transports.
//!
//! Both the SSE and the streamable HTTP bindings serve the same `/health`
//! and `/` endpoints, share the CORS policy and frame JSON-RPC responses as
//! `message` events.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response, sse::Event},
    routing::get,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{TransportError, TransportResult};
use crate::core::protocol::JsonRpcResponse;

/// Interval between keep-alive comments on open event streams.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Add the endpoints every network transport serves.
pub fn with_common_routes<S>(router: Router<S>, transport: &'static str) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .route("/health", get(health_check))
        .route("/", get(move || root_handler(transport)))
}

/// Apply request tracing and, when enabled, permissive CORS.
pub fn finish_router(router: Router, enable_cors: bool) -> Router {
    let router = if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers(Any),
        )
    } else {
        router
    };
    router.layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve `router` until Ctrl-C.
pub async fn serve(addr: &str, router: Router) -> TransportResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| TransportError::bind(addr, e))?;

    info!("Ready - listening on {}", addr);
    info!("  → Health:   GET /health");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TransportError::http(e.to_string()))?;

    info!("HTTP listener on {} stopped", addr);
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; serve until the process is killed.
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Frame one JSON-RPC response as an SSE `message` event.
pub fn message_event(response: &JsonRpcResponse) -> Event {
    match serde_json::to_string(response) {
        Ok(data) => Event::default().event("message").data(data),
        Err(e) => Event::default().event("error").data(e.to_string()),
    }
}

/// Plain-text error reply for requests rejected before reaching a session.
pub fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

/// Root handler - provides API info.
async fn root_handler(transport: &'static str) -> impl IntoResponse {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "transport": transport,
        "protocol": "JSON-RPC 2.0",
    }))
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_and_root() {
        let app = finish_router(with_common_routes(Router::new(), "sse"), true);

        let resp = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["status"], "healthy");
        assert!(v["timestamp"].is_string());

        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = to_bytes(resp.into_body(), 1024).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["transport"], "sse");
    }

    #[tokio::test]
    async fn test_cors_headers() {
        let app = finish_router(with_common_routes(Router::new(), "sse"), true);
        let resp = app
            .oneshot(
                Request::get("/health")
                    .header("origin", "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .map(|v| v.as_bytes()),
            Some(&b"*"[..])
        );
    }
}
