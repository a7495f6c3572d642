//! Streamable HTTP transport implementation.
//!
//! A single endpoint carries the whole protocol. `POST` delivers one
//! JSON-RPC message, `DELETE` ends the session. Sessions are identified by
//! the `Mcp-Session-Id` header handed out with the `initialize` response.
//! Requests are answered either as `application/json` or as a one-message
//! event stream, depending on the client's `Accept` header. Sessions that
//! see no request for `session_ttl_secs` are evicted.

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{KeepAlive, Sse},
    },
    routing::post,
};
use serde_json::Value;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::StreamExt;
use tracing::{debug, info, instrument, warn};

use super::config::StreamableHttpConfig;
use super::http::{KEEP_ALIVE_INTERVAL, finish_router, message_event, serve, with_common_routes};
use super::{Transport, TransportResult};
use crate::core::McpServer;
use crate::core::protocol::{IncomingMessage, JsonRpcResponse, parse_message};
use crate::core::session::{Session, SessionMap, TransportKind};

/// Header carrying the session id in both directions.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Upper bound on the time between idle-session sweeps.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Streamable HTTP transport handler.
pub struct StreamableHttpTransport {
    config: StreamableHttpConfig,
}

/// Application state shared across handlers.
#[derive(Clone)]
struct HttpState {
    server: McpServer,
    sessions: SessionMap<Arc<HttpSession>>,
    json_response: bool,
}

/// A session plus the time it last received a request.
struct HttpSession {
    session: Arc<Session>,
    last_seen: Mutex<Instant>,
}

impl HttpSession {
    fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            last_seen: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|e| e.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().unwrap_or_else(|e| e.into_inner()).elapsed()
    }
}

impl StreamableHttpTransport {
    /// Create a new streamable HTTP transport with the given config.
    pub fn new(config: StreamableHttpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router serving this transport.
    ///
    /// Must be called inside a Tokio runtime when a session TTL is set, since
    /// the idle-session sweeper is spawned here.
    pub fn router(&self, server: McpServer) -> Router {
        let state = HttpState {
            server,
            sessions: SessionMap::new(),
            json_response: self.config.json_response,
        };
        if let Some(ttl) = self.config.session_ttl() {
            tokio::spawn(evict_idle_sessions(state.sessions.clone(), ttl));
        }

        let router = Router::new().route(
            &self.config.path,
            post(handle_post).delete(handle_delete).get(handle_get),
        );

        finish_router(
            with_common_routes(router, "streamable-http").with_state(state),
            self.config.enable_cors,
        )
    }
}

#[async_trait]
impl Transport for StreamableHttpTransport {
    fn description(&self) -> String {
        format!("Streamable HTTP on {}{}", self.address(), self.config.path)
    }

    async fn run(self: Box<Self>, server: McpServer) -> TransportResult<()> {
        let router = self.router(server);
        let mode = if self.config.json_response {
            "JSON responses"
        } else {
            "JSON or event-stream responses"
        };
        info!("  → MCP:      POST/DELETE {} ({})", self.config.path, mode);
        serve(&self.address(), router).await
    }
}

/// Periodically close sessions idle for longer than `ttl`.
async fn evict_idle_sessions(sessions: SessionMap<Arc<HttpSession>>, ttl: Duration) {
    let period = ttl.min(MAX_SWEEP_INTERVAL);
    let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticks.tick().await;
        for expired in sessions.remove_where(|entry| entry.idle_for() > ttl) {
            info!("Evicting idle session {}", expired.session.id());
            expired.session.close();
        }
    }
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("text/event-stream"))
}

/// A JSON-RPC error carried in an HTTP error status.
fn rpc_reject(status: StatusCode, response: JsonRpcResponse) -> Response {
    (status, Json(response)).into_response()
}

#[instrument(skip_all)]
async fn handle_post(State(state): State<HttpState>, headers: HeaderMap, body: String) -> Response {
    let message = match parse_message(&body) {
        Ok(message) => message,
        Err(response) => {
            warn!("Rejecting unparsable message");
            return rpc_reject(StatusCode::BAD_REQUEST, response);
        }
    };

    let session = match session_id(&headers) {
        Some(id) => match state.sessions.get(id) {
            Some(entry) => {
                entry.touch();
                Arc::clone(&entry.session)
            }
            None => {
                warn!("Message for unknown session {}", id);
                return rpc_reject(
                    StatusCode::NOT_FOUND,
                    JsonRpcResponse::invalid_request(Value::Null, "Session not found"),
                );
            }
        },
        None if message.is_initialize() => {
            let session = state.server.open_session(TransportKind::StreamableHttp);
            let entry = HttpSession::new(Arc::clone(&session));
            state.sessions.insert(session.id(), Arc::new(entry));
            info!("Created streamable HTTP session {}", session.id());
            session
        }
        None => {
            return rpc_reject(
                StatusCode::BAD_REQUEST,
                JsonRpcResponse::invalid_request(Value::Null, "Bad Request: Missing session ID"),
            );
        }
    };

    if !message.is_request() {
        session.handle(message).await;
        return (StatusCode::ACCEPTED, [(SESSION_HEADER, session.id().to_string())]).into_response();
    }

    if !state.json_response && accepts_event_stream(&headers) {
        stream_response(session, message)
    } else {
        json_response(session, message).await
    }
}

async fn json_response(session: Arc<Session>, message: IncomingMessage) -> Response {
    let session_header = [(SESSION_HEADER, session.id().to_string())];
    match session.handle(message).await {
        Some(response) => (StatusCode::OK, session_header, Json(response)).into_response(),
        None => {
            debug!("Request produced no response (cancelled)");
            (StatusCode::ACCEPTED, session_header).into_response()
        }
    }
}

fn stream_response(session: Arc<Session>, message: IncomingMessage) -> Response {
    let session_header = [(SESSION_HEADER, session.id().to_string())];
    let events = futures::stream::once(async move { session.handle(message).await })
        .filter_map(|response| response.map(|r| Ok::<_, Infallible>(message_event(&r))));

    (
        StatusCode::OK,
        session_header,
        Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)),
    )
        .into_response()
}

#[instrument(skip_all)]
async fn handle_delete(State(state): State<HttpState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return (StatusCode::BAD_REQUEST, "Bad Request: Missing session ID").into_response();
    };
    match state.sessions.remove(id) {
        Some(entry) => {
            entry.session.close();
            StatusCode::OK.into_response()
        }
        None => (StatusCode::NOT_FOUND, "Session not found").into_response(),
    }
}

async fn handle_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, DELETE")],
        "Server-initiated streams are not supported",
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::json;
    use tower::ServiceExt;

    fn app_with(json_response: bool) -> Router {
        let config = StreamableHttpConfig {
            json_response,
            ..Default::default()
        };
        StreamableHttpTransport::new(config).router(McpServer::new(Config::default()))
    }

    async fn ping(app: &Router, session: &str) -> StatusCode {
        let ping = json!({"jsonrpc": "2.0", "id": 9, "method": "ping"});
        app.clone()
            .oneshot(post(ping, Some(session), "application/json"))
            .await
            .unwrap()
            .status()
    }

    fn post(body: Value, session: Option<&str>, accept: &str) -> Request<Body> {
        let mut builder = Request::post("/mcp")
            .header("content-type", "application/json")
            .header("accept", accept);
        if let Some(id) = session {
            builder = builder.header(SESSION_HEADER, id);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn initialize(app: &Router) -> String {
        let init = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
        let response = app
            .clone()
            .oneshot(post(init, None, "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[SESSION_HEADER].to_str().unwrap().to_string();

        let body = json_body(response).await;
        assert_eq!(body["id"], json!(1));
        assert!(body["result"]["serverInfo"]["name"].is_string());
        id
    }

    #[tokio::test]
    async fn test_initialize_assigns_session() {
        let app = app_with(false);
        let first = initialize(&app).await;
        let second = initialize(&app).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_call_as_json() {
        let app = app_with(false);
        let session = initialize(&app).await;

        let call = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
                          "params": {"name": "sum", "arguments": {"a": 1, "b": 2}}});
        let response = app
            .clone()
            .oneshot(post(call, Some(&session), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["result"]["structuredContent"]["result"], json!(3));
    }

    #[tokio::test]
    async fn test_call_as_event_stream() {
        let app = app_with(false);
        let session = initialize(&app).await;

        let call = json!({"jsonrpc": "2.0", "id": 7, "method": "tools/call",
                          "params": {"name": "sum", "arguments": {"a": 5, "b": 6}}});
        let response = app
            .clone()
            .oneshot(post(call, Some(&session), "application/json, text/event-stream"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("event: message"));
        let data = text
            .lines()
            .find_map(|line| line.strip_prefix("data:"))
            .unwrap();
        let body: Value = serde_json::from_str(data.trim()).unwrap();
        assert_eq!(body["id"], json!(7));
        assert_eq!(body["result"]["structuredContent"]["result"], json!(11));
    }

    #[tokio::test]
    async fn test_json_response_forced() {
        let app = app_with(true);
        let session = initialize(&app).await;

        let ping = json!({"jsonrpc": "2.0", "id": 3, "method": "ping"});
        let response = app
            .clone()
            .oneshot(post(ping, Some(&session), "application/json, text/event-stream"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_session_header_required() {
        let app = app_with(false);
        let list = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});

        let response = app
            .clone()
            .oneshot(post(list.clone(), None, "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .clone()
            .oneshot(post(list, Some("nope"), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notification_accepted() {
        let app = app_with(false);
        let session = initialize(&app).await;

        let note = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
        let response = app
            .clone()
            .oneshot(post(note, Some(&session), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let app = app_with(false);
        let request = Request::post("/mcp").body(Body::from("{nope")).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], json!(-32700));
    }

    #[tokio::test]
    async fn test_delete_terminates_session() {
        let app = app_with(false);
        let session = initialize(&app).await;

        let delete = |id: &str| {
            Request::delete("/mcp")
                .header(SESSION_HEADER, id)
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete(&session)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let ping = json!({"jsonrpc": "2.0", "id": 3, "method": "ping"});
        let response = app
            .clone()
            .oneshot(post(ping, Some(&session), "application/json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.clone().oneshot(delete(&session)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let config = StreamableHttpConfig {
            session_ttl_secs: 60,
            ..Default::default()
        };
        let app = StreamableHttpTransport::new(config).router(McpServer::new(Config::default()));
        let idle = initialize(&app).await;
        let active = initialize(&app).await;

        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(ping(&app, &active).await, StatusCode::OK);

        tokio::time::sleep(Duration::from_secs(50)).await;
        assert_eq!(ping(&app, &active).await, StatusCode::OK);
        assert_eq!(ping(&app, &idle).await, StatusCode::NOT_FOUND);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_keeps_sessions() {
        let config = StreamableHttpConfig {
            session_ttl_secs: 0,
            ..Default::default()
        };
        let app = StreamableHttpTransport::new(config).router(McpServer::new(Config::default()));
        let session = initialize(&app).await;

        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        assert_eq!(ping(&app, &session).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_get_not_allowed() {
        let app = app_with(false);
        let response = app
            .oneshot(Request::get("/mcp").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
