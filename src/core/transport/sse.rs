//! SSE transport implementation.
//!
//! `GET` on the stream path opens a session and an event stream whose first
//! event (`endpoint`) tells the client where to POST its messages. Every
//! response is then delivered on that stream as a `message` event. Dropping
//! the stream closes the session.

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use super::config::SseConfig;
use super::http::{
    KEEP_ALIVE_INTERVAL, finish_router, message_event, reject, serve, with_common_routes,
};
use super::{Transport, TransportResult};
use crate::core::McpServer;
use crate::core::protocol::{JsonRpcResponse, parse_message};
use crate::core::session::{Session, SessionMap, TransportKind};

/// Responses buffered per stream before POST handlers wait.
const STREAM_CAPACITY: usize = 64;

/// SSE transport handler.
pub struct SseTransport {
    config: SseConfig,
}

/// A live stream: the session and the sender feeding its event stream.
#[derive(Clone)]
struct SseChannel {
    session: Arc<Session>,
    tx: mpsc::Sender<JsonRpcResponse>,
}

/// Application state shared across SSE handlers.
#[derive(Clone)]
struct SseState {
    server: McpServer,
    sessions: SessionMap<SseChannel>,
    message_path: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

impl SseTransport {
    /// Create a new SSE transport with the given config.
    pub fn new(config: SseConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Build the router serving this transport.
    pub fn router(&self, server: McpServer) -> Router {
        let state = SseState {
            server,
            sessions: SessionMap::new(),
            message_path: Arc::from(self.config.message_path.as_str()),
        };

        let router = Router::new()
            .route(&self.config.sse_path, get(open_stream))
            .route(&self.config.message_path, post(post_message));

        finish_router(
            with_common_routes(router, "sse").with_state(state),
            self.config.enable_cors,
        )
    }
}

#[async_trait]
impl Transport for SseTransport {
    fn description(&self) -> String {
        format!(
            "SSE on {} (stream {}, messages {})",
            self.address(),
            self.config.sse_path,
            self.config.message_path
        )
    }

    async fn run(self: Box<Self>, server: McpServer) -> TransportResult<()> {
        let router = self.router(server);
        info!("  → Stream:   GET {}", self.config.sse_path);
        info!("  → Messages: POST {}?session_id=<id>", self.config.message_path);
        serve(&self.address(), router).await
    }
}

/// Removes and closes the session once its event stream is dropped.
struct StreamGuard {
    sessions: SessionMap<SseChannel>,
    session: Arc<Session>,
}

impl StreamGuard {
    fn frame(&self, response: &JsonRpcResponse) -> Event {
        debug!("Session {}: streaming response {}", self.session.id(), response.id);
        message_event(response)
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.sessions.remove(self.session.id());
        self.session.close();
        info!("SSE stream for session {} closed", self.session.id());
    }
}

async fn open_stream(
    State(state): State<SseState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session = state.server.open_session(TransportKind::Sse);
    let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
    state.sessions.insert(
        session.id(),
        SseChannel {
            session: Arc::clone(&session),
            tx,
        },
    );
    info!("SSE stream opened for session {}", session.id());

    let endpoint = format!("{}?session_id={}", state.message_path, session.id());
    let guard = StreamGuard {
        sessions: state.sessions.clone(),
        session,
    };

    let endpoint = tokio_stream::once(Ok::<_, Infallible>(
        Event::default().event("endpoint").data(endpoint),
    ));
    let messages =
        ReceiverStream::new(rx).map(move |response| Ok::<_, Infallible>(guard.frame(&response)));

    Sse::new(endpoint.chain(messages)).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

#[instrument(skip_all)]
async fn post_message(
    State(state): State<SseState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return reject(StatusCode::BAD_REQUEST, "session_id is required");
    };
    let Some(channel) = state.sessions.get(&session_id) else {
        warn!("Message for unknown session {}", session_id);
        return reject(StatusCode::NOT_FOUND, "Could not find session");
    };
    let message = match parse_message(&body) {
        Ok(message) => message,
        Err(_) => {
            warn!("Rejecting unparsable message");
            return reject(StatusCode::BAD_REQUEST, "Could not parse message");
        }
    };

    if message.is_tool_call() {
        tokio::spawn(async move {
            if let Some(response) = channel.session.handle(message).await {
                let _ = channel.tx.send(response).await;
            }
        });
    } else if let Some(response) = channel.session.handle(message).await {
        if channel.tx.send(response).await.is_err() {
            debug!("Stream went away before the response was delivered");
        }
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
