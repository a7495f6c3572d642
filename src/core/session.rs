//! Session lifecycle and the protocol state machine.
//!
//! A [`Session`] is one client's logical connection:
//! `Uninitialized --initialize--> Initialized --close--> Closed`.
//! It owns no tool state and only routes messages to the shared server.
//! Sessions are transport-agnostic; every binding feeds decoded
//! [`IncomingMessage`]s into [`Session::handle`].

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::protocol::{IncomingMessage, JsonRpcRequest, JsonRpcResponse, methods, parse_message};
use super::server::McpServer;

/// Protocol state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Closed,
}

/// Transport binding a session is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Stdio,
    Sse,
    StreamableHttp,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Stdio => "stdio",
            Self::Sse => "sse",
            Self::StreamableHttp => "streamable-http",
        })
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One client's protocol-level connection state.
pub struct Session {
    id: String,
    transport: TransportKind,
    server: McpServer,
    state: Mutex<SessionState>,
    /// Cancellation handles of running tool calls, keyed by request id.
    in_flight: Mutex<HashMap<String, CancellationToken>>,
    /// Parent of every call token; cancelled on close.
    shutdown: CancellationToken,
}

impl Session {
    /// Create a session in the `Uninitialized` state.
    pub fn new(server: McpServer, transport: TransportKind) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        debug!("Opening {} session {}", transport, id);
        Self {
            id,
            transport,
            server,
            state: Mutex::new(SessionState::Uninitialized),
            in_flight: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> TransportKind {
        self.transport
    }

    pub fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Number of tool calls currently running in this session.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Close the session and cancel its running tool calls. Idempotent.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *lock(&self.state), SessionState::Closed);
        if previous != SessionState::Closed {
            self.shutdown.cancel();
            lock(&self.in_flight).clear();
            info!("Session {} ({}) closed", self.id, self.transport);
        }
    }

    /// Decode one text frame and handle it.
    pub async fn handle_text(&self, text: &str) -> Option<JsonRpcResponse> {
        match parse_message(text) {
            Ok(message) => self.handle(message).await,
            Err(response) => {
                warn!("Session {}: rejecting malformed message", self.id);
                Some(response)
            }
        }
    }

    /// Handle one message. Returns the response to send, if any.
    ///
    /// Notifications and client responses never produce a response, and
    /// neither does a tool call that was cancelled.
    pub async fn handle(&self, message: IncomingMessage) -> Option<JsonRpcResponse> {
        match message {
            IncomingMessage::Request(request) => self.handle_request(request).await,
            IncomingMessage::Notification(notification) => {
                self.handle_notification(&notification);
                None
            }
            IncomingMessage::Response(_) => {
                debug!("Session {}: ignoring client response", self.id);
                None
            }
        }
    }

    #[instrument(skip_all, fields(session = %self.id, method = %request.method))]
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone().unwrap_or(Value::Null);
        let state = self.state();

        if state == SessionState::Closed {
            return Some(JsonRpcResponse::invalid_request(id, "Session closed"));
        }

        match (state, request.method.as_str()) {
            (_, methods::PING) => Some(JsonRpcResponse::success(id, json!({}))),
            (_, methods::INITIALIZE) => Some(self.initialize(id, request.params.as_ref())),
            (SessionState::Uninitialized, _) => {
                warn!("Request before initialization: {}", request.method);
                Some(JsonRpcResponse::invalid_request(id, "Session not initialized"))
            }
            (_, methods::TOOLS_LIST) => Some(self.list_tools(id)),
            (_, methods::TOOLS_CALL) => self.call_tool(id, request.params).await,
            (_, method) => {
                warn!("Unknown method: {}", method);
                Some(JsonRpcResponse::method_not_found(id, method))
            }
        }
    }

    fn handle_notification(&self, notification: &JsonRpcRequest) {
        if self.is_closed() {
            debug!("Session {}: dropping notification after close", self.id);
            return;
        }

        match notification.method.as_str() {
            methods::NOTIFY_INITIALIZED => {
                debug!("Session {}: client sent initialized notification", self.id);
            }
            methods::NOTIFY_CANCELLED => {
                let request_id = notification
                    .params
                    .as_ref()
                    .and_then(|p| p.get("requestId"))
                    .map(Value::to_string);
                match request_id.and_then(|key| lock(&self.in_flight).get(&key).cloned()) {
                    Some(token) => {
                        info!("Session {}: cancelling in-flight tool call", self.id);
                        token.cancel();
                    }
                    None => debug!("Session {}: cancellation for unknown request", self.id),
                }
            }
            other => debug!("Session {}: ignoring notification {}", self.id, other),
        }
    }

    fn initialize(&self, id: Value, params: Option<&Value>) -> JsonRpcResponse {
        {
            let mut state = lock(&self.state);
            if *state != SessionState::Uninitialized {
                return JsonRpcResponse::invalid_request(id, "Session already initialized");
            }
            *state = SessionState::Initialized;
        }

        let client = params
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or("unspecified");
        info!(
            "Session {} initialized by client '{}' (protocol {})",
            self.id, client, requested
        );

        match serde_json::to_value(self.server.server_info()) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::internal_error(id, e.to_string()),
        }
    }

    fn list_tools(&self, id: Value) -> JsonRpcResponse {
        let tools: Vec<_> = self
            .server
            .list_tools()
            .iter()
            .map(|schema| schema.to_tool())
            .collect();
        debug!("Listing {} tools", tools.len());
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> Option<JsonRpcResponse> {
        let params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Some(JsonRpcResponse::invalid_params(id, "Missing tool name"));
        };
        let arguments = params.get("arguments").cloned();

        let key = id.to_string();
        let token = self.shutdown.child_token();
        match lock(&self.in_flight).entry(key.clone()) {
            Entry::Occupied(_) => {
                warn!("Rejecting tools/call with in-flight id {}", key);
                return Some(JsonRpcResponse::invalid_request(
                    id,
                    "Request id is already in flight",
                ));
            }
            Entry::Vacant(slot) => {
                slot.insert(token.clone());
            }
        }
        let _in_flight = InFlightGuard {
            in_flight: &self.in_flight,
            key: &key,
        };

        let outcome = self
            .server
            .dispatcher()
            .invoke_with_cancel(name, arguments, token.clone())
            .await;

        if token.is_cancelled() {
            debug!("Suppressing response of cancelled call {}", key);
            return None;
        }

        match serde_json::to_value(outcome.into_call_tool_result()) {
            Ok(result) => Some(JsonRpcResponse::success(id, result)),
            Err(e) => Some(JsonRpcResponse::internal_error(id, e.to_string())),
        }
    }
}

/// Unregisters a tool call when its future completes or is dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashMap<String, CancellationToken>>,
    key: &'a str,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        lock(self.in_flight).remove(self.key);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session map for multiplexing transports
// ============================================================================

/// Concurrent map of live sessions, keyed by session id.
///
/// The lock is held only for map operations, never while a message is
/// being handled.
#[cfg(any(feature = "sse", feature = "streamable-http"))]
pub struct SessionMap<T> {
    inner: std::sync::Arc<std::sync::RwLock<HashMap<String, T>>>,
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
impl<T> Clone for SessionMap<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
impl<T> Default for SessionMap<T> {
    fn default() -> Self {
        Self {
            inner: std::sync::Arc::new(std::sync::RwLock::new(HashMap::new())),
        }
    }
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
impl<T: Clone> SessionMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: impl Into<String>, entry: T) {
        self.write().insert(id.into(), entry);
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<T> {
        self.write().remove(id)
    }

    /// Remove every entry matching `predicate` and return them.
    pub fn remove_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        let mut map = self.write();
        let ids: Vec<String> = map
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(id, _)| id.clone())
            .collect();
        ids.iter().filter_map(|id| map.remove(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, T>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, T>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================
