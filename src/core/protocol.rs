//! JSON-RPC 2.0 message types shared by every transport.
//!
//! Transports only frame text; [`parse_message`] turns one frame into an
//! [`IncomingMessage`] or into the error response that must be sent back.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::error::ErrorKind;

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP method names handled by the session.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const NOTIFY_INITIALIZED: &str = "notifications/initialized";
    pub const NOTIFY_CANCELLED: &str = "notifications/cancelled";
}

/// JSON-RPC request structure. A request without `id` is a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request; used by tests and clients.
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    /// Build a notification.
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC response structure.
///
/// `id` is always serialized; it is `null` when the request id could not
/// be determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Create a success response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create a protocol error response. The error kind is carried in `data`.
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: Some(json!({ "kind": ErrorKind::ProtocolError })),
            }),
        }
    }

    /// Parse error.
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::error(Value::Null, error_codes::PARSE_ERROR, msg)
    }

    /// Invalid request error.
    pub fn invalid_request(id: Value, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INVALID_REQUEST, msg)
    }

    /// Method not found error.
    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    /// Invalid params error.
    pub fn invalid_params(id: Value, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INVALID_PARAMS, msg)
    }

    /// Internal error.
    pub fn internal_error(id: Value, msg: impl Into<String>) -> Self {
        Self::error(id, error_codes::INTERNAL_ERROR, msg)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One decoded client→server message.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// Expects exactly one response.
    Request(JsonRpcRequest),
    /// Never answered.
    Notification(JsonRpcRequest),
    /// A reply to a server→client request; this server sends none, so these
    /// are dropped.
    Response(Value),
}

impl IncomingMessage {
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(r) | Self::Notification(r) => Some(&r.method),
            Self::Response(_) => None,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    pub fn is_initialize(&self) -> bool {
        self.is_request() && self.method() == Some(methods::INITIALIZE)
    }

    /// Tool calls are the only requests that may take non-trivial time.
    pub fn is_tool_call(&self) -> bool {
        self.is_request() && self.method() == Some(methods::TOOLS_CALL)
    }
}

impl From<JsonRpcRequest> for IncomingMessage {
    fn from(request: JsonRpcRequest) -> Self {
        if request.id.as_ref().is_some_and(|id| !id.is_null()) {
            Self::Request(request)
        } else {
            Self::Notification(request)
        }
    }
}

/// Decode one framed message.
///
/// On failure returns the error response to send back to the client.
pub fn parse_message(text: &str) -> Result<IncomingMessage, JsonRpcResponse> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| JsonRpcResponse::parse_error(format!("Parse error: {e}")))?;
    parse_value(value)
}

/// Decode an already-parsed JSON value.
pub fn parse_value(value: Value) -> Result<IncomingMessage, JsonRpcResponse> {
    let Value::Object(object) = &value else {
        return Err(JsonRpcResponse::invalid_request(
            Value::Null,
            "Invalid Request: expected a JSON object",
        ));
    };

    let id = object.get("id").cloned().unwrap_or(Value::Null);

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(JsonRpcResponse::invalid_request(
            id,
            "Invalid Request: jsonrpc must be \"2.0\"",
        ));
    }

    if !object.contains_key("method") {
        if object.contains_key("result") || object.contains_key("error") {
            return Ok(IncomingMessage::Response(value));
        }
        return Err(JsonRpcResponse::invalid_request(
            id,
            "Invalid Request: missing method",
        ));
    }

    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| JsonRpcResponse::invalid_request(id, format!("Invalid Request: {e}")))?;
    Ok(request.into())
}
