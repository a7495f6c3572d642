//! Error types and handling for the MCP server.
//!
//! This module defines a unified error type that can represent errors from
//! the tools domain, the transport layer and external dependencies, plus the
//! client-visible [`ErrorKind`] taxonomy every error is classified into.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A specialized Result type for MCP server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Client-visible error classification.
///
/// Tool-level kinds (`UnknownTool`, `InvalidArguments`, `ExecutionFailed`)
/// travel as data inside a `tools/call` result. `ProtocolError` travels as a
/// JSON-RPC error object. `TransportFailure` is never sent, it ends the
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed message or message sent out of sequence.
    ProtocolError,
    /// The invocation names a tool that is not registered.
    UnknownTool,
    /// The argument mapping failed schema validation.
    InvalidArguments,
    /// The tool body failed, panicked, timed out or was cancelled.
    ExecutionFailed,
    /// The underlying channel broke.
    TransportFailure,
}

impl ErrorKind {
    /// Stable wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolError => "ProtocolError",
            Self::UnknownTool => "UnknownTool",
            Self::InvalidArguments => "InvalidArguments",
            Self::ExecutionFailed => "ExecutionFailed",
            Self::TransportFailure => "TransportFailure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the MCP server.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originating from the tools domain.
    #[error("Tool error: {0}")]
    Tool(#[from] crate::domains::tools::ToolError),

    /// Error originating from the transport layer.
    #[error("Transport error: {0}")]
    Transport(#[from] crate::core::transport::TransportError),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors from file operations or network communication.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors that should not occur under normal operation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Tool(e) => e.kind(),
            Self::Transport(e) => e.kind(),
            Self::Json(_) => ErrorKind::ProtocolError,
            Self::Io(_) => ErrorKind::TransportFailure,
            Self::Config(_) | Self::Internal(_) => ErrorKind::ProtocolError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::ToolError;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(ErrorKind::UnknownTool.to_string(), "UnknownTool");
        assert_eq!(
            serde_json::to_value(ErrorKind::InvalidArguments).unwrap(),
            serde_json::json!("InvalidArguments")
        );
    }

    #[test]
    fn test_error_kind_from_tool_error() {
        let err: Error = ToolError::not_found("nope").into();
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_io_error_is_transport_failure() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::BrokenPipe).into();
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
    }
}
