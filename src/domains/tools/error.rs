//! Tool-specific error types.

use thiserror::Error;

use crate::core::error::ErrorKind;

/// Errors that can occur during tool registration, validation and execution.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Unknown tool: {0}")]
    NotFound(String),

    /// A tool with the same name is already registered.
    #[error("Tool already registered: {0}")]
    DuplicateName(String),

    /// An argument failed schema validation.
    #[error("Invalid argument '{parameter}': {message}")]
    InvalidArguments { parameter: String, message: String },

    /// The tool body failed.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool did not finish within the invocation timeout.
    #[error("Tool '{tool}' timed out after {seconds:.1}s")]
    Timeout { tool: String, seconds: f64 },

    /// The invocation was cancelled by the client or by session shutdown.
    #[error("Tool '{0}' was cancelled")]
    Cancelled(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "duplicate name" error.
    pub fn duplicate(name: impl Into<String>) -> Self {
        Self::DuplicateName(name.into())
    }

    /// Create a new "invalid arguments" error naming the offending parameter.
    pub fn invalid_arguments(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            parameter: parameter.into(),
            message: message.into(),
        }
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Client-visible classification of this error.
    ///
    /// Timeouts and cancellations are execution failures from the caller's
    /// point of view.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::UnknownTool,
            Self::InvalidArguments { .. } => ErrorKind::InvalidArguments,
            Self::ExecutionFailed(_) | Self::Timeout { .. } | Self::Cancelled(_) => {
                ErrorKind::ExecutionFailed
            }
            Self::DuplicateName(_) => ErrorKind::ProtocolError,
        }
    }

    /// The offending parameter, for argument validation errors.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            Self::InvalidArguments { parameter, .. } => Some(parameter),
            _ => None,
        }
    }
}
