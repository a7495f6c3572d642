//! Tool Dispatcher - validates and executes tool invocations.
//!
//! `invoke` never fails: every outcome, including unknown tools, schema
//! violations, failing or panicking bodies, timeouts and cancellation, is
//! packaged into an [`InvocationResponse`]. Those are data for the caller,
//! not protocol errors.

use std::sync::Arc;
use std::time::Duration;

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, instrument, warn};

use super::error::ToolError;
use super::handlers::{Tool, ToolArguments};
use super::registry::ToolRegistry;
use super::schema::json_type_name;
use crate::core::error::ErrorKind;

// ============================================================================
// Invocation Response
// ============================================================================

/// Error payload of a failed invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// Outcome of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResponse {
    /// The tool returned a value, exposed under the `result` key.
    Success(Value),
    /// The invocation failed; `isError` is set on the wire.
    Failure(InvocationError),
}

impl InvocationResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&InvocationError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    /// Structured payload: `{"result": value}` or `{"error": {kind, message}}`.
    pub fn structured_content(&self) -> Value {
        match self {
            Self::Success(value) => json!({ "result": value }),
            Self::Failure(error) => json!({ "error": error }),
        }
    }

    /// Wire form of a `tools/call` result.
    pub fn into_call_tool_result(self) -> CallToolResult {
        let structured = self.structured_content();
        let mut result = match self {
            Self::Success(Value::String(text)) => {
                CallToolResult::success(vec![Content::text(text)])
            }
            Self::Success(value) => CallToolResult::success(vec![Content::text(value.to_string())]),
            Self::Failure(error) => CallToolResult::error(vec![Content::text(error.message)]),
        };
        result.structured_content = Some(structured);
        result
    }
}

impl From<ToolError> for InvocationResponse {
    fn from(error: ToolError) -> Self {
        Self::Failure(InvocationError {
            kind: error.kind(),
            parameter: error.parameter().map(str::to_string),
            message: error.to_string(),
        })
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Dispatches invocation requests against a shared, read-only registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher. `timeout` bounds every invocation; `None`
    /// disables the bound.
    pub fn new(registry: Arc<ToolRegistry>, timeout: Option<Duration>) -> Self {
        Self { registry, timeout }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Invoke a tool without external cancellation.
    pub async fn invoke(&self, name: &str, arguments: Option<Value>) -> InvocationResponse {
        self.invoke_with_cancel(name, arguments, CancellationToken::new())
            .await
    }

    /// Invoke a tool; cancelling `cancel` aborts the running body.
    #[instrument(skip(self, arguments, cancel))]
    pub async fn invoke_with_cancel(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: CancellationToken,
    ) -> InvocationResponse {
        match self.try_invoke(name, arguments, cancel).await {
            Ok(value) => {
                info!("Tool '{}' succeeded", name);
                InvocationResponse::Success(value)
            }
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                e.into()
            }
        }
    }

    async fn try_invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: CancellationToken,
    ) -> Result<Value, ToolError> {
        let tool = self.registry.get(name)?;
        let arguments = validate(&tool, arguments)?;

        // The body runs on its own task so a panic cannot unwind into the session.
        // Dropping this future aborts the task.
        let handler = tool.handler();
        let mut task =
            AbortOnDropHandle::new(tokio::spawn(async move { handler.call(arguments).await }));

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = cancel.cancelled() => {
                task.abort();
                return Err(ToolError::Cancelled(name.to_string()));
            }
            _ = expire(self.timeout) => {
                task.abort();
                return Err(ToolError::Timeout {
                    tool: name.to_string(),
                    seconds: self.timeout.map(|d| d.as_secs_f64()).unwrap_or_default(),
                });
            }
        };

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ToolError::execution_failed(format!("{e:#}"))),
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "tool panicked".to_string());
                Err(ToolError::execution_failed(format!("tool panicked: {message}")))
            }
            Err(e) => Err(ToolError::execution_failed(e.to_string())),
        }
    }
}

/// Resolve after `timeout`, or never.
async fn expire(timeout: Option<Duration>) {
    match timeout {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

/// Validate raw arguments against a tool's declared parameters.
///
/// Applies defaults, normalizes integral floats for integer parameters and
/// drops undeclared arguments.
pub fn validate(tool: &Tool, arguments: Option<Value>) -> Result<ToolArguments, ToolError> {
    let mut supplied = match arguments {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(ToolError::invalid_arguments(
                "arguments",
                format!("expected an object, got {}", json_type_name(&other)),
            ));
        }
    };

    let mut validated = Map::new();
    for param in tool.parameters() {
        let value = match (supplied.remove(&param.name), &param.default) {
            (None | Some(Value::Null), Some(default)) => default.clone(),
            (None, None) => {
                return Err(ToolError::invalid_arguments(
                    &param.name,
                    "missing required argument",
                ));
            }
            (Some(value), _) => param.ty.coerce(&value).ok_or_else(|| {
                ToolError::invalid_arguments(
                    &param.name,
                    format!("expected {}, got {}", param.ty, json_type_name(&value)),
                )
            })?,
        };
        validated.insert(param.name.clone(), value);
    }

    if !supplied.is_empty() {
        let ignored: Vec<_> = supplied.keys().map(String::as_str).collect();
        debug!("Ignoring undeclared arguments for '{}': {:?}", tool.name(), ignored);
    }

    Ok(ToolArguments::new(validated))
}

// ============================================================================
// Tests
// ============================================================================
