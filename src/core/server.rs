//! MCP Server implementation and lifecycle management.
//!
//! [`McpServer`] is the explicitly constructed server object handed to
//! whichever transport is started. It owns the process-wide tool registry
//! (read-only after construction) and the dispatcher, and opens sessions
//! on behalf of transports. Cloning is cheap; clones share the registry.

use rmcp::model::{ServerCapabilities, ServerInfo};
use std::sync::Arc;
use tracing::info;

use super::config::Config;
use super::session::{Session, TransportKind};
use crate::domains::tools::{Dispatcher, InvocationResponse, ToolRegistry, ToolSchema};

/// Instructions returned to clients on initialization.
const INSTRUCTIONS: &str =
    "This server exposes typed tools. Use tools/list to discover them and tools/call to invoke them.";

/// The main MCP server object.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Validates and executes tool calls against the shared registry.
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Create a new MCP server with the built-in tools.
    pub fn new(config: Config) -> Self {
        Self::with_registry(config, ToolRegistry::with_builtin_tools())
    }

    /// Create a server around an already populated registry.
    pub fn with_registry(config: Config, registry: ToolRegistry) -> Self {
        let timeout = config.tools.call_timeout();
        info!("Registered {} tool(s)", registry.len());

        Self {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(Arc::new(registry), timeout),
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        self.dispatcher.registry()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Open a new session bound to the given transport.
    pub fn open_session(&self, transport: TransportKind) -> Arc<Session> {
        Arc::new(Session::new(self.clone(), transport))
    }

    /// Schemas of all registered tools, in registration order.
    pub fn list_tools(&self) -> Vec<ToolSchema> {
        self.registry().list()
    }

    /// Call a tool by name outside of any session.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> InvocationResponse {
        self.dispatcher.invoke(name, arguments).await
    }

    /// Capability summary returned by `initialize`.
    pub fn server_info(&self) -> ServerInfo {
        let mut info = ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        };
        info.server_info.name = self.name().to_string();
        info.server_info.version = self.version().to_string();
        info
    }
}
