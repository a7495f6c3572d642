//! Minimal MCP tool server.
//!
//! This crate implements the tool-invocation side of the Model Context
//! Protocol: a registry of typed tools, schema-driven argument validation,
//! a concurrent dispatcher, and the stdio, SSE and streamable HTTP bindings
//! that carry JSON-RPC 2.0 messages between clients and the server.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the JSON-RPC message layer,
//!   sessions, the server object and the transports
//! - **domains**: business logic organized by bounded contexts
//!   - **tools**: tool declarations, registry and dispatcher
//!
//! # Example
//!
//! ```rust,no_run
//! use sum_mcp_server::core::{Config, McpServer, TransportService};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = McpServer::new(config.clone());
//!     TransportService::new(config.transport).run(server).await?;
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, ErrorKind, McpServer, Result};
pub use domains::tools::{ParamType, Parameter, Tool, ToolArguments, ToolRegistry};
