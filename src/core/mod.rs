//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the MCP server,
//! including error handling, configuration, the JSON-RPC message layer,
//! session state, server lifecycle management and the transport bindings.

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use server::McpServer;
pub use session::{Session, SessionState, TransportKind};
pub use transport::{TransportConfig, TransportService};
