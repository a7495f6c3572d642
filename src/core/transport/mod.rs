//! Transport layer for the MCP server.
//!
//! This module provides different transport implementations:
//! - **STDIO**: newline-delimited JSON on stdin/stdout (always available)
//! - **SSE**: `GET` event stream plus a `POST` message endpoint - feature: `sse`
//! - **Streamable HTTP**: one endpoint answering with JSON or an event
//!   stream - feature: `streamable-http`
//!
//! Each transport only frames messages. Decoding and routing happen in
//! [`Session`](crate::core::session::Session), so every binding shares the
//! same protocol semantics.

mod config;
mod error;
mod service;

pub mod stdio;

#[cfg(any(feature = "sse", feature = "streamable-http"))]
pub mod http;

#[cfg(feature = "sse")]
pub mod sse;

#[cfg(feature = "streamable-http")]
pub mod streamable_http;

use async_trait::async_trait;

use crate::core::McpServer;

pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use service::TransportService;

// Re-export configs for convenience
#[cfg(feature = "sse")]
pub use config::SseConfig;

#[cfg(feature = "streamable-http")]
pub use config::StreamableHttpConfig;

/// A binding that carries protocol messages between clients and the server.
#[async_trait]
pub trait Transport: Send {
    /// Human readable summary used in startup logs.
    fn description(&self) -> String;

    /// Serve until the channel closes or the process is asked to stop.
    async fn run(self: Box<Self>, server: McpServer) -> TransportResult<()>;
}
