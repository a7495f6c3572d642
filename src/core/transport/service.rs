//! Transport service - orchestrates different transport types.
//!
//! This service provides a unified interface for starting the MCP server
//! with whichever transport the configuration selects.

use tracing::info;

use super::stdio::StdioTransport;
use super::{Transport, TransportConfig, TransportResult};
use crate::core::McpServer;

#[cfg(feature = "sse")]
use super::sse::SseTransport;

#[cfg(feature = "streamable-http")]
use super::streamable_http::StreamableHttpTransport;

/// Transport service - manages the transport layer for the MCP server.
pub struct TransportService {
    config: TransportConfig,
}

impl TransportService {
    /// Create a new transport service with the given configuration.
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    /// Get the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Build the transport selected by the configuration.
    pub fn transport(&self) -> Box<dyn Transport> {
        match &self.config {
            TransportConfig::Stdio => Box::new(StdioTransport::new()),
            #[cfg(feature = "sse")]
            TransportConfig::Sse(cfg) => Box::new(SseTransport::new(cfg.clone())),
            #[cfg(feature = "streamable-http")]
            TransportConfig::StreamableHttp(cfg) => {
                Box::new(StreamableHttpTransport::new(cfg.clone()))
            }
        }
    }

    /// Start the transport with the given MCP server.
    ///
    /// This method blocks until the transport is shut down.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let transport = self.transport();
        info!("Starting transport: {}", transport.description());
        transport.run(server).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_stdio() {
        let service = TransportService::new(TransportConfig::default());
        assert!(service.config().is_stdio());
        assert_eq!(service.transport().description(), "STDIO (newline-delimited JSON)");
    }

    #[cfg(feature = "sse")]
    #[test]
    fn test_selects_sse() {
        let service = TransportService::new(TransportConfig::sse(9000, "127.0.0.1"));
        assert!(service.transport().description().starts_with("SSE on 127.0.0.1:9000"));
    }
}
