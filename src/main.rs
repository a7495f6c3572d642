//! MCP Server Entry Point
//!
//! Loads configuration, initializes logging and starts the server on the
//! configured transport. The first positional argument, when present,
//! names the transport and overrides `MCP_TRANSPORT`.

use anyhow::Result;
use tracing::{Level, error, info};
use tracing_subscriber::{EnvFilter, fmt};

use sum_mcp_server::core::{Config, McpServer, TransportService};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration from environment, then the command line
    let mut config = Config::from_env()?;
    if let Some(transport) = std::env::args().nth(1) {
        config = config.with_transport_name(&transport)?;
    }

    // Initialize logging
    init_logging(&config.logging.level);

    info!("Starting {} v{}", config.server.name, config.server.version);

    let server = McpServer::new(config.clone());

    let transport = TransportService::new(config.transport);
    if let Err(e) = transport.run(server).await {
        error!("Transport failed ({}): {}", e.kind(), e);
        return Err(e.into());
    }

    info!("Server shutting down");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs always go to stderr; stdout belongs to the stdio transport.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" | "critical" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
