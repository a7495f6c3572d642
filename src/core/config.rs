//! Configuration management for the MCP server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (and a `.env` file) or defaults.

use super::error::{Error, Result};
use super::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_SERVER_NAME: &str = "sum-mcp-server";

/// Default per-invocation tool timeout, in seconds.
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// Main configuration structure for the MCP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Tool execution configuration.
    pub tools: ToolsConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Tool execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Upper bound for a single tool invocation, in seconds. `0` disables it.
    pub call_timeout_secs: u64,
}

impl ToolsConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        (self.call_timeout_secs > 0).then(|| Duration::from_secs(self.call_timeout_secs))
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: DEFAULT_SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tools: ToolsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables are prefixed with `MCP_`, for example
    /// `MCP_SERVER_NAME`, `MCP_LOG_LEVEL`, `MCP_TRANSPORT`, `MCP_PORT`.
    /// Malformed values are reported as configuration errors.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(timeout) = std::env::var("MCP_TOOL_TIMEOUT_SECS") {
            config.tools.call_timeout_secs = timeout.trim().parse().map_err(|_| {
                Error::config(format!(
                    "MCP_TOOL_TIMEOUT_SECS must be a number of seconds, got '{timeout}'"
                ))
            })?;
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env()?;

        Ok(config)
    }

    /// Replace the transport with the one named on the command line.
    pub fn with_transport_name(mut self, name: &str) -> Result<Self> {
        self.transport = TransportConfig::from_name(name)?;
        Ok(self)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    pub(crate) static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tools.call_timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.logging.level, "info");
        assert!(config.transport.is_stdio());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let tools = ToolsConfig {
            call_timeout_secs: 0,
        };
        assert_eq!(tools.call_timeout(), None);
    }

    #[test]
    fn test_from_env_overrides() {
        let _lock = ENV_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::set_var("MCP_SERVER_NAME", "adder");
            std::env::set_var("MCP_TOOL_TIMEOUT_SECS", "5");
            std::env::remove_var("MCP_TRANSPORT");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.server.name, "adder");
        assert_eq!(config.tools.call_timeout(), Some(Duration::from_secs(5)));
        assert!(config.transport.is_stdio());
        unsafe {
            std::env::remove_var("MCP_SERVER_NAME");
            std::env::remove_var("MCP_TOOL_TIMEOUT_SECS");
        }
    }

    #[test]
    fn test_invalid_timeout_is_error() {
        let _lock = ENV_TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            std::env::set_var("MCP_TOOL_TIMEOUT_SECS", "soon");
        }
        let result = Config::from_env();
        unsafe {
            std::env::remove_var("MCP_TOOL_TIMEOUT_SECS");
        }
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_with_transport_name() {
        let config = Config::default().with_transport_name("stdio").unwrap();
        assert!(config.transport.is_stdio());
        assert!(Config::default().with_transport_name("carrier-pigeon").is_err());
    }
}
