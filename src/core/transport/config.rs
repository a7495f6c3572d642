//! Transport configuration types.

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Transport configuration options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransportConfig {
    /// Standard input/output transport (default for MCP).
    #[default]
    Stdio,

    /// Server-Sent-Events stream plus a POST message endpoint.
    #[cfg(feature = "sse")]
    Sse(SseConfig),

    /// Single-endpoint streamable HTTP.
    #[cfg(feature = "streamable-http")]
    StreamableHttp(StreamableHttpConfig),
}

/// SSE transport configuration.
#[cfg(feature = "sse")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path of the event stream (`GET`).
    #[serde(default = "default_sse_path")]
    pub sse_path: String,

    /// Path clients POST their messages to.
    #[serde(default = "default_message_path")]
    pub message_path: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,
}

/// Streamable HTTP transport configuration.
#[cfg(feature = "streamable-http")]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamableHttpConfig {
    /// Port number to listen on.
    pub port: u16,

    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Path of the MCP endpoint.
    #[serde(default = "default_http_path")]
    pub path: String,

    /// Enable CORS for browser clients.
    #[serde(default = "default_cors")]
    pub enable_cors: bool,

    /// Always answer with `application/json`, never with an event stream.
    #[serde(default)]
    pub json_response: bool,

    /// Seconds without a request before a session is evicted. 0 keeps
    /// sessions until they are deleted.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

#[cfg(feature = "streamable-http")]
impl StreamableHttpConfig {
    /// Idle time after which a session is evicted, if any.
    pub fn session_ttl(&self) -> Option<std::time::Duration> {
        (self.session_ttl_secs > 0).then(|| std::time::Duration::from_secs(self.session_ttl_secs))
    }
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
const DEFAULT_PORT: u16 = 8000;

#[cfg(any(feature = "sse", feature = "streamable-http"))]
fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[cfg(feature = "sse")]
fn default_sse_path() -> String {
    "/sse".to_string()
}

#[cfg(feature = "sse")]
fn default_message_path() -> String {
    "/messages/".to_string()
}

#[cfg(feature = "streamable-http")]
fn default_http_path() -> String {
    "/mcp".to_string()
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
fn default_cors() -> bool {
    true
}

#[cfg(feature = "streamable-http")]
fn default_session_ttl() -> u64 {
    30 * 60
}

#[cfg(feature = "sse")]
impl Default for SseConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: default_host(),
            sse_path: default_sse_path(),
            message_path: default_message_path(),
            enable_cors: default_cors(),
        }
    }
}

#[cfg(feature = "streamable-http")]
impl Default for StreamableHttpConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: default_host(),
            path: default_http_path(),
            enable_cors: default_cors(),
            json_response: false,
            session_ttl_secs: default_session_ttl(),
        }
    }
}

impl TransportConfig {
    /// Create a STDIO transport config.
    pub fn stdio() -> Self {
        Self::Stdio
    }

    /// Create an SSE transport config.
    #[cfg(feature = "sse")]
    pub fn sse(port: u16, host: impl Into<String>) -> Self {
        Self::Sse(SseConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Create a streamable HTTP transport config.
    #[cfg(feature = "streamable-http")]
    pub fn streamable_http(port: u16, host: impl Into<String>) -> Self {
        Self::StreamableHttp(StreamableHttpConfig {
            port,
            host: host.into(),
            ..Default::default()
        })
    }

    /// Select a transport by name, reading its options from the environment.
    ///
    /// Accepts `stdio`, `sse`, `streamable-http` and its alias `http`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "" | "stdio" => Ok(Self::Stdio),
            #[cfg(feature = "sse")]
            "sse" => Ok(Self::Sse(SseConfig {
                port: env_port()?,
                host: env_or("MCP_HOST", default_host),
                sse_path: env_or("MCP_SSE_PATH", default_sse_path),
                message_path: env_or("MCP_MESSAGE_PATH", default_message_path),
                enable_cors: env_flag("MCP_HTTP_CORS", default_cors())?,
            })),
            #[cfg(feature = "streamable-http")]
            "streamable-http" | "streamable_http" | "http" => {
                Ok(Self::StreamableHttp(StreamableHttpConfig {
                    port: env_port()?,
                    host: env_or("MCP_HOST", default_host),
                    path: env_or("MCP_HTTP_PATH", default_http_path),
                    enable_cors: env_flag("MCP_HTTP_CORS", default_cors())?,
                    json_response: env_flag("MCP_JSON_RESPONSE", false)?,
                    session_ttl_secs: env_secs("MCP_SESSION_TTL_SECS", default_session_ttl())?,
                }))
            }
            other => Err(Error::config(format!(
                "unknown transport '{other}' (available: {})",
                Self::available().join(", ")
            ))),
        }
    }

    /// Load transport config from environment variables.
    pub fn from_env() -> Result<Self> {
        let name = std::env::var("MCP_TRANSPORT").unwrap_or_default();
        Self::from_name(&name)
    }

    /// Names of the transports compiled into this binary.
    pub fn available() -> Vec<&'static str> {
        let mut names = vec!["stdio"];
        if cfg!(feature = "sse") {
            names.push("sse");
        }
        if cfg!(feature = "streamable-http") {
            names.push("streamable-http");
        }
        names
    }

    /// Check if this transport is the standard STDIO mode.
    pub fn is_stdio(&self) -> bool {
        matches!(self, Self::Stdio)
    }
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
fn env_or(key: &str, default: fn() -> String) -> String {
    std::env::var(key).unwrap_or_else(|_| default())
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
fn env_port() -> Result<u16> {
    match std::env::var("MCP_PORT") {
        Ok(port) => port
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("MCP_PORT must be a port number, got '{port}'"))),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

#[cfg(any(feature = "sse", feature = "streamable-http"))]
fn env_flag(key: &str, default: bool) -> Result<bool> {
    let Ok(value) = std::env::var(key) else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{key} must be a boolean, got '{value}'"))),
    }
}

#[cfg(feature = "streamable-http")]
fn env_secs(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| {
            Error::config(format!("{key} must be a number of seconds, got '{value}'"))
        }),
        Err(_) => Ok(default),
    }
}
