//! Transport error types.

use thiserror::Error;

use crate::core::error::ErrorKind;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur in transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The listening socket could not be opened.
    #[error("Cannot listen on {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The peer or an internal pump went away.
    #[error("Connection lost: {0}")]
    ConnectionError(String),

    /// Reading or writing the byte stream failed.
    #[error("Stream I/O failed: {0}")]
    IoError(#[from] std::io::Error),

    /// An outgoing message could not be encoded.
    #[error("Cannot encode message: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The exchange itself was malformed.
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// The HTTP server stopped with an error.
    #[error("HTTP server failed: {0}")]
    HttpError(String),
}

impl TransportError {
    /// Create a bind error.
    pub fn bind(address: impl Into<String>, source: std::io::Error) -> Self {
        Self::BindError {
            address: address.into(),
            source,
        }
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Create an HTTP error.
    pub fn http(msg: impl Into<String>) -> Self {
        Self::HttpError(msg.into())
    }

    /// Classify this error. Only a malformed exchange is a protocol error;
    /// everything else means the channel itself broke.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProtocolError(_) => ErrorKind::ProtocolError,
            _ => ErrorKind::TransportFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let broken = TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert_eq!(broken.kind(), ErrorKind::TransportFailure);
        assert_eq!(
            TransportError::protocol("bad frame").kind(),
            ErrorKind::ProtocolError
        );
        assert_eq!(
            TransportError::bind("127.0.0.1:1", std::io::ErrorKind::AddrInUse.into()).kind(),
            ErrorKind::TransportFailure
        );
    }
}
