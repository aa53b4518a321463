//! Error types for the worker supervision layer.
//!
//! Two boundaries, two enums:
//! - `WorkerError`: registration and lifecycle errors raised by this crate
//! - `ClientError`: errors surfaced by a `BrokerClient` implementation

use crate::transport::TransportMode;
use thiserror::Error;

/// Errors surfaced by a broker client implementation.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to establish a transport session
    #[error("connection error: {0}")]
    Connection(String),

    /// Failed to register a queue subscription
    #[error("subscribe error: {0}")]
    Subscribe(String),

    /// A redelivery / dead-letter request failed
    #[error("redelivery request error: {0}")]
    Unreceive(String),

    /// Failed to close the transport session
    #[error("close error: {0}")]
    Close(String),

    /// Operation attempted on an already-closed client
    #[error("client already closed")]
    Closed,
}

impl ClientError {
    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        ClientError::Connection(message.into())
    }

    /// Create a subscribe error
    pub fn subscribe(message: impl Into<String>) -> Self {
        ClientError::Subscribe(message.into())
    }

    /// Create a redelivery-request error
    pub fn unreceive(message: impl Into<String>) -> Self {
        ClientError::Unreceive(message.into())
    }

    /// Create a close error
    pub fn close(message: impl Into<String>) -> Self {
        ClientError::Close(message.into())
    }
}

/// Errors raised by the supervision layer itself.
///
/// Registration-time errors (`Configuration`, `Consume`) are immediate and
/// local: they fail at the call site, never at dispatch time.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Configuration was requested without a registered supplier
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A queue registration was attempted without a handler
    #[error("consumer registration error: {0}")]
    Consume(String),

    /// No client builder is registered for the selected transport mode
    #[error("no transport registered for {0}")]
    UnsupportedTransport(TransportMode),

    /// Error surfaced by the broker client
    #[error("transport error: {0}")]
    Transport(#[from] ClientError),
}

impl WorkerError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        WorkerError::Configuration(message.into())
    }

    /// Create a consumer registration error
    pub fn consume(message: impl Into<String>) -> Self {
        WorkerError::Consume(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkerError::configuration("no supplier registered");
        assert_eq!(
            err.to_string(),
            "configuration error: no supplier registered"
        );

        let err = WorkerError::consume("no handler for '/queue/foo'");
        assert_eq!(
            err.to_string(),
            "consumer registration error: no handler for '/queue/foo'"
        );

        let err = WorkerError::UnsupportedTransport(TransportMode::Jms);
        assert_eq!(err.to_string(), "no transport registered for jms");
    }

    #[test]
    fn test_client_error_passthrough() {
        let err: WorkerError = ClientError::connection("broker unreachable").into();
        assert!(matches!(err, WorkerError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "transport error: connection error: broker unreachable"
        );
    }
}
