//! Transport and network errors.

use thiserror::Error;

/// Errors from the transport layer.
///
/// These errors represent network-level failures, timeouts and cancellation
/// that occur while a request is in flight.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed due to network or protocol error.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Request exceeded the configured timeout.
    #[error("Request timeout after {duration_ms}ms")]
    Timeout {
        /// The timeout duration in milliseconds.
        duration_ms: u64,
    },

    /// Failed to establish connection to the server.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The request's cancellation token fired while the call was in flight.
    #[error("Request was cancelled")]
    Cancelled,

    /// A custom transport reported a failure.
    #[error("Transport failed: {0}")]
    Transport(String),
}
