//! Top-level API error type.

use super::{AuthError, ClientError, ConfigError, ValidationError};
use thiserror::Error;

/// Top-level error type for all request execution failures.
///
/// Execution never returns this directly. It is captured into the
/// [`RestResponse`](crate::RestResponse) as the response's error, so callers
/// match on it after checking [`RestResponse::is_error`](crate::RestResponse::is_error).
///
/// ## Examples
///
/// ```rust,ignore
/// use rest_client::ApiError;
///
/// let response = client.execute(&request).await;
/// if let Some(err) = response.error.as_deref() {
///     match err {
///         ApiError::Client(e) => eprintln!("Network error: {e}"),
///         ApiError::Validation(e) => eprintln!("Invalid response: {e}"),
///         ApiError::Auth(e) => eprintln!("Auth failed: {e}"),
///         ApiError::Config(e) => eprintln!("Configuration error: {e}"),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport errors (network, timeout, cancellation).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Response deserialization errors.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Authenticator errors.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Request conversion and client configuration errors.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// Returns `true` if the request was cancelled through its token.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Client(ClientError::Cancelled))
    }

    /// Returns `true` if the transport gave up waiting for the server.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Client(ClientError::Timeout { .. }) => true,
            Self::Client(ClientError::Request(e)) => e.is_timeout(),
            _ => false,
        }
    }
}
