//! Authentication errors.

use thiserror::Error;

/// Errors raised by an [`Authenticator`](crate::Authenticator).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The environment variable holding a credential is unset or empty.
    #[error("Missing API key: environment variable {env_var} is not set")]
    MissingApiKey {
        /// The environment variable that was consulted.
        env_var: String,
    },

    /// API key cannot be used in the configured position (e.g. not a valid header name).
    #[error("Invalid API key format")]
    InvalidKeyFormat,

    /// Token has expired and needs to be refreshed.
    #[error("Token expired")]
    TokenExpired,
}
