//! Request conversion and client configuration errors.

use thiserror::Error;

/// Errors building a transport request from a [`RestRequest`](crate::RestRequest)
/// and the client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The resource is relative but no base URL is configured.
    #[error("No base URL configured for relative resource '{resource}'")]
    MissingBaseUrl {
        /// The relative resource that could not be resolved.
        resource: String,
    },

    /// A header name or value cannot be sent over HTTP.
    #[error("Invalid header: {name}")]
    InvalidHeader {
        /// The offending header name.
        name: String,
    },

    /// The proxy URL was rejected by the transport.
    #[error("Invalid proxy: {message}")]
    InvalidProxy {
        /// Description of the proxy error.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid header error.
    pub fn invalid_header(name: impl Into<String>) -> Self {
        Self::InvalidHeader { name: name.into() }
    }
}
