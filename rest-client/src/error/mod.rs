//! Layered error types for the REST client.
//!
//! The error hierarchy is structured for actionable diagnostics:
//! - [`ApiError`] - Top-level error type carried by failed responses
//! - [`ClientError`] - Transport, network and cancellation failures
//! - [`ValidationError`] - Response deserialization failures
//! - [`AuthError`] - Authenticator failures
//! - [`ConfigError`] - URL, header and client configuration errors

mod api_error;
mod auth_error;
mod client_error;
mod config_error;
mod validation_error;

pub use api_error::ApiError;
pub use auth_error::AuthError;
pub use client_error::ClientError;
pub use config_error::ConfigError;
pub use validation_error::ValidationError;
