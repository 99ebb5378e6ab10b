//! Declarative REST client.
//!
//! The `rest-client` crate turns a declarative [`RestRequest`] (verb, resource
//! path and typed parameters) into an HTTP exchange, runs it asynchronously
//! and materializes the answer as a [`RestResponse`] or a deserialized
//! [`TypedResponse`].
//!
//! ## Features
//!
//! - **Two call shapes**: body-less verbs go through the GET-style transport
//!   path, PATCH/POST/PUT through the POST-style path
//! - **Content-type driven deserialization**: JSON, XML and YAML built in,
//!   custom handlers per media type
//! - **Errors as data**: execution always yields a response carrying the
//!   captured error, never a propagated one
//! - **Pluggable transport**: `reqwest` by default, anything implementing
//!   [`Transport`] otherwise
//! - **Cancellation** through `tokio_util`'s `CancellationToken`
//!
//! ## Example
//!
//! ```rust,no_run
//! use rest_client::{RestClient, RestRequest};
//!
//! #[derive(serde::Deserialize)]
//! struct User { id: u64, name: String }
//!
//! # async fn run() -> Result<(), rest_client::ApiError> {
//! let client = RestClient::builder()
//!     .base_url("https://api.example.com")
//!     .build()?;
//!
//! let request = RestRequest::new("users/{id}")
//!     .with_url_segment("id", "7")
//!     .with_root_element("user");
//!
//! let response = client.execute_as::<User>(&request).await;
//! if response.is_error() {
//!     eprintln!("{:?}", response.response().error_message);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod convert;
pub mod deserializer;
pub mod dispatch;
pub mod error;
pub mod method;
pub mod request;
pub mod response;
pub mod transport;

// Re-exports for convenience
pub use auth::{ApiAuthMethod, ApiKeyAuthenticator, Authenticator, HttpBasicAuthenticator};
pub use client::{ClientOptions, RestClient, RestClientBuilder};
pub use deserializer::{
    DeserializeHints, Deserializer, DeserializerRegistry, JsonDeserializer, XmlDeserializer,
    YamlDeserializer,
};
pub use error::{ApiError, AuthError, ClientError, ConfigError, ValidationError};
pub use method::{CallShape, RestMethod};
pub use request::{Credentials, Parameter, ParameterKind, ParameterValue, RestRequest};
pub use response::{ResponseCookie, ResponseStatus, RestResponse, TypedResponse};
pub use tokio_util::sync::CancellationToken;
pub use transport::{HttpTransport, Transport, TransportRequest, TransportResponse};
