//! The REST client.
//!
//! [`RestClient`] owns a [`Transport`](crate::Transport) and the shared
//! [`ClientOptions`], and runs every request through the same pipeline:
//! convert, authenticate, dispatch, convert back, deserialize.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use rest_client::{ApiAuthMethod, ApiKeyAuthenticator, RestClient, RestMethod, RestRequest};
//!
//! #[derive(serde::Deserialize)]
//! struct Created { id: u64 }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::builder()
//!     .base_url("https://api.example.com")
//!     .authenticator(ApiKeyAuthenticator::from_env(ApiAuthMethod::BearerToken, "EXAMPLE_TOKEN")?)
//!     .build()?;
//!
//! let request = RestRequest::new("notes")
//!     .with_method(RestMethod::Post)
//!     .with_json_body(&serde_json::json!({"text": "hi"}))?;
//!
//! let created = client.execute_as::<Created>(&request).await;
//! match created.data() {
//!     Some(note) => println!("created {}", note.id),
//!     None => eprintln!("failed: {:?}", created.response().error_message),
//! }
//! # Ok(())
//! # }
//! ```

mod executor;
mod options;

pub use executor::{RestClient, RestClientBuilder};
pub use options::ClientOptions;
