//! Authenticators applied to every outgoing transport request.
//!
//! Credentials are usually read from environment variables so secrets never
//! live in code:
//!
//! ```rust,no_run
//! use rest_client::{ApiAuthMethod, ApiKeyAuthenticator};
//!
//! let auth = ApiKeyAuthenticator::from_env(ApiAuthMethod::BearerToken, "OPENAI_API_KEY")?;
//! # Ok::<(), rest_client::AuthError>(())
//! ```

use std::fmt;

use crate::error::AuthError;
use crate::request::Credentials;
use crate::transport::TransportRequest;

/// Adds credentials to a converted request before it is dispatched.
pub trait Authenticator: Send + Sync {
    /// Mutates `request` in place.
    ///
    /// ## Errors
    ///
    /// Returns an [`AuthError`] if the credentials cannot be applied; the
    /// execution then fails without reaching the transport.
    fn authenticate(&self, request: &mut TransportRequest) -> Result<(), AuthError>;
}

/// Where an API key goes on the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ApiAuthMethod {
    /// `Authorization: Bearer <key>`.
    BearerToken,
    /// The key as the value of the named header.
    ApiKey(String),
    /// The key as the value of the named query parameter.
    QueryParam(String),
    #[default]
    None,
}

/// Applies an API key according to an [`ApiAuthMethod`].
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeyAuthenticator {
    method: ApiAuthMethod,
    api_key: String,
}

impl ApiKeyAuthenticator {
    pub fn new(method: ApiAuthMethod, api_key: impl Into<String>) -> Self {
        Self {
            method,
            api_key: api_key.into(),
        }
    }

    /// Reads the key from `env_var`.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::MissingApiKey`] if the variable is unset or empty.
    pub fn from_env(method: ApiAuthMethod, env_var: &str) -> Result<Self, AuthError> {
        Ok(Self::new(method, read_env(env_var)?))
    }

    pub fn method(&self) -> &ApiAuthMethod {
        &self.method
    }
}

impl fmt::Debug for ApiKeyAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyAuthenticator")
            .field("method", &self.method)
            .field("api_key", &"***")
            .finish()
    }
}

impl Authenticator for ApiKeyAuthenticator {
    fn authenticate(&self, request: &mut TransportRequest) -> Result<(), AuthError> {
        match &self.method {
            ApiAuthMethod::BearerToken => {
                set_header(request, "Authorization", format!("Bearer {}", self.api_key));
            }
            ApiAuthMethod::ApiKey(header_name) => {
                if header_name.is_empty() || header_name.contains(char::is_whitespace) {
                    return Err(AuthError::InvalidKeyFormat);
                }
                set_header(request, header_name, self.api_key.clone());
            }
            ApiAuthMethod::QueryParam(param_name) => {
                request
                    .url
                    .query_pairs_mut()
                    .append_pair(param_name, &self.api_key);
            }
            ApiAuthMethod::None => {}
        }
        Ok(())
    }
}

/// Sends HTTP basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpBasicAuthenticator {
    credentials: Credentials,
}

impl HttpBasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            credentials: Credentials::new(username, password),
        }
    }

    /// Reads user name and password from two environment variables.
    ///
    /// ## Errors
    ///
    /// Returns [`AuthError::MissingApiKey`] naming the first variable that is unset.
    pub fn from_env(username_var: &str, password_var: &str) -> Result<Self, AuthError> {
        let username = read_env(username_var)?;
        let password = read_env(password_var)?;
        Ok(Self::new(username, password))
    }
}

impl Authenticator for HttpBasicAuthenticator {
    fn authenticate(&self, request: &mut TransportRequest) -> Result<(), AuthError> {
        request.credentials = Some(self.credentials.clone());
        Ok(())
    }
}

fn read_env(env_var: &str) -> Result<String, AuthError> {
    std::env::var(env_var)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AuthError::MissingApiKey {
            env_var: env_var.to_string(),
        })
}

/// Replaces any header of the same name.
fn set_header(request: &mut TransportRequest, name: &str, value: String) {
    request
        .headers
        .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    request.headers.push((name.to_string(), value));
}
