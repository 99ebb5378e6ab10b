//! Response model.
//!
//! [`RestResponse`] is the untyped result of one execution: every field the
//! transport reported plus the error state. [`TypedResponse`] wraps it with
//! the deserialized payload and keeps every raw field even when
//! deserialization fails.

use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use strum::Display;
use url::Url;

use crate::error::{ApiError, ClientError};

/// Outcome of the transport exchange, independent of the HTTP status code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
pub enum ResponseStatus {
    /// Nothing has happened yet.
    #[default]
    None,
    /// The server answered; the status code may still be 4xx/5xx.
    Completed,
    /// Conversion, transport or deserialization failed.
    Error,
    /// The transport deadline elapsed.
    TimedOut,
    /// The call was cancelled through its token.
    Aborted,
}

impl ResponseStatus {
    /// Returns `true` for [`Error`](Self::Error), [`TimedOut`](Self::TimedOut)
    /// and [`Aborted`](Self::Aborted).
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error | Self::TimedOut | Self::Aborted)
    }
}

/// A cookie set by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
    pub expires: Option<SystemTime>,
    pub secure: bool,
    pub http_only: bool,
}

/// The untyped result of executing a [`RestRequest`](crate::RestRequest).
///
/// Execution always yields a response. Failures are data: check
/// [`is_error`](Self::is_error) and [`error`](Self::error) rather than
/// expecting a propagated error.
#[derive(Debug, Clone, Default)]
pub struct RestResponse {
    /// Body decoded as UTF-8 (lossy).
    pub content: String,
    /// Value of the `Content-Encoding` header.
    pub content_encoding: Option<String>,
    /// Body length reported by the server.
    pub content_length: Option<u64>,
    /// Value of the `Content-Type` header, parameters included.
    pub content_type: Option<String>,
    pub response_status: ResponseStatus,
    /// Human-readable description of the captured error.
    pub error_message: Option<String>,
    /// The captured error.
    pub error: Option<Arc<ApiError>>,
    pub raw_bytes: Bytes,
    /// HTTP status code; `0` when no response was received.
    pub status_code: u16,
    /// Canonical reason phrase for the status code.
    pub status_description: String,
    /// Final URL after redirects.
    pub response_uri: Option<Url>,
    /// Value of the `Server` header.
    pub server: Option<String>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<ResponseCookie>,
}

impl RestResponse {
    /// Builds the error response for a failure that happened before or
    /// during the transport call.
    pub fn from_error(error: ApiError) -> Self {
        let mut response = Self::default();
        response.fail(error);
        response
    }

    /// Records `error` on this response, keeping every field already set.
    ///
    /// Timeouts become [`ResponseStatus::TimedOut`], cancellation becomes
    /// [`ResponseStatus::Aborted`], anything else [`ResponseStatus::Error`].
    pub fn fail(&mut self, error: ApiError) {
        self.response_status = if error.is_cancelled() {
            ResponseStatus::Aborted
        } else if error.is_timeout() {
            ResponseStatus::TimedOut
        } else {
            ResponseStatus::Error
        };
        self.error_message = Some(error.to_string());
        self.error = Some(Arc::new(error));
    }

    /// Returns `true` if the exchange or deserialization failed.
    ///
    /// HTTP 4xx/5xx responses are *not* errors in this sense.
    pub fn is_error(&self) -> bool {
        self.response_status.is_error()
    }

    /// Returns `true` for a completed exchange with a 2xx status code.
    pub fn is_successful(&self) -> bool {
        self.response_status == ResponseStatus::Completed
            && (200..300).contains(&self.status_code)
    }

    /// Body decoded as UTF-8.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the first header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the captured error, if any.
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_deref()
    }

    /// Returns `true` if the response failed because the token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.error(), Some(ApiError::Client(ClientError::Cancelled)))
    }
}

/// A [`RestResponse`] together with its deserialized payload.
#[derive(Debug, Clone)]
pub struct TypedResponse<T> {
    response: RestResponse,
    data: Option<T>,
}

impl<T> TypedResponse<T> {
    pub(crate) fn new(response: RestResponse, data: Option<T>) -> Self {
        Self { response, data }
    }

    /// Returns the underlying untyped response.
    pub fn response(&self) -> &RestResponse {
        &self.response
    }

    /// Returns the deserialized payload, if deserialization ran and succeeded.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Consumes the response and returns the payload.
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// Splits into the untyped response and the payload.
    pub fn into_parts(self) -> (RestResponse, Option<T>) {
        (self.response, self.data)
    }

    /// Shorthand for `self.response().is_error()`.
    pub fn is_error(&self) -> bool {
        self.response.is_error()
    }

    /// Shorthand for `self.response().status_code`.
    pub fn status_code(&self) -> u16 {
        self.response.status_code
    }
}
