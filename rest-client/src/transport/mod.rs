//! Wire-level request and response objects and the transport capability.
//!
//! A [`TransportRequest`] is built fresh for every execution from a
//! [`RestRequest`](crate::RestRequest) plus the client options, handed to a
//! [`Transport`] and dropped once the call returns. The transport answers with
//! a [`TransportResponse`] which is copied field by field into a
//! [`RestResponse`](crate::RestResponse).

mod http;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::cookie::Jar;
use url::Url;

pub use http::HttpTransport;

use crate::error::ApiError;
use crate::method::RestMethod;
use crate::request::Credentials;
use crate::response::{ResponseCookie, ResponseStatus};

/// Payload of a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyContent {
    Text(String),
    Binary(Bytes),
}

impl BodyContent {
    pub fn into_bytes(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Binary(bytes) => bytes,
        }
    }
}

/// A request body tagged with its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: String,
    pub content: BodyContent,
}

/// One multipart file part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFile {
    /// Form field name.
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A fully resolved request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Absolute URL, query string included.
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    /// Form fields; only sent by POST-style calls.
    pub form: Vec<(String, String)>,
    pub files: Vec<TransportFile>,
    pub body: Option<RequestBody>,
    pub credentials: Option<Credentials>,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub follow_redirects: bool,
    pub max_redirects: Option<usize>,
    pub proxy: Option<Url>,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl TransportRequest {
    /// Creates a request for `url` with everything else empty.
    pub fn new(url: Url, user_agent: impl Into<String>) -> Self {
        Self {
            url,
            headers: Vec::new(),
            cookies: Vec::new(),
            form: Vec::new(),
            files: Vec::new(),
            body: None,
            credentials: None,
            user_agent: user_agent.into(),
            timeout: None,
            follow_redirects: true,
            max_redirects: None,
            proxy: None,
            cookie_jar: None,
        }
    }

    /// Returns the first header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What the transport observed. Mirrors [`RestResponse`](crate::RestResponse).
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub content: String,
    pub content_encoding: Option<String>,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    pub response_status: ResponseStatus,
    pub error_message: Option<String>,
    pub error: Option<Arc<ApiError>>,
    pub raw_bytes: Bytes,
    pub status_code: u16,
    pub status_description: String,
    pub response_uri: Option<Url>,
    pub server: Option<String>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<ResponseCookie>,
}

/// The capability that puts a [`TransportRequest`] on the wire.
///
/// There are exactly two call shapes. The GET-style call never writes a body;
/// the POST-style call serializes form fields, files or the body. The verb is
/// passed separately so a transport can issue e.g. a DELETE through the
/// GET-style path.
pub trait Transport: Send + Sync {
    /// Issues a body-less call.
    fn execute_get(
        &self,
        method: RestMethod,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send;

    /// Issues a body-bearing call.
    fn execute_post(
        &self,
        method: RestMethod,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute_get(
        &self,
        method: RestMethod,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send {
        (**self).execute_get(method, request)
    }

    fn execute_post(
        &self,
        method: RestMethod,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, ApiError>> + Send {
        (**self).execute_post(method, request)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory transport for pipeline tests.

    use std::sync::Mutex;

    use super::*;
    use crate::error::ClientError;
    use crate::method::CallShape;

    type Failure = Box<dyn Fn() -> ApiError + Send + Sync>;

    enum Reply {
        Respond(TransportResponse),
        Fail(Failure),
    }

    /// One recorded call.
    #[derive(Debug, Clone)]
    pub(crate) struct Call {
        pub shape: CallShape,
        pub method: RestMethod,
        pub request: TransportRequest,
    }

    /// Records every call and answers with a canned reply.
    pub(crate) struct RecordingTransport {
        reply: Reply,
        delay: Option<Duration>,
        calls: Mutex<Vec<Call>>,
    }

    impl RecordingTransport {
        /// Replies with `response` to every call.
        pub(crate) fn respond(response: TransportResponse) -> Self {
            Self {
                reply: Reply::Respond(response),
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// A 200 response with `body` and the given content type.
        pub(crate) fn ok(content_type: &str, body: &str) -> Self {
            Self::respond(TransportResponse {
                content: body.to_string(),
                content_type: Some(content_type.to_string()),
                content_length: Some(body.len() as u64),
                raw_bytes: Bytes::copy_from_slice(body.as_bytes()),
                status_code: 200,
                status_description: "OK".to_string(),
                response_status: ResponseStatus::Completed,
                ..Default::default()
            })
        }

        /// Fails every call with a transport error carrying `message`.
        pub(crate) fn failing(message: &'static str) -> Self {
            Self::failing_with(move || ClientError::Transport(message.to_string()).into())
        }

        /// Fails every call with the error built by `make`.
        pub(crate) fn failing_with(make: impl Fn() -> ApiError + Send + Sync + 'static) -> Self {
            Self {
                reply: Reply::Fail(Box::new(make)),
                delay: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Sleeps for `delay` before replying.
        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        async fn record(
            &self,
            shape: CallShape,
            method: RestMethod,
            request: TransportRequest,
        ) -> Result<TransportResponse, ApiError> {
            self.calls.lock().unwrap().push(Call {
                shape,
                method,
                request,
            });
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.reply {
                Reply::Respond(response) => Ok(response.clone()),
                Reply::Fail(make) => Err(make()),
            }
        }
    }

    impl Transport for RecordingTransport {
        async fn execute_get(
            &self,
            method: RestMethod,
            request: TransportRequest,
        ) -> Result<TransportResponse, ApiError> {
            self.record(CallShape::Get, method, request).await
        }

        async fn execute_post(
            &self,
            method: RestMethod,
            request: TransportRequest,
        ) -> Result<TransportResponse, ApiError> {
            self.record(CallShape::Post, method, request).await
        }
    }
}
