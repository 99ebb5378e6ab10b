//! The declarative request model.
//!
//! A [`RestRequest`] describes *what* to call: verb, resource path, and an
//! ordered list of [`Parameter`]s tagged with the role they play on the wire.
//! The client turns it into a transport request at execution time and never
//! keeps it beyond one call.

mod parameter;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

pub use parameter::{Parameter, ParameterKind, ParameterValue};

use crate::deserializer::DeserializeHints;
use crate::error::ValidationError;
use crate::method::RestMethod;
use crate::response::RestResponse;

/// Hook run on the raw response before it is deserialized.
pub type DeserializationHook = Arc<dyn Fn(&mut RestResponse) + Send + Sync>;

/// Username and password for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// The user name.
    pub username: String,
    /// The password, if any.
    pub password: Option<String>,
}

impl Credentials {
    /// Creates credentials with a password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A declarative REST request.
///
/// ## Examples
///
/// ```rust
/// use rest_client::{RestMethod, RestRequest};
///
/// let request = RestRequest::new("users/{id}")
///     .with_method(RestMethod::Delete)
///     .with_url_segment("id", "42")
///     .with_header("X-Request-Id", "abc");
///
/// assert_eq!(request.method(), RestMethod::Delete);
/// assert_eq!(request.parameters().len(), 2);
/// assert_eq!(request.attempts(), 0);
/// ```
pub struct RestRequest {
    method: RestMethod,
    resource: String,
    parameters: Vec<Parameter>,
    timeout: Option<Duration>,
    hints: DeserializeHints,
    credentials: Option<Credentials>,
    user_agent: Option<String>,
    attempts: AtomicU32,
    before_deserialization: Option<DeserializationHook>,
}

impl RestRequest {
    /// Creates a GET request for the given resource path.
    ///
    /// The resource may contain `{name}` placeholders filled by
    /// [`ParameterKind::UrlSegment`] parameters, or be an absolute URL.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            method: RestMethod::Get,
            resource: resource.into(),
            parameters: Vec::new(),
            timeout: None,
            hints: DeserializeHints::default(),
            credentials: None,
            user_agent: None,
            attempts: AtomicU32::new(0),
            before_deserialization: None,
        }
    }

    /// Sets the verb.
    pub fn with_method(mut self, method: RestMethod) -> Self {
        self.method = method;
        self
    }

    /// Appends a parameter.
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Appends a parameter in place.
    pub fn add_parameter(&mut self, parameter: Parameter) {
        self.parameters.push(parameter);
    }

    /// Appends a query/form parameter.
    pub fn with_get_or_post(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_parameter(Parameter::get_or_post(name, value.into()))
    }

    /// Appends a query-string parameter.
    pub fn with_query(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_parameter(Parameter::query(name, value.into()))
    }

    /// Appends a URL segment substitution.
    pub fn with_url_segment(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_parameter(Parameter::url_segment(name, value.into()))
    }

    /// Appends a header.
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_parameter(Parameter::header(name, value.into()))
    }

    /// Appends a cookie.
    pub fn with_cookie(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_parameter(Parameter::cookie(name, value.into()))
    }

    /// Sets the body, replacing any previous body parameter.
    pub fn with_body(
        mut self,
        content_type: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        self.parameters
            .retain(|p| p.kind != ParameterKind::RequestBody);
        self.with_parameter(Parameter::body(content_type, value))
    }

    /// Serializes `value` as the JSON body.
    ///
    /// ## Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn with_json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ValidationError> {
        let json = serde_json::to_string(value)?;
        Ok(self.with_body("application/json", json))
    }

    /// Serializes `value` as the XML body.
    ///
    /// ## Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn with_xml_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ValidationError> {
        let xml = quick_xml::se::to_string(value)?;
        Ok(self.with_body("application/xml", xml))
    }

    /// Appends a file attachment, sent as `multipart/form-data`.
    pub fn with_file(
        self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<bytes::Bytes>,
        content_type: Option<String>,
    ) -> Self {
        self.with_parameter(Parameter::file(name, file_name, bytes, content_type))
    }

    /// Overrides the client timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the client user agent for this request.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets basic-auth credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Selects the element or member the payload is read from.
    pub fn with_root_element(mut self, root_element: impl Into<String>) -> Self {
        self.hints.root_element = Some(root_element.into());
        self
    }

    /// Sets the chrono format that dates in the payload are written in.
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.hints.date_format = Some(date_format.into());
        self
    }

    /// Restricts XML deserialization to elements in this namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.hints.namespace = Some(namespace.into());
        self
    }

    /// Registers a hook that sees the raw response before it is deserialized.
    pub fn on_before_deserialization<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RestResponse) + Send + Sync + 'static,
    {
        self.before_deserialization = Some(Arc::new(hook));
        self
    }

    pub fn method(&self) -> RestMethod {
        self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns the deserialization hints handed to the selected handler.
    pub fn hints(&self) -> &DeserializeHints {
        &self.hints
    }

    pub(crate) fn before_deserialization(&self) -> Option<&DeserializationHook> {
        self.before_deserialization.as_ref()
    }

    /// Number of times this request completed a transport call.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Bumps the attempt counter and returns the new count.
    pub(crate) fn record_attempt(&self) -> u32 {
        self.attempts.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Clone for RestRequest {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            resource: self.resource.clone(),
            parameters: self.parameters.clone(),
            timeout: self.timeout,
            hints: self.hints.clone(),
            credentials: self.credentials.clone(),
            user_agent: self.user_agent.clone(),
            attempts: AtomicU32::new(self.attempts()),
            before_deserialization: self.before_deserialization.clone(),
        }
    }
}

impl fmt::Debug for RestRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestRequest")
            .field("method", &self.method)
            .field("resource", &self.resource)
            .field("parameters", &self.parameters)
            .field("timeout", &self.timeout)
            .field("hints", &self.hints)
            .field("credentials", &self.credentials)
            .field("user_agent", &self.user_agent)
            .field("attempts", &self.attempts())
            .field(
                "before_deserialization",
                &self.before_deserialization.as_ref().map(|_| "<hook>"),
            )
            .finish()
    }
}
