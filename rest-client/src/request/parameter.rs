//! Request parameters and the role each one plays on the wire.

use std::borrow::Cow;

use bytes::Bytes;
use strum::Display;

/// The role a [`Parameter`] plays when the request is converted for transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ParameterKind {
    /// Query-string pair for GET-style calls, form field for POST-style calls.
    ///
    /// When a POST-style request also carries a body, these move to the
    /// query string so the body is left untouched.
    GetOrPost,
    /// Always appended to the query string, whatever the verb.
    QueryString,
    /// Replaces the `{name}` placeholder in the resource path.
    UrlSegment,
    /// An HTTP request header.
    HttpHeader,
    /// A cookie sent in the `Cookie` header.
    Cookie,
    /// The request body. The parameter's name is the body's content type.
    RequestBody,
    /// A multipart file attachment.
    File,
}

/// The value carried by a [`Parameter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes, sent as-is for bodies and files.
    Binary(Bytes),
}

impl ParameterValue {
    /// Returns the value as text, replacing invalid UTF-8 in binary values.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Binary(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    /// Returns the value as bytes.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            Self::Binary(bytes) => bytes.clone(),
        }
    }

    /// Returns `true` for [`ParameterValue::Binary`].
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Binary(_))
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<u8>> for ParameterValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(value))
    }
}

impl From<Bytes> for ParameterValue {
    fn from(value: Bytes) -> Self {
        Self::Binary(value)
    }
}

/// A single named request parameter.
///
/// ## Examples
///
/// ```rust
/// use rest_client::{Parameter, ParameterKind};
///
/// let header = Parameter::header("X-Trace", "abc");
/// assert_eq!(header.kind, ParameterKind::HttpHeader);
///
/// let body = Parameter::body("application/json", r#"{"id":1}"#);
/// assert_eq!(body.name, "application/json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name (the content type, for body parameters).
    pub name: String,
    /// Parameter value.
    pub value: ParameterValue,
    /// How the parameter is placed on the wire.
    pub kind: ParameterKind,
    /// File name reported in the multipart part; only used by [`ParameterKind::File`].
    pub file_name: Option<String>,
    /// Content type of a file part; only used by [`ParameterKind::File`].
    pub content_type: Option<String>,
}

impl Parameter {
    /// Creates a parameter of the given kind.
    pub fn new(
        name: impl Into<String>,
        value: impl Into<ParameterValue>,
        kind: ParameterKind,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            file_name: None,
            content_type: None,
        }
    }

    /// Creates a query/form parameter.
    pub fn get_or_post(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(name, value, ParameterKind::GetOrPost)
    }

    /// Creates a parameter that always goes to the query string.
    pub fn query(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(name, value, ParameterKind::QueryString)
    }

    /// Creates a URL segment substitution for `{name}`.
    pub fn url_segment(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(name, value, ParameterKind::UrlSegment)
    }

    /// Creates an HTTP header.
    pub fn header(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(name, value, ParameterKind::HttpHeader)
    }

    /// Creates a cookie.
    pub fn cookie(name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(name, value, ParameterKind::Cookie)
    }

    /// Creates a request body tagged with its content type.
    pub fn body(content_type: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::new(content_type, value, ParameterKind::RequestBody)
    }

    /// Creates a multipart file attachment.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::Binary(bytes.into()),
            kind: ParameterKind::File,
            file_name: Some(file_name.into()),
            content_type,
        }
    }

    /// Returns `true` if `other` addresses the same slot on the wire.
    ///
    /// Kinds must match. Header names compare ASCII-case-insensitively, all
    /// other names compare exactly.
    pub fn collides_with(&self, other: &Parameter) -> bool {
        if self.kind != other.kind {
            return false;
        }
        match self.kind {
            ParameterKind::HttpHeader => self.name.eq_ignore_ascii_case(&other.name),
            _ => self.name == other.name,
        }
    }
}
