//! HTTP verbs and the transport call shape each one maps to.

use strum::{Display, EnumIter, EnumString};

/// The semantic HTTP method of a [`RestRequest`](crate::RestRequest).
///
/// ## Examples
///
/// ```rust
/// use rest_client::{CallShape, RestMethod};
///
/// assert_eq!(RestMethod::Patch.call_shape(), CallShape::Post);
/// assert_eq!(RestMethod::Delete.call_shape(), CallShape::Get);
///
/// let parsed: RestMethod = "PUT".parse().unwrap();
/// assert_eq!(parsed, RestMethod::Put);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum RestMethod {
    /// HTTP GET - Retrieve a resource.
    #[default]
    Get,
    /// HTTP POST - Create a resource or trigger an action.
    Post,
    /// HTTP PUT - Replace a resource entirely.
    Put,
    /// HTTP PATCH - Partially update a resource.
    Patch,
    /// HTTP DELETE - Remove a resource.
    Delete,
    /// HTTP HEAD - Retrieve headers only.
    Head,
    /// HTTP OPTIONS - Query supported methods.
    Options,
    /// HTTP TRACE - Echo the request for debugging.
    Trace,
}

/// The two ways a transport can issue a request.
///
/// Body-bearing verbs go through the POST-style path, which is responsible
/// for serializing form fields, files and request bodies. Everything else
/// goes through the GET-style path, which never writes a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CallShape {
    /// No outgoing body; `GetOrPost` parameters travel in the query string.
    Get,
    /// Body-bearing; `GetOrPost` parameters become form fields.
    Post,
}

impl RestMethod {
    /// Returns `true` if this method carries a request body.
    ///
    /// POST, PUT, and PATCH carry bodies. Other methods do not.
    pub fn has_body(&self) -> bool {
        matches!(self, Self::Post | Self::Put | Self::Patch)
    }

    /// Returns the transport call shape used for this verb.
    pub fn call_shape(&self) -> CallShape {
        if self.has_body() {
            CallShape::Post
        } else {
            CallShape::Get
        }
    }

    /// Converts to the equivalent `reqwest::Method`.
    pub fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
            Self::Trace => reqwest::Method::TRACE,
        }
    }
}

impl From<RestMethod> for reqwest::Method {
    fn from(method: RestMethod) -> Self {
        method.to_reqwest()
    }
}
