//! Response deserialization errors.

use thiserror::Error;

/// Errors while selecting or running a deserializer.
///
/// These are captured into the typed response; the raw response fields stay
/// intact so the caller can inspect what the server actually sent.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// YAML parsing failed.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// XML parsing failed.
    #[error("XML parse error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    /// A request body could not be written as XML.
    #[error("XML serialize error: {0}")]
    XmlSerialize(#[from] quick_xml::SeError),

    /// Empty response body when content was expected.
    #[error("Empty response body")]
    EmptyBody,

    /// No handler is registered for the content type and there is no wildcard.
    #[error("No deserializer registered for content type '{content_type}'")]
    NoDeserializer {
        /// The normalized media type that was looked up.
        content_type: String,
    },

    /// The configured root element does not occur in the payload.
    #[error("Root element '{name}' not found in response")]
    MissingRootElement {
        /// The root element hint taken from the request.
        name: String,
    },

    /// The parsed payload does not have the shape of the target type.
    #[error("Response does not match target type: {0}")]
    TypeMismatch(#[source] serde_json::Error),

    /// A custom deserializer failed.
    #[error("{0}")]
    Custom(String),
}
