//! Content-type driven response deserialization.
//!
//! A [`Deserializer`] turns raw response bytes into a [`serde_json::Value`],
//! guided by per-request [`DeserializeHints`]. The client then converts that
//! value into the caller's target type. Handlers are looked up by media type
//! in a [`DeserializerRegistry`].
//!
//! ## Examples
//!
//! ```rust
//! use rest_client::deserializer::{DeserializeHints, Deserializer, JsonDeserializer};
//!
//! let hints = DeserializeHints {
//!     root_element: Some("user".to_string()),
//!     ..Default::default()
//! };
//! let value = JsonDeserializer
//!     .deserialize(br#"{"user": {"id": 7}}"#, &hints)
//!     .unwrap();
//! assert_eq!(value["id"], 7);
//! ```

mod json;
mod registry;
mod scalars;
mod xml;
mod yaml;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

pub use json::JsonDeserializer;
pub use registry::{media_type, DeserializerRegistry, WILDCARD};
pub(crate) use scalars::from_text_value;
pub use xml::XmlDeserializer;
pub use yaml::YamlDeserializer;

use crate::error::ValidationError;

/// Shape hints taken from the request and passed to the handler on each call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeserializeHints {
    /// Element or member the payload is read from.
    pub root_element: Option<String>,
    /// chrono format string dates in the payload are written in.
    pub date_format: Option<String>,
    /// XML namespace URI elements must belong to.
    pub namespace: Option<String>,
}

/// A capability that turns response content into a structured value.
///
/// Implementations must be thread-safe: one handler instance serves every
/// in-flight execution of the client it is registered on.
pub trait Deserializer: Send + Sync {
    /// Parses `content` into a value, honoring `hints`.
    ///
    /// ## Errors
    ///
    /// Returns a [`ValidationError`] if the content is malformed or the
    /// requested root element does not exist.
    fn deserialize(&self, content: &[u8], hints: &DeserializeHints)
        -> Result<Value, ValidationError>;

    /// Returns `true` if every scalar leaf comes out as a string, so numbers
    /// and bools in the target type have to be parsed from text.
    fn text_scalars(&self) -> bool {
        false
    }
}

impl<F> Deserializer for F
where
    F: Fn(&[u8], &DeserializeHints) -> Result<Value, ValidationError> + Send + Sync,
{
    fn deserialize(
        &self,
        content: &[u8],
        hints: &DeserializeHints,
    ) -> Result<Value, ValidationError> {
        self(content, hints)
    }
}

/// Applies the root-element and date-format hints to an already parsed tree.
pub(crate) fn apply_hints(value: Value, hints: &DeserializeHints) -> Result<Value, ValidationError> {
    let mut value = match hints.root_element.as_deref() {
        Some(name) => find_member(value, name).ok_or_else(|| ValidationError::MissingRootElement {
            name: name.to_string(),
        })?,
        None => value,
    };
    if let Some(format) = hints.date_format.as_deref() {
        normalize_dates(&mut value, format);
    }
    Ok(value)
}

/// Depth-first search for the first object member called `name`.
pub(crate) fn find_member(value: Value, name: &str) -> Option<Value> {
    match value {
        Value::Object(mut map) => {
            if let Some(found) = map.remove(name) {
                return Some(found);
            }
            map.into_iter().find_map(|(_, child)| find_member(child, name))
        }
        Value::Array(items) => items.into_iter().find_map(|child| find_member(child, name)),
        _ => None,
    }
}

/// Rewrites every string leaf that parses under `format` to ISO-8601.
///
/// Formats with an offset yield RFC 3339, naive date-times yield
/// `%Y-%m-%dT%H:%M:%S%.f` and plain dates yield `%Y-%m-%d`, which are the
/// forms chrono's serde support reads back.
pub(crate) fn normalize_dates(value: &mut Value, format: &str) {
    match value {
        Value::String(text) => {
            if let Some(iso) = reformat_date(text, format) {
                *text = iso;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| normalize_dates(v, format)),
        Value::Object(map) => map.values_mut().for_each(|v| normalize_dates(v, format)),
        _ => {}
    }
}

fn reformat_date(text: &str, format: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.to_rfc3339());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}
