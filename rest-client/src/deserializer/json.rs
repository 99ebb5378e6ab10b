//! JSON handler.

use serde_json::Value;

use super::{apply_hints, DeserializeHints, Deserializer};
use crate::error::ValidationError;

/// Parses JSON with `serde_json`.
///
/// An empty body is read as `null`, so `Option<T>` and `()` targets succeed
/// on `204 No Content` responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeserializer;

impl Deserializer for JsonDeserializer {
    fn deserialize(
        &self,
        content: &[u8],
        hints: &DeserializeHints,
    ) -> Result<Value, ValidationError> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        let value: Value = serde_json::from_slice(content)?;
        apply_hints(value, hints)
    }
}
