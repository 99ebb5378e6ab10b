//! YAML handler.

use serde_json::Value;

use super::{apply_hints, DeserializeHints, Deserializer};
use crate::error::ValidationError;

/// Parses YAML with `serde_yaml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDeserializer;

impl Deserializer for YamlDeserializer {
    fn deserialize(
        &self,
        content: &[u8],
        hints: &DeserializeHints,
    ) -> Result<Value, ValidationError> {
        let value: Value = serde_yaml::from_slice(content)?;
        apply_hints(value, hints)
    }
}
