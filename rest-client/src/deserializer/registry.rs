//! Media type to handler mapping.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Deserializer;

/// Content type that matches anything without a dedicated handler.
pub const WILDCARD: &str = "*";

/// Normalizes a `Content-Type` value to its bare media type.
///
/// Parameters such as `; charset=utf-8` are dropped, surrounding whitespace
/// is trimmed and the result is lowercased.
///
/// ## Examples
///
/// ```rust
/// use rest_client::deserializer::media_type;
///
/// assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
/// assert_eq!(media_type(""), "");
/// ```
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Handlers keyed by media type, plus the accepted types in registration order.
///
/// The registry is a plain value; the client keeps it inside its options
/// snapshot, so concurrent readers never observe a half-applied change.
#[derive(Clone, Default)]
pub struct DeserializerRegistry {
    handlers: HashMap<String, Arc<dyn Deserializer>>,
    accepted: Vec<String>,
}

impl DeserializerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `content_type`, replacing any previous handler.
    ///
    /// Non-wildcard types are appended to the accepted list the first time
    /// they are registered; re-registering keeps the original position.
    pub fn register(&mut self, content_type: &str, handler: Arc<dyn Deserializer>) {
        let key = media_type(content_type);
        if key != WILDCARD && !self.accepted.contains(&key) {
            self.accepted.push(key.clone());
        }
        self.handlers.insert(key, handler);
    }

    /// Removes the handler for `content_type`. Returns `true` if one was registered.
    pub fn unregister(&mut self, content_type: &str) -> bool {
        let key = media_type(content_type);
        self.accepted.retain(|accepted| accepted != &key);
        self.handlers.remove(&key).is_some()
    }

    /// Removes every handler, the wildcard included.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.accepted.clear();
    }

    /// Finds the handler for `content_type`.
    ///
    /// Falls back to the wildcard handler when the media type is empty or
    /// unmapped. Returns `None` when neither exists.
    pub fn lookup(&self, content_type: &str) -> Option<Arc<dyn Deserializer>> {
        let key = media_type(content_type);
        self.handlers
            .get(&key)
            .or_else(|| self.handlers.get(WILDCARD))
            .cloned()
    }

    /// Registered non-wildcard media types, in registration order.
    pub fn accepted_types(&self) -> &[String] {
        &self.accepted
    }

    /// Value advertised in the `Accept` header, or `None` when nothing is registered.
    pub fn accept_header(&self) -> Option<String> {
        if self.accepted.is_empty() {
            None
        } else {
            Some(self.accepted.join(", "))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for DeserializerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("DeserializerRegistry")
            .field("handlers", &keys)
            .field("accepted", &self.accepted)
            .finish()
    }
}
