//! Client-level configuration shared by every execution.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use url::Url;

use crate::auth::Authenticator;
use crate::deserializer::{
    Deserializer, DeserializerRegistry, JsonDeserializer, XmlDeserializer, YamlDeserializer,
    WILDCARD,
};
use crate::request::{Parameter, ParameterKind};

const JSON_TYPES: [&str; 4] = [
    "application/json",
    "text/json",
    "text/x-json",
    "text/javascript",
];
const XML_TYPES: [&str; 2] = ["application/xml", "text/xml"];
const YAML_TYPES: [&str; 3] = ["application/yaml", "application/x-yaml", "text/yaml"];

/// Everything a client applies to the requests it executes.
///
/// A [`RestClient`](crate::RestClient) keeps its options behind an `Arc` and
/// hands each execution an immutable snapshot; setters on the client swap in
/// a modified copy. The fields that have invariants (base URL, default
/// parameters and handlers) are reached through methods.
#[derive(Clone)]
pub struct ClientOptions {
    base_url: String,
    default_parameters: Vec<Parameter>,
    deserializers: DeserializerRegistry,
    /// Applied when the request has no timeout of its own.
    pub timeout: Option<Duration>,
    pub max_redirects: Option<usize>,
    pub follow_redirects: bool,
    pub proxy: Option<Url>,
    pub cookie_jar: Option<Arc<Jar>>,
    /// Overrides the default user agent.
    pub user_agent: Option<String>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            default_parameters: Vec::new(),
            deserializers: DeserializerRegistry::new(),
            timeout: None,
            max_redirects: None,
            follow_redirects: true,
            proxy: None,
            cookie_jar: None,
            user_agent: None,
            authenticator: None,
        }
    }
}

impl ClientOptions {
    /// Options with the built-in JSON, XML and YAML handlers registered.
    pub fn with_default_handlers() -> Self {
        let mut options = Self::default();
        options.register_default_handlers();
        options
    }

    pub(crate) fn register_default_handlers(&mut self) {
        let json: Arc<dyn Deserializer> = Arc::new(JsonDeserializer);
        let xml: Arc<dyn Deserializer> = Arc::new(XmlDeserializer);
        let yaml: Arc<dyn Deserializer> = Arc::new(YamlDeserializer);

        for content_type in JSON_TYPES {
            self.deserializers.register(content_type, Arc::clone(&json));
        }
        for content_type in XML_TYPES {
            self.deserializers.register(content_type, Arc::clone(&xml));
        }
        for content_type in YAML_TYPES {
            self.deserializers.register(content_type, Arc::clone(&yaml));
        }
        self.deserializers.register(WILDCARD, json);
        self.sync_accept();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets the base URL, dropping trailing slashes.
    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    pub fn default_parameters(&self) -> &[Parameter] {
        &self.default_parameters
    }

    /// Adds a parameter sent with every request, replacing a colliding one.
    pub fn add_default_parameter(&mut self, parameter: Parameter) {
        self.default_parameters
            .retain(|existing| !existing.collides_with(&parameter));
        self.default_parameters.push(parameter);
    }

    /// Removes the default parameter with this name and kind.
    pub fn remove_default_parameter(&mut self, name: &str, kind: ParameterKind) -> bool {
        let key = Parameter::new(name, "", kind);
        let before = self.default_parameters.len();
        self.default_parameters.retain(|p| !p.collides_with(&key));
        before != self.default_parameters.len()
    }

    pub fn deserializers(&self) -> &DeserializerRegistry {
        &self.deserializers
    }

    /// Registers a handler and refreshes the `Accept` default header.
    pub fn add_handler(&mut self, content_type: &str, handler: Arc<dyn Deserializer>) {
        self.deserializers.register(content_type, handler);
        self.sync_accept();
    }

    pub fn remove_handler(&mut self, content_type: &str) -> bool {
        let removed = self.deserializers.unregister(content_type);
        self.sync_accept();
        removed
    }

    pub fn clear_handlers(&mut self) {
        self.deserializers.clear();
        self.sync_accept();
    }

    /// Keeps the `Accept` default header equal to the registered media types.
    fn sync_accept(&mut self) {
        let accept = Parameter::header("Accept", "");
        self.default_parameters.retain(|p| !p.collides_with(&accept));
        if let Some(value) = self.deserializers.accept_header() {
            self.default_parameters
                .push(Parameter::header("Accept", value));
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("base_url", &self.base_url)
            .field("default_parameters", &self.default_parameters)
            .field("deserializers", &self.deserializers)
            .field("timeout", &self.timeout)
            .field("max_redirects", &self.max_redirects)
            .field("follow_redirects", &self.follow_redirects)
            .field("proxy", &self.proxy)
            .field("cookie_jar", &self.cookie_jar.is_some())
            .field("user_agent", &self.user_agent)
            .field("authenticator", &self.authenticator.is_some())
            .finish()
    }
}
