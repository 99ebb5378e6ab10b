//! Request execution with tracing instrumentation.
//!
//! This module provides the [`RestClient`] struct, which runs the full
//! pipeline: snapshot the options, convert, authenticate, dispatch, convert
//! back and, for typed calls, deserialize.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use bytes::Bytes;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn, Span};
use url::Url;

use super::ClientOptions;
use crate::auth::Authenticator;
use crate::convert::{self, effective_user_agent};
use crate::deserializer::{from_text_value, media_type, Deserializer, DeserializerRegistry};
use crate::dispatch::dispatch;
use crate::error::{ApiError, ClientError, ConfigError, ValidationError};
use crate::method::RestMethod;
use crate::request::{Parameter, ParameterKind, RestRequest};
use crate::response::{RestResponse, TypedResponse};
use crate::transport::{HttpTransport, Transport, TransportResponse};

/// Builder for configuring a [`RestClient`].
pub struct RestClientBuilder {
    options: ClientOptions,
    default_handlers: bool,
    handlers: Vec<(String, Arc<dyn Deserializer>)>,
}

impl RestClientBuilder {
    fn new() -> Self {
        Self {
            options: ClientOptions::default(),
            default_handlers: true,
            handlers: Vec::new(),
        }
    }

    /// Sets the base URL relative resources are resolved against.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use rest_client::RestClient;
    ///
    /// let client = RestClient::builder()
    ///     .base_url("https://api.example.com/v1/")
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(client.base_url(), "https://api.example.com/v1");
    /// ```
    pub fn base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.options.set_base_url(base_url.as_ref());
        self
    }

    /// Adds a parameter sent with every request.
    pub fn default_parameter(mut self, parameter: Parameter) -> Self {
        self.options.add_default_parameter(parameter);
        self
    }

    /// Adds a header sent with every request.
    pub fn default_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_parameter(Parameter::header(name, value.into()))
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.options.max_redirects = Some(max_redirects);
        self
    }

    pub fn follow_redirects(mut self, follow_redirects: bool) -> Self {
        self.options.follow_redirects = follow_redirects;
        self
    }

    pub fn proxy(mut self, proxy: Url) -> Self {
        self.options.proxy = Some(proxy);
        self
    }

    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.options.cookie_jar = Some(jar);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the authenticator applied to every request.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use rest_client::{ApiAuthMethod, ApiKeyAuthenticator, RestClient};
    ///
    /// let client = RestClient::builder()
    ///     .base_url("https://api.example.com")
    ///     .authenticator(ApiKeyAuthenticator::new(ApiAuthMethod::BearerToken, "sk-xxx"))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.options.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Registers a handler, after the built-in ones.
    pub fn handler(
        mut self,
        content_type: impl Into<String>,
        handler: impl Deserializer + 'static,
    ) -> Self {
        self.handlers.push((content_type.into(), Arc::new(handler)));
        self
    }

    /// Skips the built-in JSON, XML and YAML handlers.
    pub fn without_default_handlers(mut self) -> Self {
        self.default_handlers = false;
        self
    }

    /// Builds a client on the default `reqwest` transport.
    ///
    /// ## Errors
    ///
    /// Returns an error if the base URL is set but does not parse.
    pub fn build(self) -> Result<RestClient<HttpTransport>, ApiError> {
        self.build_with_transport(HttpTransport::new())
    }

    /// Builds a client on a custom transport.
    ///
    /// ## Errors
    ///
    /// Returns an error if the base URL is set but does not parse.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<RestClient<T>, ApiError> {
        let mut options = self.options;
        if !options.base_url().is_empty() {
            Url::parse(options.base_url()).map_err(ConfigError::from)?;
        }
        let configured = options.default_parameters().to_vec();
        if self.default_handlers {
            options.register_default_handlers();
        }
        for (content_type, handler) in self.handlers {
            options.add_handler(&content_type, handler);
        }
        // A configured `Accept` outranks the one synthesized from the handlers.
        for parameter in configured {
            options.add_default_parameter(parameter);
        }

        Ok(RestClient {
            transport,
            options: RwLock::new(Arc::new(options)),
        })
    }
}

/// Async REST client.
///
/// Executes [`RestRequest`]s over a [`Transport`] and turns the result into a
/// [`RestResponse`] or [`TypedResponse`]. Execution never fails: errors are
/// captured into the response.
///
/// Configuration may change while requests are in flight. Each execution
/// works on the options as they were when it started.
///
/// ## Examples
///
/// ```rust,no_run
/// use rest_client::{RestClient, RestRequest};
///
/// #[derive(serde::Deserialize)]
/// struct User { id: u64, name: String }
///
/// # async fn run() -> Result<(), rest_client::ApiError> {
/// let client = RestClient::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let request = RestRequest::new("users/{id}").with_url_segment("id", "1");
/// let response = client.execute_as::<User>(&request).await;
/// if let Some(user) = response.data() {
///     println!("User: {}", user.name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct RestClient<T: Transport = HttpTransport> {
    transport: T,
    options: RwLock<Arc<ClientOptions>>,
}

impl RestClient<HttpTransport> {
    /// Creates a new builder for configuring a client.
    pub fn builder() -> RestClientBuilder {
        RestClientBuilder::new()
    }
}

impl<T: Transport> RestClient<T> {
    /// Returns the transport requests are sent through.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The options a request started now would use.
    pub fn options(&self) -> Arc<ClientOptions> {
        Arc::clone(&self.options.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update<R>(&self, change: impl FnOnce(&mut ClientOptions) -> R) -> R {
        let mut options = self.options.write().unwrap_or_else(PoisonError::into_inner);
        change(Arc::make_mut(&mut options))
    }

    // Untyped execution

    /// Executes `request` with its own verb.
    pub async fn execute(&self, request: &RestRequest) -> RestResponse {
        self.execute_with_token(request, &CancellationToken::new())
            .await
    }

    /// Executes `request` with its own verb; cancelling `token` aborts the call.
    pub async fn execute_with_token(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> RestResponse {
        let options = self.options();
        self.run(&options, request, request.method(), token).await
    }

    /// Executes `request` as a GET, whatever its verb.
    pub async fn get(&self, request: &RestRequest) -> RestResponse {
        self.get_with_token(request, &CancellationToken::new()).await
    }

    pub async fn get_with_token(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> RestResponse {
        let options = self.options();
        self.run(&options, request, RestMethod::Get, token).await
    }

    /// Executes `request` as a POST, whatever its verb.
    pub async fn post(&self, request: &RestRequest) -> RestResponse {
        self.post_with_token(request, &CancellationToken::new())
            .await
    }

    pub async fn post_with_token(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> RestResponse {
        let options = self.options();
        self.run(&options, request, RestMethod::Post, token).await
    }

    // Typed execution

    /// Executes `request` and deserializes the body into `R`.
    pub async fn execute_as<R: DeserializeOwned>(&self, request: &RestRequest) -> TypedResponse<R> {
        self.execute_as_with_token(request, &CancellationToken::new())
            .await
    }

    pub async fn execute_as_with_token<R: DeserializeOwned>(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> TypedResponse<R> {
        self.typed(request, request.method(), token).await
    }

    /// Executes `request` as a GET and deserializes the body into `R`.
    pub async fn get_as<R: DeserializeOwned>(&self, request: &RestRequest) -> TypedResponse<R> {
        self.get_as_with_token(request, &CancellationToken::new())
            .await
    }

    pub async fn get_as_with_token<R: DeserializeOwned>(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> TypedResponse<R> {
        self.typed(request, RestMethod::Get, token).await
    }

    /// Executes `request` as a POST and deserializes the body into `R`.
    pub async fn post_as<R: DeserializeOwned>(&self, request: &RestRequest) -> TypedResponse<R> {
        self.post_as_with_token(request, &CancellationToken::new())
            .await
    }

    pub async fn post_as_with_token<R: DeserializeOwned>(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> TypedResponse<R> {
        self.typed(request, RestMethod::Post, token).await
    }

    /// Executes `request` and returns the raw body, or `None` if the call failed.
    pub async fn download_data(&self, request: &RestRequest) -> Option<Bytes> {
        self.download_data_with_token(request, &CancellationToken::new())
            .await
    }

    pub async fn download_data_with_token(
        &self,
        request: &RestRequest,
        token: &CancellationToken,
    ) -> Option<Bytes> {
        let response = self.execute_with_token(request, token).await;
        if response.is_error() {
            None
        } else {
            Some(response.raw_bytes)
        }
    }

    /// Deserializes an already executed response for `request`.
    ///
    /// Runs the request's pre-deserialization hook first. A response that
    /// already carries an error is passed through without data.
    pub fn deserialize<R: DeserializeOwned>(
        &self,
        request: &RestRequest,
        response: RestResponse,
    ) -> TypedResponse<R> {
        let options = self.options();
        deserialize_with(options.deserializers(), request, response)
    }

    async fn typed<R: DeserializeOwned>(
        &self,
        request: &RestRequest,
        method: RestMethod,
        token: &CancellationToken,
    ) -> TypedResponse<R> {
        let options = self.options();
        let response = self.run(&options, request, method, token).await;
        deserialize_with(options.deserializers(), request, response)
    }

    #[instrument(
        name = "rest_request",
        skip(self, options, request, token),
        fields(
            http.method = tracing::field::Empty,
            http.url = tracing::field::Empty,
            http.status_code = tracing::field::Empty,
            http.attempt = tracing::field::Empty,
            otel.kind = "client",
            otel.status_code = tracing::field::Empty,
        )
    )]
    async fn run(
        &self,
        options: &ClientOptions,
        request: &RestRequest,
        method: RestMethod,
        token: &CancellationToken,
    ) -> RestResponse {
        Span::current().record("http.method", method.to_string().as_str());

        match self.exchange(options, request, method, token).await {
            Ok(response) => {
                let attempt = request.record_attempt();
                let status = response.status_code;
                let span = Span::current();
                span.record("http.attempt", attempt);
                span.record("http.status_code", status);
                span.record("otel.status_code", if status >= 500 { "ERROR" } else { "OK" });
                convert::from_transport(response)
            }
            Err(error) => {
                Span::current().record("otel.status_code", "ERROR");
                warn!(error = %error, resource = request.resource(), "request failed");
                RestResponse::from_error(error)
            }
        }
    }

    async fn exchange(
        &self,
        options: &ClientOptions,
        request: &RestRequest,
        method: RestMethod,
        token: &CancellationToken,
    ) -> Result<TransportResponse, ApiError> {
        let mut transport_request = convert::to_transport(options, request, method)?;
        if let Some(authenticator) = &options.authenticator {
            authenticator.authenticate(&mut transport_request)?;
        }
        Span::current().record("http.url", transport_request.url.as_str());

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Cancelled.into()),
            result = dispatch(&self.transport, method, transport_request) => result,
        }
    }

    // Handlers

    /// Registers `handler` for `content_type`; the `Accept` header follows.
    pub fn add_handler(&self, content_type: &str, handler: impl Deserializer + 'static) {
        let handler: Arc<dyn Deserializer> = Arc::new(handler);
        self.update(|options| options.add_handler(content_type, handler));
    }

    /// Removes the handler for `content_type`.
    pub fn remove_handler(&self, content_type: &str) -> bool {
        self.update(|options| options.remove_handler(content_type))
    }

    /// Removes every handler, the wildcard included.
    pub fn clear_handlers(&self) {
        self.update(ClientOptions::clear_handlers);
    }

    /// Returns the handler a response with `content_type` would use.
    pub fn handler(&self, content_type: &str) -> Option<Arc<dyn Deserializer>> {
        self.options().deserializers().lookup(content_type)
    }

    pub fn accepted_types(&self) -> Vec<String> {
        self.options().deserializers().accepted_types().to_vec()
    }

    // Configuration

    pub fn base_url(&self) -> String {
        self.options().base_url().to_string()
    }

    pub fn set_base_url(&self, base_url: impl AsRef<str>) {
        self.update(|options| options.set_base_url(base_url.as_ref()));
    }

    pub fn default_parameters(&self) -> Vec<Parameter> {
        self.options().default_parameters().to_vec()
    }

    pub fn add_default_parameter(&self, parameter: Parameter) {
        self.update(|options| options.add_default_parameter(parameter));
    }

    pub fn remove_default_parameter(&self, name: &str, kind: ParameterKind) -> bool {
        self.update(|options| options.remove_default_parameter(name, kind))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.options().timeout
    }

    pub fn set_timeout(&self, timeout: Option<Duration>) {
        self.update(|options| options.timeout = timeout);
    }

    pub fn max_redirects(&self) -> Option<usize> {
        self.options().max_redirects
    }

    pub fn set_max_redirects(&self, max_redirects: Option<usize>) {
        self.update(|options| options.max_redirects = max_redirects);
    }

    pub fn follow_redirects(&self) -> bool {
        self.options().follow_redirects
    }

    pub fn set_follow_redirects(&self, follow_redirects: bool) {
        self.update(|options| options.follow_redirects = follow_redirects);
    }

    pub fn proxy(&self) -> Option<Url> {
        self.options().proxy.clone()
    }

    pub fn set_proxy(&self, proxy: Option<Url>) {
        self.update(|options| options.proxy = proxy);
    }

    pub fn cookie_jar(&self) -> Option<Arc<Jar>> {
        self.options().cookie_jar.clone()
    }

    pub fn set_cookie_jar(&self, jar: Option<Arc<Jar>>) {
        self.update(|options| options.cookie_jar = jar);
    }

    /// The user agent sent when a request does not set its own.
    pub fn user_agent(&self) -> String {
        effective_user_agent(None, self.options().user_agent.as_deref())
    }

    /// Sets the user agent; `None` restores the default.
    pub fn set_user_agent(&self, user_agent: Option<String>) {
        self.update(|options| options.user_agent = user_agent);
    }

    /// Sets or clears the authenticator.
    pub fn set_authenticator(&self, authenticator: Option<Arc<dyn Authenticator>>) {
        self.update(|options| options.authenticator = authenticator);
    }
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for RestClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("transport", &self.transport)
            .field("options", &self.options())
            .finish()
    }
}

fn deserialize_with<R: DeserializeOwned>(
    registry: &DeserializerRegistry,
    request: &RestRequest,
    mut response: RestResponse,
) -> TypedResponse<R> {
    if let Some(hook) = request.before_deserialization() {
        hook(&mut response);
    }
    if response.is_error() {
        return TypedResponse::new(response, None);
    }

    match decode(registry, request, &response) {
        Ok(data) => TypedResponse::new(response, Some(data)),
        Err(error) => {
            warn!(error = %error, status = response.status_code, "deserialization failed");
            response.fail(error.into());
            TypedResponse::new(response, None)
        }
    }
}

fn decode<R: DeserializeOwned>(
    registry: &DeserializerRegistry,
    request: &RestRequest,
    response: &RestResponse,
) -> Result<R, ValidationError> {
    let content_type = media_type(response.content_type.as_deref().unwrap_or_default());
    let Some(handler) = registry.lookup(&content_type) else {
        warn!(content_type = %content_type, "no deserializer registered");
        return Err(ValidationError::NoDeserializer { content_type });
    };
    debug!(content_type = %content_type, "selected deserializer");

    let value = handler.deserialize(&response.raw_bytes, request.hints())?;
    let typed = if handler.text_scalars() {
        from_text_value(value)
    } else {
        serde_json::from_value(value)
    };
    typed.map_err(ValidationError::TypeMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::JsonDeserializer;
    use crate::error::AuthError;
    use crate::method::CallShape;
    use crate::response::ResponseStatus;
    use crate::transport::testing::RecordingTransport;
    use crate::transport::TransportRequest;
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    fn client(transport: RecordingTransport) -> RestClient<RecordingTransport> {
        RestClient::builder()
            .base_url("https://api.test/")
            .build_with_transport(transport)
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_verb() {
        let client = client(RecordingTransport::ok("application/json", "{}"));

        for method in [RestMethod::Get, RestMethod::Delete, RestMethod::Patch, RestMethod::Put] {
            client
                .execute(&RestRequest::new("x").with_method(method))
                .await;
        }

        let shapes: Vec<_> = client
            .transport()
            .calls()
            .into_iter()
            .map(|call| (call.method, call.shape))
            .collect();
        assert_eq!(
            shapes,
            vec![
                (RestMethod::Get, CallShape::Get),
                (RestMethod::Delete, CallShape::Get),
                (RestMethod::Patch, CallShape::Post),
                (RestMethod::Put, CallShape::Post),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_and_post_pin_the_verb() {
        let client = client(RecordingTransport::ok("application/json", "{}"));
        let request = RestRequest::new("x").with_method(RestMethod::Put);

        client.get(&request).await;
        client.post(&request).await;

        let calls = client.transport().calls();
        assert_eq!(calls[0].shape, CallShape::Get);
        assert_eq!(calls[0].method, RestMethod::Get);
        assert_eq!(calls[1].shape, CallShape::Post);
        assert_eq!(calls[1].method, RestMethod::Post);
        assert_eq!(request.method(), RestMethod::Put);
    }

    #[tokio::test]
    async fn test_transport_failure_is_captured() {
        let client = client(RecordingTransport::failing("connection reset"));
        let request = RestRequest::new("x");

        let response = client.execute(&request).await;

        assert_eq!(response.response_status, ResponseStatus::Error);
        let error = response.error().unwrap();
        assert_eq!(response.error_message.as_deref(), Some(error.to_string().as_str()));
        assert_eq!(error.to_string(), "Transport failed: connection reset");
        assert_eq!(request.attempts(), 0);
    }

    #[tokio::test]
    async fn test_attempt_counter_increments_once_per_call() {
        let client = client(RecordingTransport::ok("application/json", "{}"));
        let request = RestRequest::new("x");

        client.execute(&request).await;
        assert_eq!(request.attempts(), 1);
        client.get_as::<Value>(&request).await;
        assert_eq!(request.attempts(), 2);
    }

    #[tokio::test]
    async fn test_typed_json_with_hints() {
        let client = client(RecordingTransport::ok(
            "text/json; charset=utf-8",
            r#"{"meta": {}, "data": {"user": {"id": 3, "name": "Ada"}}}"#,
        ));
        let request = RestRequest::new("users/3").with_root_element("user");

        let response = client.execute_as::<User>(&request).await;

        assert!(!response.is_error());
        assert_eq!(
            response.data(),
            Some(&User {
                id: 3,
                name: "Ada".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_http_error_status_still_deserializes() {
        let client = client(RecordingTransport::respond(TransportResponse {
            content_type: Some("application/json".to_string()),
            raw_bytes: Bytes::from_static(br#"{"id": 0, "name": "missing"}"#),
            status_code: 404,
            response_status: ResponseStatus::Completed,
            ..Default::default()
        }));

        let response = client.execute_as::<User>(&RestRequest::new("users/0")).await;

        assert_eq!(response.status_code(), 404);
        assert_eq!(response.data().map(|u| u.name.as_str()), Some("missing"));
    }

    #[tokio::test]
    async fn test_transport_error_skips_deserialization() {
        let client = client(RecordingTransport::failing("boom"));
        let hook_saw_error = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let seen = Arc::clone(&hook_saw_error);
        let request = RestRequest::new("x").on_before_deserialization(move |response| {
            seen.store(response.is_error(), std::sync::atomic::Ordering::SeqCst);
        });

        let response = client.execute_as::<User>(&request).await;

        assert!(hook_saw_error.load(std::sync::atomic::Ordering::SeqCst));
        assert!(response.data().is_none());
        assert!(matches!(
            response.response().error(),
            Some(ApiError::Client(ClientError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_hook_can_rewrite_content_type() {
        let client = client(RecordingTransport::ok(
            "application/octet-stream",
            r#"{"id":1,"name":"x"}"#,
        ));
        assert!(client.remove_handler("*"));
        let request = RestRequest::new("x").on_before_deserialization(|response| {
            response.content_type = Some("application/json".to_string());
        });

        let response = client.execute_as::<User>(&request).await;
        assert_eq!(response.data().map(|u| u.id), Some(1));
    }

    #[tokio::test]
    async fn test_deserialization_failure_keeps_raw_fields() {
        let client = client(RecordingTransport::ok("application/json", r#"{"id": "nope"}"#));

        let response = client.execute_as::<User>(&RestRequest::new("x")).await;

        assert!(response.data().is_none());
        let raw = response.response();
        assert_eq!(raw.response_status, ResponseStatus::Error);
        assert_eq!(raw.status_code, 200);
        assert_eq!(raw.content, r#"{"id": "nope"}"#);
        assert!(matches!(
            raw.error(),
            Some(ApiError::Validation(ValidationError::TypeMismatch(_)))
        ));
    }

    #[tokio::test]
    async fn test_no_deserializer() {
        let client = RestClient::builder()
            .base_url("https://api.test")
            .without_default_handlers()
            .build_with_transport(RecordingTransport::ok("text/csv", "a,b"))
            .unwrap();

        let response = client.execute_as::<Value>(&RestRequest::new("x")).await;

        assert!(matches!(
            response.response().error(),
            Some(ApiError::Validation(ValidationError::NoDeserializer { content_type }))
                if content_type == "text/csv"
        ));
    }

    #[tokio::test]
    async fn test_missing_content_type_uses_wildcard() {
        let client = client(RecordingTransport::respond(TransportResponse {
            raw_bytes: Bytes::from_static(br#"{"id": 9, "name": "w"}"#),
            status_code: 200,
            response_status: ResponseStatus::Completed,
            ..Default::default()
        }));

        let response = client.execute_as::<User>(&RestRequest::new("x")).await;
        assert_eq!(response.data().map(|u| u.id), Some(9));
    }

    #[tokio::test]
    async fn test_cancellation_before_call() {
        let client = client(RecordingTransport::ok("application/json", "{}"));
        let token = CancellationToken::new();
        token.cancel();
        let request = RestRequest::new("x");

        let response = client.execute_with_token(&request, &token).await;

        assert_eq!(response.response_status, ResponseStatus::Aborted);
        assert!(response.is_cancelled());
        assert!(client.transport().calls().is_empty());
        assert_eq!(request.attempts(), 0);
    }

    #[tokio::test]
    async fn test_cancellation_during_call() {
        let client = client(
            RecordingTransport::ok("application/json", "{}").with_delay(Duration::from_secs(30)),
        );
        let token = CancellationToken::new();
        let request = RestRequest::new("x");

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let response = client.execute_as_with_token::<Value>(&request, &token).await;

        assert!(response.response().is_cancelled());
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_conversion_error_is_captured() {
        let client = RestClient::builder()
            .build_with_transport(RecordingTransport::ok("application/json", "{}"))
            .unwrap();

        let response = client.execute(&RestRequest::new("relative/path")).await;

        assert!(matches!(
            response.error(),
            Some(ApiError::Config(ConfigError::MissingBaseUrl { .. }))
        ));
        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_authenticator_failure_is_captured() {
        struct Expired;
        impl Authenticator for Expired {
            fn authenticate(&self, _: &mut TransportRequest) -> Result<(), AuthError> {
                Err(AuthError::TokenExpired)
            }
        }

        let client = client(RecordingTransport::ok("application/json", "{}"));
        client.set_authenticator(Some(Arc::new(Expired)));

        let response = client.execute(&RestRequest::new("x")).await;
        assert!(matches!(
            response.error(),
            Some(ApiError::Auth(AuthError::TokenExpired))
        ));
    }

    #[tokio::test]
    async fn test_accept_header_is_sent_and_overridable() {
        let client = client(RecordingTransport::ok("application/json", "{}"));

        client.execute(&RestRequest::new("a")).await;
        client
            .execute(&RestRequest::new("b").with_header("accept", "text/csv"))
            .await;

        let calls = client.transport().calls();
        assert!(calls[0]
            .request
            .header("Accept")
            .unwrap()
            .starts_with("application/json, text/json"));
        assert_eq!(calls[1].request.header("Accept"), Some("text/csv"));
    }

    #[tokio::test]
    async fn test_builder_accept_header_wins_over_handlers() {
        let client = RestClient::builder()
            .base_url("https://api.test")
            .default_header("Accept", "application/vnd.api+json")
            .handler("text/csv", JsonDeserializer)
            .build_with_transport(RecordingTransport::ok("application/json", "{}"))
            .unwrap();

        client.execute(&RestRequest::new("x")).await;

        let calls = client.transport().calls();
        assert_eq!(calls[0].request.header("Accept"), Some("application/vnd.api+json"));
        assert!(client.accepted_types().contains(&"text/csv".to_string()));
    }

    #[tokio::test]
    async fn test_typed_xml_parses_numeric_leaves() {
        #[derive(Debug, PartialEq, Deserialize)]
        struct Member {
            id: u64,
            name: String,
            admin: bool,
        }

        let client = client(RecordingTransport::ok(
            "application/xml",
            "<user><id>7</id><name>Ada</name><admin>false</admin></user>",
        ));

        let response = client.execute_as::<Member>(&RestRequest::new("users/7")).await;

        assert!(!response.is_error(), "{:?}", response.response().error_message);
        assert_eq!(
            response.data(),
            Some(&Member {
                id: 7,
                name: "Ada".to_string(),
                admin: false,
            })
        );
    }

    #[tokio::test]
    async fn test_json_leaves_are_not_coerced() {
        let client = client(RecordingTransport::ok(
            "application/json",
            r#"{"id": "7", "name": "Ada"}"#,
        ));

        let response = client.execute_as::<User>(&RestRequest::new("x")).await;
        assert!(matches!(
            response.response().error(),
            Some(ApiError::Validation(ValidationError::TypeMismatch(_)))
        ));
    }

    #[tokio::test]
    async fn test_runtime_configuration() {
        let client = client(RecordingTransport::ok("application/json", "{}"));
        client.set_base_url("https://other.test/api/");
        client.set_timeout(Some(Duration::from_secs(2)));
        client.set_user_agent(Some("custom/1".to_string()));
        client.add_default_parameter(Parameter::query("v", "2"));

        client.execute(&RestRequest::new("/items")).await;

        let sent = &client.transport().calls()[0].request;
        assert_eq!(sent.url.as_str(), "https://other.test/api/items?v=2");
        assert_eq!(sent.timeout, Some(Duration::from_secs(2)));
        assert_eq!(sent.user_agent, "custom/1");
        assert_eq!(client.base_url(), "https://other.test/api");
        assert_eq!(client.user_agent(), "custom/1");

        client.set_user_agent(None);
        assert_eq!(client.user_agent(), convert::DEFAULT_USER_AGENT);
        assert!(client.remove_default_parameter("v", ParameterKind::QueryString));
    }

    #[tokio::test]
    async fn test_handler_registry_on_client() {
        let client = client(RecordingTransport::ok("text/plain", "hello"));
        client.add_handler(
            "text/plain",
            |content: &[u8], _: &crate::deserializer::DeserializeHints| -> Result<Value, ValidationError> {
                Ok(Value::String(String::from_utf8_lossy(content).to_uppercase()))
            },
        );

        assert!(client.accepted_types().contains(&"text/plain".to_string()));
        assert!(client.handler("text/plain; charset=utf-8").is_some());

        let response = client.execute_as::<String>(&RestRequest::new("x")).await;
        assert_eq!(response.data().map(String::as_str), Some("HELLO"));

        client.clear_handlers();
        assert!(client.accepted_types().is_empty());
        assert!(client.handler("application/json").is_none());
    }

    #[tokio::test]
    async fn test_snapshot_is_taken_per_execution() {
        let client = Arc::new(client(
            RecordingTransport::ok("application/json", r#"{"id":1,"name":"a"}"#)
                .with_delay(Duration::from_millis(50)),
        ));

        let in_flight = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.execute_as::<User>(&RestRequest::new("x")).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        client.clear_handlers();

        let response = in_flight.await.unwrap();
        assert_eq!(response.data().map(|u| u.id), Some(1));
    }

    #[tokio::test]
    async fn test_download_data() {
        let ok = client(RecordingTransport::ok("application/octet-stream", "raw"));
        assert_eq!(
            ok.download_data(&RestRequest::new("f")).await.as_deref(),
            Some(&b"raw"[..])
        );

        let failed = client(RecordingTransport::failing("nope"));
        assert!(failed.download_data(&RestRequest::new("f")).await.is_none());
    }

    #[test]
    fn test_build_rejects_invalid_base_url() {
        let result = RestClient::builder().base_url("not a url").build();
        assert!(matches!(
            result,
            Err(ApiError::Config(ConfigError::InvalidUrl(_)))
        ));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_failure_emits_warning() {
        let client = client(RecordingTransport::failing("socket closed"));
        client.execute(&RestRequest::new("x")).await;
        assert!(logs_contain("request failed"));
        assert!(logs_contain("socket closed"));
    }
}
