//! The default [`Transport`], backed by `reqwest`.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{Proxy, RequestBuilder};
use tracing::{debug, warn};
use url::Url;

use super::{Transport, TransportRequest, TransportResponse};
use crate::error::{ApiError, ClientError, ConfigError};
use crate::method::RestMethod;
use crate::response::{ResponseCookie, ResponseStatus};

/// Clients kept before the least recently built one is dropped.
const MAX_CACHED_CLIENTS: usize = 8;

/// Settings that live on a `reqwest::Client` rather than on a single request.
#[derive(Debug, Clone)]
struct ClientProfile {
    follow_redirects: bool,
    max_redirects: Option<usize>,
    proxy: Option<Url>,
    cookie_jar: Option<Arc<Jar>>,
}

impl ClientProfile {
    fn of(request: &TransportRequest) -> Self {
        Self {
            follow_redirects: request.follow_redirects,
            max_redirects: request.max_redirects,
            proxy: request.proxy.clone(),
            cookie_jar: request.cookie_jar.clone(),
        }
    }

    fn build(&self) -> Result<reqwest::Client, ApiError> {
        let policy = if !self.follow_redirects {
            Policy::none()
        } else if let Some(max) = self.max_redirects {
            Policy::limited(max)
        } else {
            Policy::default()
        };

        let mut builder = reqwest::Client::builder()
            .redirect(policy)
            .pool_max_idle_per_host(10);
        if let Some(proxy) = &self.proxy {
            let proxy = Proxy::all(proxy.as_str()).map_err(|e| ConfigError::InvalidProxy {
                message: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }
        if let Some(jar) = &self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }
        Ok(builder.build().map_err(ClientError::Request)?)
    }
}

impl PartialEq for ClientProfile {
    fn eq(&self, other: &Self) -> bool {
        let same_jar = match (&self.cookie_jar, &other.cookie_jar) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        same_jar
            && self.follow_redirects == other.follow_redirects
            && self.max_redirects == other.max_redirects
            && self.proxy == other.proxy
    }
}

/// Sends requests with `reqwest`.
///
/// One `reqwest::Client` is kept per distinct redirect / proxy / cookie-jar
/// combination so connection pools are reused across calls. At most
/// eight combinations are cached; the oldest is evicted first.
#[derive(Debug, Default)]
pub struct HttpTransport {
    clients: Mutex<Vec<(ClientProfile, reqwest::Client)>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, request: &TransportRequest) -> Result<reqwest::Client, ApiError> {
        let profile = ClientProfile::of(request);
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, client)) = clients.iter().find(|(known, _)| *known == profile) {
            return Ok(client.clone());
        }
        let client = profile.build()?;
        debug!(
            follow_redirects = profile.follow_redirects,
            max_redirects = ?profile.max_redirects,
            proxy = profile.proxy.as_ref().map(Url::as_str),
            "built http client"
        );
        if clients.len() >= MAX_CACHED_CLIENTS {
            clients.remove(0);
        }
        clients.push((profile, client.clone()));
        Ok(client)
    }

    /// Builds everything both call shapes share: URL, headers, cookies,
    /// user agent, timeout and credentials.
    fn prepare(
        &self,
        method: RestMethod,
        request: &TransportRequest,
    ) -> Result<RequestBuilder, ApiError> {
        let client = self.client_for(request)?;

        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name =
                HeaderName::try_from(name.as_str()).map_err(|_| ConfigError::invalid_header(name))?;
            let header_value = HeaderValue::try_from(value.as_str())
                .map_err(|_| ConfigError::invalid_header(name))?;
            headers.append(header_name, header_value);
        }
        if !headers.contains_key(USER_AGENT) {
            let agent = HeaderValue::try_from(request.user_agent.as_str())
                .map_err(|_| ConfigError::invalid_header("User-Agent"))?;
            headers.insert(USER_AGENT, agent);
        }
        if !request.cookies.is_empty() {
            let cookie = request
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ");
            let cookie =
                HeaderValue::try_from(cookie).map_err(|_| ConfigError::invalid_header("Cookie"))?;
            headers.append(COOKIE, cookie);
        }

        let mut builder = client
            .request(method.to_reqwest(), request.url.clone())
            .headers(headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        Ok(builder)
    }
}

impl Transport for HttpTransport {
    async fn execute_get(
        &self,
        method: RestMethod,
        request: TransportRequest,
    ) -> Result<TransportResponse, ApiError> {
        let builder = self.prepare(method, &request)?;
        send(builder, request.timeout).await
    }

    async fn execute_post(
        &self,
        method: RestMethod,
        request: TransportRequest,
    ) -> Result<TransportResponse, ApiError> {
        let mut builder = self.prepare(method, &request)?;
        let timeout = request.timeout;

        if !request.files.is_empty() {
            if let Some(body) = &request.body {
                warn!(
                    content_type = %body.content_type,
                    "request body ignored, files force multipart/form-data"
                );
            }
            let mut form = Form::new();
            for (name, value) in request.form {
                form = form.text(name, value);
            }
            for file in request.files {
                let mut part = Part::bytes(file.bytes.to_vec());
                if let Some(file_name) = file.file_name {
                    part = part.file_name(file_name);
                }
                if let Some(content_type) = file.content_type {
                    part = part.mime_str(&content_type).map_err(ClientError::Request)?;
                }
                form = form.part(file.name, part);
            }
            builder = builder.multipart(form);
        } else if let Some(body) = request.body {
            let content_type = HeaderValue::try_from(body.content_type.as_str())
                .map_err(|_| ConfigError::invalid_header("Content-Type"))?;
            builder = builder
                .header(CONTENT_TYPE, content_type)
                .body(body.content.into_bytes());
        } else if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        send(builder, timeout).await
    }
}

async fn send(
    builder: RequestBuilder,
    timeout: Option<Duration>,
) -> Result<TransportResponse, ApiError> {
    let response = builder
        .send()
        .await
        .map_err(|e| map_error(e, timeout))?;

    let status = response.status();
    let headers: Vec<(String, String)> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let header = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };
    let content_type = header("content-type");
    let content_encoding = header("content-encoding");
    let server = header("server");
    let cookies = response
        .cookies()
        .map(|cookie| ResponseCookie {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
            domain: cookie.domain().map(str::to_string),
            path: cookie.path().map(str::to_string),
            expires: cookie.expires(),
            secure: cookie.secure(),
            http_only: cookie.http_only(),
        })
        .collect();
    let content_length = response.content_length();
    let response_uri = response.url().clone();

    let raw_bytes = response.bytes().await.map_err(|e| map_error(e, timeout))?;

    Ok(TransportResponse {
        content: String::from_utf8_lossy(&raw_bytes).into_owned(),
        content_encoding,
        content_length: content_length.or(Some(raw_bytes.len() as u64)),
        content_type,
        response_status: ResponseStatus::Completed,
        error_message: None,
        error: None,
        raw_bytes,
        status_code: status.as_u16(),
        status_description: status.canonical_reason().unwrap_or_default().to_string(),
        response_uri: Some(response_uri),
        server,
        headers,
        cookies,
    })
}

fn map_error(error: reqwest::Error, timeout: Option<Duration>) -> ApiError {
    if error.is_timeout() {
        ClientError::Timeout {
            duration_ms: timeout
                .map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX))
                .unwrap_or_default(),
        }
        .into()
    } else if error.is_connect() {
        ClientError::Connection(error.to_string()).into()
    } else {
        ClientError::Request(error).into()
    }
}
