//! Conversion between the request/response model and the transport objects.

use tracing::debug;
use url::Url;

use crate::client::ClientOptions;
use crate::error::{ApiError, ConfigError};
use crate::method::{CallShape, RestMethod};
use crate::request::{Parameter, ParameterKind, ParameterValue, RestRequest};
use crate::response::RestResponse;
use crate::transport::{BodyContent, RequestBody, TransportFile, TransportRequest, TransportResponse};

/// User agent sent when neither the request nor the client sets one.
pub const DEFAULT_USER_AGENT: &str = concat!("rest-client/", env!("CARGO_PKG_VERSION"));

/// Builds the transport request for `request` under `options`.
///
/// `method` is the verb actually dispatched, which decides whether
/// [`ParameterKind::GetOrPost`] parameters become query pairs or form fields.
///
/// ## Errors
///
/// Returns [`ConfigError::MissingBaseUrl`] for a relative resource without a
/// base URL and [`ConfigError::InvalidUrl`] when the result does not parse.
pub fn to_transport(
    options: &ClientOptions,
    request: &RestRequest,
    method: RestMethod,
) -> Result<TransportRequest, ApiError> {
    let parameters = merge_parameters(request.parameters(), options.default_parameters());
    let shape = method.call_shape();
    let has_body = parameters
        .iter()
        .any(|p| p.kind == ParameterKind::RequestBody);
    let multipart = shape == CallShape::Post
        && parameters.iter().any(|p| p.kind == ParameterKind::File);
    // Multipart drops the body, so form fields stay in the form as text parts.
    let form_to_query = shape == CallShape::Get || (has_body && !multipart);

    let mut segments = Vec::new();
    let mut query = Vec::new();
    let mut form = Vec::new();
    let mut headers = Vec::new();
    let mut cookies = Vec::new();
    let mut files = Vec::new();
    let mut body = None;

    for parameter in parameters {
        let Parameter {
            name,
            value,
            kind,
            file_name,
            content_type,
        } = parameter;
        match kind {
            ParameterKind::UrlSegment => segments.push((name, value.as_text().into_owned())),
            ParameterKind::QueryString => query.push((name, value.as_text().into_owned())),
            ParameterKind::GetOrPost => {
                if form_to_query {
                    query.push((name, value.as_text().into_owned()));
                } else {
                    form.push((name, value.as_text().into_owned()));
                }
            }
            ParameterKind::HttpHeader => headers.push((name, value.as_text().into_owned())),
            ParameterKind::Cookie => cookies.push((name, value.as_text().into_owned())),
            ParameterKind::RequestBody => {
                body = Some(RequestBody {
                    content_type: name,
                    content: match value {
                        ParameterValue::Text(text) => BodyContent::Text(text),
                        ParameterValue::Binary(bytes) => BodyContent::Binary(bytes),
                    },
                });
            }
            ParameterKind::File => files.push(TransportFile {
                name,
                file_name,
                content_type,
                bytes: value.to_bytes(),
            }),
        }
    }

    let resource = substitute_segments(request.resource(), &segments);
    let url = resolve_url(options.base_url(), &resource, &query)?;
    debug!(
        %url,
        %shape,
        headers = headers.len(),
        files = files.len(),
        has_body = body.is_some(),
        "converted request"
    );

    let timeout = request
        .timeout()
        .filter(|timeout| !timeout.is_zero())
        .or(options.timeout)
        .filter(|timeout| !timeout.is_zero());

    Ok(TransportRequest {
        url,
        headers,
        cookies,
        form,
        files,
        body,
        credentials: request.credentials().cloned(),
        user_agent: effective_user_agent(request.user_agent(), options.user_agent.as_deref()),
        timeout,
        follow_redirects: options.follow_redirects,
        max_redirects: options.max_redirects,
        proxy: options.proxy.clone(),
        cookie_jar: options.cookie_jar.clone(),
    })
}

/// Copies every field of a transport response into a [`RestResponse`].
pub fn from_transport(response: TransportResponse) -> RestResponse {
    let TransportResponse {
        content,
        content_encoding,
        content_length,
        content_type,
        response_status,
        error_message,
        error,
        raw_bytes,
        status_code,
        status_description,
        response_uri,
        server,
        headers,
        cookies,
    } = response;

    RestResponse {
        content,
        content_encoding,
        content_length,
        content_type,
        response_status,
        error_message,
        error,
        raw_bytes,
        status_code,
        status_description,
        response_uri,
        server,
        headers,
        cookies,
    }
}

/// Request parameters first, then each default no request parameter collides with.
pub fn merge_parameters(request: &[Parameter], defaults: &[Parameter]) -> Vec<Parameter> {
    let mut merged = request.to_vec();
    merged.extend(
        defaults
            .iter()
            .filter(|default| !request.iter().any(|p| p.collides_with(default)))
            .cloned(),
    );
    merged
}

/// Resolves the absolute URL for `resource`.
///
/// Absolute resources (a URL with a host) are used as-is; anything else,
/// including `name:verb` style paths, is joined to `base_url` with exactly
/// one `/` between them. Query pairs are appended in order.
pub fn resolve_url(
    base_url: &str,
    resource: &str,
    query: &[(String, String)],
) -> Result<Url, ConfigError> {
    let absolute = Url::parse(resource).ok().filter(Url::has_host);
    let mut url = match absolute {
        Some(absolute) => absolute,
        None if base_url.is_empty() => {
            return Err(ConfigError::MissingBaseUrl {
                resource: resource.to_string(),
            });
        }
        None if resource.is_empty() => Url::parse(base_url)?,
        None => Url::parse(&format!(
            "{base_url}/{}",
            resource.trim_start_matches('/')
        ))?,
    };
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Request override, then client setting, then [`DEFAULT_USER_AGENT`].
pub fn effective_user_agent(request: Option<&str>, client: Option<&str>) -> String {
    request
        .or(client)
        .unwrap_or(DEFAULT_USER_AGENT)
        .to_string()
}

fn substitute_segments(resource: &str, segments: &[(String, String)]) -> String {
    segments
        .iter()
        .fold(resource.to_string(), |path, (name, value)| {
            let encoded = url::form_urlencoded::byte_serialize(value.as_bytes())
                .collect::<String>()
                .replace('+', "%20");
            path.replace(&format!("{{{name}}}"), &encoded)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseStatus;
    use crate::request::Credentials;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;

    fn options(base_url: &str) -> ClientOptions {
        let mut options = ClientOptions::default();
        options.set_base_url(base_url);
        options
    }

    #[test]
    fn test_get_params_go_to_query() {
        let request = RestRequest::new("users/{id}")
            .with_url_segment("id", "a b/c")
            .with_get_or_post("expand", "true")
            .with_query("page", "2");
        let converted =
            to_transport(&options("https://api.test/v1/"), &request, RestMethod::Get).unwrap();

        assert_eq!(
            converted.url.as_str(),
            "https://api.test/v1/users/a%20b%2Fc?expand=true&page=2"
        );
        assert!(converted.form.is_empty());
    }

    #[test]
    fn test_post_params_become_form_fields() {
        let request = RestRequest::new("/login")
            .with_get_or_post("user", "ada")
            .with_query("lang", "en");
        let converted =
            to_transport(&options("https://api.test"), &request, RestMethod::Post).unwrap();

        assert_eq!(converted.url.as_str(), "https://api.test/login?lang=en");
        assert_eq!(converted.form, vec![("user".to_string(), "ada".to_string())]);
        assert!(converted.body.is_none());
    }

    #[test]
    fn test_body_pushes_params_to_query() {
        let request = RestRequest::new("notes")
            .with_get_or_post("draft", "1")
            .with_body("text/plain", "hello");
        let converted =
            to_transport(&options("https://api.test"), &request, RestMethod::Put).unwrap();

        assert_eq!(converted.url.query(), Some("draft=1"));
        assert!(converted.form.is_empty());
        assert_eq!(
            converted.body,
            Some(RequestBody {
                content_type: "text/plain".to_string(),
                content: BodyContent::Text("hello".to_string()),
            })
        );
    }

    #[test]
    fn test_binary_body_stays_binary() {
        let request = RestRequest::new("blob").with_body(
            "application/octet-stream",
            Bytes::from_static(&[0xde, 0xad]),
        );
        let converted =
            to_transport(&options("https://api.test"), &request, RestMethod::Post).unwrap();
        let body = converted.body.unwrap();
        assert_eq!(body.content_type, "application/octet-stream");
        assert_eq!(body.content, BodyContent::Binary(Bytes::from_static(&[0xde, 0xad])));
    }

    #[test]
    fn test_request_parameters_win_over_defaults() {
        let mut options = options("https://api.test");
        options.add_default_parameter(Parameter::header("Accept", "application/xml"));
        options.add_default_parameter(Parameter::header("X-Client", "demo"));
        options.add_default_parameter(Parameter::query("accept", "kept"));

        let request = RestRequest::new("items").with_header("accept", "text/csv");
        let converted = to_transport(&options, &request, RestMethod::Get).unwrap();

        assert_eq!(
            converted.headers,
            vec![
                ("accept".to_string(), "text/csv".to_string()),
                ("X-Client".to_string(), "demo".to_string()),
            ]
        );
        assert_eq!(converted.url.query(), Some("accept=kept"));
    }

    #[test]
    fn test_multipart_keeps_params_as_form_fields() {
        let request = RestRequest::new("upload")
            .with_get_or_post("title", "report")
            .with_body("text/plain", "dropped")
            .with_file("doc", "a.txt", Bytes::from_static(b"abc"), None);
        let converted =
            to_transport(&options("https://api.test"), &request, RestMethod::Post).unwrap();

        assert_eq!(converted.url.query(), None);
        assert_eq!(converted.form, vec![("title".to_string(), "report".to_string())]);
        assert_eq!(converted.files.len(), 1);

        let converted =
            to_transport(&options("https://api.test"), &request, RestMethod::Get).unwrap();
        assert_eq!(converted.url.query(), Some("title=report"));
    }

    #[test]
    fn test_files_and_cookies() {
        let request = RestRequest::new("upload")
            .with_cookie("session", "s1")
            .with_file("doc", "a.txt", Bytes::from_static(b"abc"), None);
        let converted =
            to_transport(&options("https://api.test"), &request, RestMethod::Post).unwrap();

        assert_eq!(converted.cookies, vec![("session".to_string(), "s1".to_string())]);
        assert_eq!(converted.files.len(), 1);
        assert_eq!(converted.files[0].file_name.as_deref(), Some("a.txt"));
        assert_eq!(converted.files[0].bytes.as_ref(), b"abc");
    }

    #[test]
    fn test_client_settings_are_applied() {
        let mut options = options("https://api.test");
        options.timeout = Some(Duration::from_secs(5));
        options.follow_redirects = false;
        options.max_redirects = Some(3);
        options.proxy = Some(Url::parse("http://proxy.local:3128").unwrap());
        options.cookie_jar = Some(Arc::new(reqwest::cookie::Jar::default()));
        options.user_agent = Some("client-agent".to_string());

        let request = RestRequest::new("x").with_credentials(Credentials::new("u", "p"));
        let converted = to_transport(&options, &request, RestMethod::Get).unwrap();

        assert_eq!(converted.timeout, Some(Duration::from_secs(5)));
        assert!(!converted.follow_redirects);
        assert_eq!(converted.max_redirects, Some(3));
        assert!(converted.proxy.is_some());
        assert!(converted.cookie_jar.is_some());
        assert_eq!(converted.user_agent, "client-agent");
        assert_eq!(converted.credentials.unwrap().username, "u");
    }

    #[test]
    fn test_request_timeout_overrides_and_zero_is_ignored() {
        let mut options = options("https://api.test");
        options.timeout = Some(Duration::from_secs(5));

        let request = RestRequest::new("x").with_timeout(Duration::from_millis(250));
        let converted = to_transport(&options, &request, RestMethod::Get).unwrap();
        assert_eq!(converted.timeout, Some(Duration::from_millis(250)));

        let request = RestRequest::new("x").with_timeout(Duration::ZERO);
        let converted = to_transport(&options, &request, RestMethod::Get).unwrap();
        assert_eq!(converted.timeout, Some(Duration::from_secs(5)));

        options.timeout = Some(Duration::ZERO);
        let converted = to_transport(&options, &request, RestMethod::Get).unwrap();
        assert_eq!(converted.timeout, None);
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("", "https://other.test/a", &[]).unwrap().as_str(),
            "https://other.test/a"
        );
        assert_eq!(
            resolve_url("https://api.test", "", &[]).unwrap().as_str(),
            "https://api.test/"
        );
        assert!(matches!(
            resolve_url("", "relative", &[]),
            Err(ConfigError::MissingBaseUrl { resource }) if resource == "relative"
        ));
        assert_eq!(
            resolve_url("https://api.test/v1", "documents:batchGet", &[])
                .unwrap()
                .as_str(),
            "https://api.test/v1/documents:batchGet"
        );
        assert!(matches!(
            resolve_url("", "documents:batchGet", &[]),
            Err(ConfigError::MissingBaseUrl { .. })
        ));
        assert!(matches!(
            resolve_url("not a url", "x", &[]),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_effective_user_agent() {
        assert_eq!(effective_user_agent(Some("req"), Some("cli")), "req");
        assert_eq!(effective_user_agent(None, Some("cli")), "cli");
        assert_eq!(effective_user_agent(None, None), DEFAULT_USER_AGENT);
        assert!(DEFAULT_USER_AGENT.starts_with("rest-client/"));
    }

    #[test]
    fn test_from_transport_copies_every_field() {
        let error = Arc::new(ApiError::from(ConfigError::invalid_header("x")));
        let response = from_transport(TransportResponse {
            content: "body".to_string(),
            content_encoding: Some("gzip".to_string()),
            content_length: Some(4),
            content_type: Some("text/plain".to_string()),
            response_status: ResponseStatus::Completed,
            error_message: Some("note".to_string()),
            error: Some(Arc::clone(&error)),
            raw_bytes: Bytes::from_static(b"body"),
            status_code: 418,
            status_description: "I'm a teapot".to_string(),
            response_uri: Some(Url::parse("https://api.test/final").unwrap()),
            server: Some("kettle".to_string()),
            headers: vec![("X-A".to_string(), "1".to_string())],
            cookies: vec![crate::response::ResponseCookie {
                name: "c".to_string(),
                ..Default::default()
            }],
        });

        assert_eq!(response.content, "body");
        assert_eq!(response.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(response.content_length, Some(4));
        assert_eq!(response.content_type.as_deref(), Some("text/plain"));
        assert_eq!(response.response_status, ResponseStatus::Completed);
        assert_eq!(response.error_message.as_deref(), Some("note"));
        assert!(Arc::ptr_eq(response.error.as_ref().unwrap(), &error));
        assert_eq!(response.raw_bytes.as_ref(), b"body");
        assert_eq!(response.status_code, 418);
        assert_eq!(response.status_description, "I'm a teapot");
        assert_eq!(response.response_uri.as_ref().unwrap().path(), "/final");
        assert_eq!(response.server.as_deref(), Some("kettle"));
        assert_eq!(response.header("x-a"), Some("1"));
        assert_eq!(response.cookies[0].name, "c");
    }
}
