//! Verb to call-shape dispatch.

use tracing::debug;

use crate::error::ApiError;
use crate::method::{CallShape, RestMethod};
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Issues `request` through the call shape `method` maps to.
///
/// PATCH, POST and PUT take the POST-style path, every other verb the
/// GET-style one. This is the only place the two paths are chosen.
pub async fn dispatch<T: Transport>(
    transport: &T,
    method: RestMethod,
    request: TransportRequest,
) -> Result<TransportResponse, ApiError> {
    let shape = method.call_shape();
    debug!(%method, %shape, url = %request.url, "dispatching request");
    match shape {
        CallShape::Get => transport.execute_get(method, request).await,
        CallShape::Post => transport.execute_post(method, request).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingTransport;
    use strum::IntoEnumIterator;
    use url::Url;

    #[tokio::test]
    async fn test_each_verb_uses_its_shape() {
        let transport = RecordingTransport::ok("text/plain", "");
        let url = Url::parse("https://api.test/").unwrap();

        for method in RestMethod::iter() {
            dispatch(&transport, method, TransportRequest::new(url.clone(), "ua"))
                .await
                .unwrap();
        }

        let calls = transport.calls();
        assert_eq!(calls.len(), RestMethod::iter().count());
        for call in calls {
            let expected = match call.method {
                RestMethod::Post | RestMethod::Put | RestMethod::Patch => CallShape::Post,
                _ => CallShape::Get,
            };
            assert_eq!(call.shape, expected, "{} used the wrong shape", call.method);
        }
    }

    #[tokio::test]
    async fn test_failure_is_returned() {
        let transport = RecordingTransport::failing("socket closed");
        let url = Url::parse("https://api.test/").unwrap();

        let err = dispatch(&transport, RestMethod::Get, TransportRequest::new(url, "ua"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Transport failed: socket closed");
    }
}
