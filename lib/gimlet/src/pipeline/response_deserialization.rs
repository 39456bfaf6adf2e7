//! Response body deserialization stage.

use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use serde_json::Value;
use tower::Layer;
use tower_service::Service;
use tracing::debug;

use super::{StageFuture, take_ready};
use crate::{Error, Request, Response, Result, Serializer};

/// Layer decoding response bodies with the configured serializer.
///
/// Successful responses are decoded according to their `Content-Type`.
/// Status errors coming from the inner stages keep their classification and
/// get their body decoded on a best-effort basis, so callers can inspect
/// `{"error": ...}` payloads without decoding them by hand.
#[derive(Debug, Clone)]
pub struct ResponseDeserializationLayer {
    serializer: Arc<dyn Serializer>,
}

impl ResponseDeserializationLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }
}

impl<S> Layer<S> for ResponseDeserializationLayer {
    type Service = ResponseDeserialization<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResponseDeserialization {
            inner,
            serializer: Arc::clone(&self.serializer),
        }
    }
}

/// Service decoding the responses and status errors of the inner service.
#[derive(Debug, Clone)]
pub struct ResponseDeserialization<S> {
    inner: S,
    serializer: Arc<dyn Serializer>,
}

impl<S> ResponseDeserialization<S> {
    /// Decode a raw response into a structured one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] when the body does not match its
    /// declared content type.
    pub fn decode(serializer: &dyn Serializer, response: Response<Bytes>) -> Result<Response<Value>> {
        let content_type = response.content_type().map(str::to_owned);
        let (status, headers, body) = response.into_parts();
        let value = serializer.deserialize(&body, content_type.as_deref())?;
        debug!(status, bytes = body.len(), "decoded response body");
        Ok(Response::new(status, headers, value))
    }

    /// Attach the decoded body to a status error; other errors are untouched.
    pub fn enrich(serializer: &dyn Serializer, mut error: Error) -> Error {
        if let Some(status) = error.status_error_mut() {
            status.decoded = serializer
                .deserialize(&status.body, status.content_type())
                .ok();
        }
        error
    }
}

impl<S> Service<Request<Value>> for ResponseDeserialization<S>
where
    S: Service<Request<Value>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Value>;
    type Error = Error;
    type Future = StageFuture<Response<Value>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Value>) -> Self::Future {
        let serializer = Arc::clone(&self.serializer);
        let mut inner = take_ready(&mut self.inner);

        Box::pin(async move {
            match inner.call(request).await {
                Ok(response) => Self::decode(serializer.as_ref(), response),
                Err(error) => Err(Self::enrich(serializer.as_ref(), error)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};
    use serde_json::json;
    use tower::service_fn;

    use super::*;
    use crate::pipeline::testing::{call, json_response};
    use crate::{Method, SmartSerializer, StatusError};

    type Decode = ResponseDeserialization<()>;

    fn request() -> Request<Value> {
        Request::builder(Method::Get, "/items")
            .build()
            .expect("request")
    }

    #[test]
    fn decodes_by_content_type() {
        let response = Decode::decode(
            &SmartSerializer::default(),
            json_response(200, r#"{"ok":true}"#),
        )
        .expect("decoded");

        check!(response.status() == 200);
        check!(response.body() == &json!({"ok": true}));
        check!(response.content_type() == Some("application/json"));
    }

    #[test]
    fn empty_body_decodes_to_null() {
        let response = Response::new(204, HashMap::new(), Bytes::new());
        let decoded = Decode::decode(&SmartSerializer::default(), response).expect("decoded");
        check!(decoded.body().is_null());
    }

    #[test]
    fn malformed_body_is_encoding_error() {
        let_assert!(
            Err(err) = Decode::decode(&SmartSerializer::default(), json_response(200, "{oops"))
        );
        check!(err.is_encoding());
    }

    #[tokio::test]
    async fn status_error_body_is_decoded() {
        let inner = service_fn(|_: Request<Value>| async move {
            let (status, headers, body) =
                json_response(404, r#"{"error":"missing"}"#).into_parts();
            let error = StatusError::new(status, Method::Get, "/items").with_payload(headers, body);
            Err::<Response<Bytes>, _>(Error::Request(error))
        });
        let service =
            ResponseDeserializationLayer::new(Arc::new(SmartSerializer::default())).layer(inner);

        let err = call(service, request()).await.expect_err("404");

        check!(err.status() == Some(404));
        check!(err.decoded_body() == Some(&json!({"error": "missing"})));
    }

    #[tokio::test]
    async fn undecodable_error_body_keeps_classification() {
        let inner = service_fn(|_: Request<Value>| async move {
            let (status, headers, body) = json_response(502, "<html>").into_parts();
            let error = StatusError::new(status, Method::Get, "/items").with_payload(headers, body);
            Err::<Response<Bytes>, _>(Error::Server(error))
        });
        let service =
            ResponseDeserializationLayer::new(Arc::new(SmartSerializer::default())).layer(inner);

        let err = call(service, request()).await.expect_err("502");

        let_assert!(Error::Server(status) = err);
        check!(status.decoded.is_none());
        check!(status.body.as_ref() == b"<html>");
    }
}
