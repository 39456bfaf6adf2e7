//! Request body serialization stage.

use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use serde_json::Value;
use tower::Layer;
use tower_service::Service;
use tracing::debug;

use super::{StageFuture, take_ready};
use crate::{Error, Request, Result, Serializer};

/// Layer encoding structured request bodies with the configured serializer.
///
/// A `Content-Type` header already present on the request selects the codec;
/// otherwise the serializer negotiates one. The negotiated type is written
/// back to `Content-Type`, and `Accept` advertises every decodable type
/// unless the request already sets it.
#[derive(Debug, Clone)]
pub struct RequestSerializationLayer {
    serializer: Arc<dyn Serializer>,
}

impl RequestSerializationLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }
}

impl<S> Layer<S> for RequestSerializationLayer {
    type Service = RequestSerialization<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestSerialization {
            inner,
            serializer: Arc::clone(&self.serializer),
        }
    }
}

/// Service encoding request bodies before handing them to the inner service.
#[derive(Debug, Clone)]
pub struct RequestSerialization<S> {
    inner: S,
    serializer: Arc<dyn Serializer>,
}

impl<S> RequestSerialization<S> {
    /// Encode the body of a request, setting `Content-Type` and `Accept`.
    ///
    /// The serializer is invoked exactly once when a body is present and not
    /// at all otherwise.
    pub fn encode(serializer: &dyn Serializer, request: Request<Value>) -> Result<Request<Bytes>> {
        let preferred = request.header("Content-Type").map(str::to_owned);
        let mut negotiated = None;

        let mut request = request.try_map_body(|value| {
            let payload = serializer.serialize(&value, preferred.as_deref())?;
            negotiated = Some(payload.content_type);
            Ok(payload.bytes)
        })?;

        match negotiated {
            Some(content_type) => {
                debug!(
                    content_type = %content_type,
                    bytes = request.body().map_or(0, Bytes::len),
                    "encoded request body"
                );
                request.set_header("Content-Type", content_type);
            }
            None => request.remove_header("Content-Type"),
        }

        if request.header("Accept").is_none() {
            request.set_header("Accept", serializer.accept());
        }

        Ok(request)
    }
}

impl<S, R> Service<Request<Value>> for RequestSerialization<S>
where
    S: Service<Request<Bytes>, Response = R, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
    R: Send + 'static,
{
    type Response = R;
    type Error = Error;
    type Future = StageFuture<R>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Value>) -> Self::Future {
        let serializer = Arc::clone(&self.serializer);
        let mut inner = take_ready(&mut self.inner);

        Box::pin(async move {
            let request = Self::encode(serializer.as_ref(), request)?;
            inner.call(request).await
        })
    }
}
