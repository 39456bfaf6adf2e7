//! Request/response processing pipeline.
//!
//! The pipeline is a stack of Tower layers around the transport. The standard
//! assembly lists the stages outermost first:
//!
//! ```text
//! ResponseDeserialization   Response<Bytes> -> Response<Value>, decodes error bodies
//!   ErrorClassification     RawOutcome -> Response<Bytes> | Error (4xx, 5xx, fault)
//!     HostResolution        relative URI -> absolute URI
//!       RequestSerialization  Request<Value> -> Request<Bytes>
//!         transport           Request<Bytes> -> RawOutcome
//! ```
//!
//! Every stage calls its inner service at most once per request and never
//! retries. Each layer is public so a client family can insert its own layers
//! or reorder the chain in [`ClientFamily::pipeline`](crate::ClientFamily::pipeline).
//!
//! # Example
//!
//! ```ignore
//! use gimlet::pipeline::{self, PipelineSettings};
//!
//! let settings = PipelineSettings::new(Arc::new(SmartSerializer::default()))
//!     .with_host("http://localhost:9200".parse()?);
//! let pipeline = pipeline::assemble(&settings, pipeline::boxed_transport(my_transport));
//! ```

mod error_classification;
mod host_resolution;
mod request_serialization;
mod response_deserialization;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use serde_json::Value;
use tower::ServiceBuilder;
use tower::util::BoxCloneSyncService;
use tower_service::Service;
use url::Url;

use crate::{Error, RawOutcome, Request, Response, Result, Serializer, Transport};

pub use error_classification::{ErrorClassification, ErrorClassificationLayer};
pub use host_resolution::{HostResolution, HostResolutionLayer};
pub use request_serialization::{RequestSerialization, RequestSerializationLayer};
pub use response_deserialization::{ResponseDeserialization, ResponseDeserializationLayer};

/// Future returned by every pipeline stage.
pub type StageFuture<T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'static>>;

/// Type-erased transport at the bottom of the pipeline.
pub type BoxedTransport = BoxCloneSyncService<Request<Bytes>, RawOutcome, Error>;

/// Type-erased assembled pipeline, as owned by a [`Connection`](crate::Connection).
pub type Pipeline = BoxCloneSyncService<Request<Value>, Response<Value>, Error>;

/// Configuration shared by the standard stages.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Serializer used by both serialization stages.
    pub serializer: Arc<dyn Serializer>,
    /// Base URL of relative endpoint URIs.
    pub host: Option<Url>,
}

impl PipelineSettings {
    /// Settings without a host.
    #[must_use]
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self {
            serializer,
            host: None,
        }
    }

    /// Set the host relative URIs resolve against.
    #[must_use]
    pub fn with_host(mut self, host: Url) -> Self {
        self.host = Some(host);
        self
    }
}

/// Assemble the standard four-stage pipeline around a transport.
#[must_use]
pub fn assemble(settings: &PipelineSettings, transport: BoxedTransport) -> Pipeline {
    let service = ServiceBuilder::new()
        .layer(ResponseDeserializationLayer::new(Arc::clone(
            &settings.serializer,
        )))
        .layer(ErrorClassificationLayer::new())
        .layer(HostResolutionLayer::new(settings.host.clone()))
        .layer(RequestSerializationLayer::new(Arc::clone(
            &settings.serializer,
        )))
        .service(transport);

    BoxCloneSyncService::new(service)
}

/// Erase the type of a [`Transport`] so it can sit under the pipeline.
#[must_use]
pub fn boxed_transport(transport: impl Transport) -> BoxedTransport {
    BoxCloneSyncService::new(TransportService {
        transport: Arc::new(transport),
    })
}

/// Tower adapter over a [`Transport`]. Faults are values here, not errors:
/// they are only turned into [`Error`]s by [`ErrorClassification`].
struct TransportService<T> {
    transport: Arc<T>,
}

impl<T> Clone for TransportService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> Service<Request<Bytes>> for TransportService<T> {
    type Response = RawOutcome;
    type Error = Error;
    type Future = StageFuture<RawOutcome>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let transport = Arc::clone(&self.transport);
        Box::pin(async move { Ok(transport.send(request).await) })
    }
}

/// Move the ready inner service out, leaving a fresh clone in place.
pub(crate) fn take_ready<S: Clone>(inner: &mut S) -> S {
    let clone = inner.clone();
    std::mem::replace(inner, clone)
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::testing::{json_response, recording_transport};
    use super::*;
    use crate::{Method, SmartSerializer, TransportFault};

    fn settings() -> PipelineSettings {
        PipelineSettings::new(Arc::new(SmartSerializer::default()))
            .with_host(Url::parse("http://api.test").expect("url"))
    }

    fn request(body: Option<Value>) -> Request<Value> {
        Request::builder(Method::Post, "/items")
            .query("q", "x")
            .maybe_body(body)
            .build()
            .expect("request")
    }

    #[tokio::test]
    async fn standard_pipeline_runs_every_stage() {
        let (transport, seen) = recording_transport(Ok(json_response(201, r#"{"id":7}"#)));
        let pipeline = assemble(&settings(), transport);

        let response = testing::call(pipeline, request(Some(json!({"name": "w"}))))
            .await
            .expect("response");

        assert_eq!(response.status(), 201);
        assert_eq!(response.body(), &json!({"id": 7}));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        let sent = seen.first().expect("sent");
        assert_eq!(sent.uri().to_string(), "http://api.test/items?q=x");
        assert_eq!(sent.header("Content-Type"), Some("application/json"));
        assert_eq!(sent.body().map(Bytes::as_ref), Some(br#"{"name":"w"}"#.as_slice()));
    }

    #[tokio::test]
    async fn standard_pipeline_classifies_faults() {
        let (transport, _) = recording_transport(Err(TransportFault::connect("refused")));
        let pipeline = assemble(&settings(), transport);

        let err = testing::call(pipeline, request(None))
            .await
            .expect_err("fault");

        assert!(err.is_transport());
        assert!(err.status().is_none());
    }

    #[tokio::test]
    async fn status_errors_keep_the_endpoint_uri() {
        let (transport, seen) =
            recording_transport(Ok(json_response(404, r#"{"error":"missing"}"#)));
        let pipeline = assemble(&settings(), transport);

        let err = testing::call(pipeline, request(None))
            .await
            .expect_err("not found");

        let Error::Request(status) = err else {
            panic!("expected a request error, got {err:?}");
        };
        assert_eq!(status.uri, "/items?q=x");
        assert_eq!(status.decoded, Some(json!({"error": "missing"})));

        let seen = seen.lock().expect("lock");
        let sent = seen.first().expect("sent");
        assert_eq!(sent.uri().to_string(), "http://api.test/items?q=x");
    }
}
