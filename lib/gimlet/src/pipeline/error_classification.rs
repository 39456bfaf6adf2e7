//! Error classification stage.
//!
//! The only place where the outcome of an exchange is judged: every other
//! stage either passes results through or enriches them.

use std::task::{Context, Poll};

use bytes::Bytes;
use serde_json::Value;
use tower::Layer;
use tower_service::Service;
use tracing::warn;

use super::{StageFuture, take_ready};
use crate::{Error, Method, RawOutcome, Request, Response, Result, StatusError};

/// Layer turning raw outcomes into responses or typed errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorClassificationLayer;

impl ErrorClassificationLayer {
    /// Create the layer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for ErrorClassificationLayer {
    type Service = ErrorClassification<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorClassification { inner }
    }
}

/// Service classifying the outcome of the inner service.
///
/// | Outcome | Result |
/// |---------|--------|
/// | status 400–499 | [`Error::Request`] |
/// | status 500–599 | [`Error::Server`] |
/// | transport fault | [`Error::Transport`] |
/// | any other status | `Ok(response)` |
#[derive(Debug, Clone)]
pub struct ErrorClassification<S> {
    inner: S,
}

impl<S> ErrorClassification<S> {
    /// Classify one raw outcome.
    pub fn classify(method: Method, uri: &str, outcome: RawOutcome) -> Result<Response<Bytes>> {
        let response = outcome.map_err(|fault| {
            warn!(%method, uri, kind = %fault.kind, error = %fault.message, "transport fault");
            Error::Transport(fault)
        })?;

        let rejected = response.is_client_error();
        if !rejected && !response.is_server_error() {
            return Ok(response);
        }

        let (status, headers, body) = response.into_parts();
        let failure = StatusError::new(status, method, uri).with_payload(headers, body);
        if rejected {
            warn!(%method, uri, status, "request rejected");
            Err(Error::Request(failure))
        } else {
            warn!(%method, uri, status, "server failure");
            Err(Error::Server(failure))
        }
    }
}

impl<S> Service<Request<Value>> for ErrorClassification<S>
where
    S: Service<Request<Value>, Response = RawOutcome, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = StageFuture<Response<Bytes>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Value>) -> Self::Future {
        let method = request.method();
        let uri = request.uri().to_string();
        let mut inner = take_ready(&mut self.inner);

        Box::pin(async move {
            let outcome = inner.call(request).await?;
            Self::classify(method, &uri, outcome)
        })
    }
}
