//! Connection: the entry point generated clients send endpoints through.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tower::ServiceExt;
use tracing::{Instrument, Level, info_span};

use crate::pipeline::Pipeline;
use crate::sink::{Record, emit};
use crate::{Endpoint, Error, Params, Request, Result, Sink, StructuredResponse};

/// Owner of an assembled pipeline and of the logger/tracer sinks.
///
/// A connection is immutable once built. Cloning is cheap and every clone
/// shares the same transport; concurrent calls to [`perform`](Self::perform)
/// are independent of each other.
#[derive(Clone)]
pub struct Connection {
    pipeline: Pipeline,
    logger: Arc<dyn Sink>,
    tracer: Arc<dyn Sink>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Wrap an assembled pipeline.
    #[must_use]
    pub fn new(pipeline: Pipeline, logger: Arc<dyn Sink>, tracer: Arc<dyn Sink>) -> Self {
        Self {
            pipeline,
            logger,
            tracer,
        }
    }

    /// Send an endpoint through the pipeline.
    ///
    /// Params fill the path placeholders of the endpoint template and the
    /// rest become the query string. The body goes to the serializer and an
    /// endpoint content type selects the codec. The returned future
    /// completes when the transport does; nothing runs in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] for an empty or malformed endpoint URI, a
    ///   path placeholder without a param, or a relative URI without a
    ///   configured host
    /// - [`Error::Encoding`] when the body cannot be encoded or the response
    ///   cannot be decoded
    /// - [`Error::Request`] / [`Error::Server`] for 4xx / 5xx statuses
    /// - [`Error::Transport`] when no response was received
    pub async fn perform(&self, endpoint: &dyn Endpoint) -> Result<StructuredResponse> {
        let method = endpoint.method();
        let expanded = expand(endpoint);
        let uri = match &expanded {
            Ok((uri, _)) => target(uri),
            Err(_) => target(&endpoint.uri()),
        };

        emit(
            self.tracer.as_ref(),
            &Record {
                level: Level::INFO,
                message: "request started",
                method,
                uri: &uri,
                status: None,
                elapsed: Duration::ZERO,
                error: None,
                body: endpoint.body(),
            },
        );

        let start = Instant::now();
        let result = match expanded.and_then(|(_, query)| build_request(endpoint, &uri, query)) {
            Ok(request) => {
                let span = info_span!("perform", %method, uri = %uri);
                self.pipeline.clone().oneshot(request).instrument(span).await
            }
            Err(error) => Err(error),
        };
        let elapsed = start.elapsed();

        let record = match &result {
            Ok(response) => Record {
                level: Level::INFO,
                message: "request completed",
                method,
                uri: &uri,
                status: Some(response.status()),
                elapsed,
                error: None,
                body: Some(response.body()),
            },
            Err(error) => Record {
                level: failure_level(error),
                message: "request failed",
                method,
                uri: &uri,
                status: error.status(),
                elapsed,
                error: Some(error),
                body: error.decoded_body(),
            },
        };
        emit(self.logger.as_ref(), &record);

        result
    }
}

/// Status failures are the server's answer; everything else is ours.
fn failure_level(error: &Error) -> Level {
    match error {
        Error::Request(_) | Error::Server(_) => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Endpoint URI as a request target; bare paths get a leading slash.
fn target(uri: &str) -> String {
    let uri = uri.trim();
    if uri.is_empty() || uri.starts_with('/') || uri.contains("://") {
        uri.to_string()
    } else {
        format!("/{uri}")
    }
}

/// Endpoint URI with its path placeholders filled, and the params left for
/// the query string.
fn expand(endpoint: &dyn Endpoint) -> Result<(String, Option<Params>)> {
    match endpoint.path_template() {
        Some(template) => {
            let params = endpoint.params().cloned().unwrap_or_default();
            let (uri, query) = template.expand_params(params)?;
            Ok((uri, Some(query).filter(|query| !query.is_empty())))
        }
        None => Ok((endpoint.uri().into_owned(), endpoint.params().cloned())),
    }
}

fn build_request(
    endpoint: &dyn Endpoint,
    uri: &str,
    query: Option<Params>,
) -> Result<Request<Value>> {
    let mut builder = Request::builder(endpoint.method(), uri)
        .maybe_body(endpoint.body().cloned());

    if let Some(query) = query {
        builder = builder.query_pairs(query);
    }
    if let Some(content_type) = endpoint.content_type() {
        builder = builder.header("Content-Type", content_type);
    }

    builder.build()
}
