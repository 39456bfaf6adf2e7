//! Client builder shared by every generated client family.
//!
//! A generated client implements [`ClientFamily`] and gets a
//! [`ClientBuilder`] for free:
//!
//! ```ignore
//! let client = PetstoreClient::builder()
//!     .host("https://petstore.example.com/v2")
//!     .logger(TracingSink)
//!     .build()?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::pipeline::{self, BoxedTransport, Pipeline, PipelineSettings};
use crate::{
    Connection, EndpointFactory, Error, HyperTransport, NullSink, Result, Serializer, Sink,
    SmartSerializer, Transport, TransportConfig,
};

/// A family of clients built from a [`Connection`] and an [`EndpointFactory`].
///
/// Generated code implements [`endpoint_factory`](Self::endpoint_factory)
/// and [`from_parts`](Self::from_parts); [`pipeline`](Self::pipeline) may be
/// overridden to add or reorder layers.
pub trait ClientFamily: Sized {
    /// Registry of the endpoints of this family's namespace.
    fn endpoint_factory() -> EndpointFactory;

    /// Assemble the client from its parts.
    fn from_parts(connection: Connection, endpoints: EndpointFactory) -> Self;

    /// Assemble the pipeline around the transport.
    ///
    /// Defaults to the standard four-stage pipeline.
    #[must_use]
    fn pipeline(settings: &PipelineSettings, transport: BoxedTransport) -> Pipeline {
        pipeline::assemble(settings, transport)
    }

    /// Start configuring a client of this family.
    #[must_use]
    fn builder() -> ClientBuilder<Self> {
        ClientBuilder::new()
    }
}

/// Configuration accumulated before building a client.
///
/// Every setter replaces the previous value. Nothing is validated before
/// [`build`](Self::build).
pub struct ClientBuilder<C> {
    serializer: Arc<dyn Serializer>,
    logger: Arc<dyn Sink>,
    tracer: Arc<dyn Sink>,
    host: Option<String>,
    transport: Option<BoxedTransport>,
    transport_config: TransportConfig,
    family: PhantomData<fn() -> C>,
}

impl<C> fmt::Debug for ClientBuilder<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("serializer", &self.serializer)
            .field("host", &self.host)
            .field("custom_transport", &self.transport.is_some())
            .field("transport_config", &self.transport_config)
            .finish_non_exhaustive()
    }
}

impl<C: ClientFamily> Default for ClientBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ClientFamily> ClientBuilder<C> {
    /// Builder with the defaults: [`SmartSerializer`], [`NullSink`] logger
    /// and tracer, no host, [`HyperTransport`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            serializer: Arc::new(SmartSerializer::default()),
            logger: Arc::new(NullSink),
            tracer: Arc::new(NullSink),
            host: None,
            transport: None,
            transport_config: TransportConfig::default(),
            family: PhantomData,
        }
    }

    /// Serializer used for request and response bodies.
    #[must_use]
    pub fn serializer(mut self, serializer: impl Serializer) -> Self {
        self.serializer = Arc::new(serializer);
        self
    }

    /// Sink receiving a record when a request completes or fails.
    #[must_use]
    pub fn logger(mut self, logger: impl Sink) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Sink receiving a record when a request starts.
    #[must_use]
    pub fn tracer(mut self, tracer: impl Sink) -> Self {
        self.tracer = Arc::new(tracer);
        self
    }

    /// Base URL of relative endpoint URIs, e.g. `https://api.example.com/v1`.
    ///
    /// A value without scheme is taken as `http://`.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Replace the default [`HyperTransport`].
    #[must_use]
    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(pipeline::boxed_transport(transport));
        self
    }

    /// Configuration of the default transport; ignored with a custom one.
    #[must_use]
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    /// Assemble the pipeline and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the host is not a valid HTTP(S) URL
    /// or carries a query string or fragment.
    pub fn build(self) -> Result<C> {
        let host = self.host.as_deref().map(parse_host).transpose()?;

        let mut settings = PipelineSettings::new(self.serializer);
        if let Some(host) = host {
            settings = settings.with_host(host);
        }

        let transport = self.transport.unwrap_or_else(|| {
            pipeline::boxed_transport(HyperTransport::new(self.transport_config))
        });

        debug!(
            host = settings.host.as_ref().map(Url::as_str),
            "building client"
        );

        let pipeline = C::pipeline(&settings, transport);
        let connection = Connection::new(pipeline, self.logger, self.tracer);
        Ok(C::from_parts(connection, C::endpoint_factory()))
    }
}

fn parse_host(host: &str) -> Result<Url> {
    let host = host.trim();
    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{host}")
    };

    let url = Url::parse(&candidate)
        .map_err(|e| Error::configuration(format!("invalid host {host:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::configuration(format!(
            "invalid host {host:?}: unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::configuration(format!(
            "invalid host {host:?}: missing host name"
        )));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::configuration(format!(
            "invalid host {host:?}: query and fragment are not allowed"
        )));
    }

    Ok(url)
}
