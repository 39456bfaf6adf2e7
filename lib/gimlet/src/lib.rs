//! Runtime for OpenAPI-generated HTTP clients.
//!
//! Generated code declares endpoints and a registry (see [`gimlet_core`]);
//! this crate turns them into network exchanges through a four-stage Tower
//! pipeline:
//!
//! ```text
//! Connection::perform(endpoint)
//!   -> ResponseDeserialization -> ErrorClassification
//!   -> HostResolution -> RequestSerialization -> Transport
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gimlet::prelude::*;
//!
//! endpoint! {
//!     /// Search items.
//!     pub struct SearchItems => Get "/items";
//! }
//!
//! struct ItemsClient { connection: Connection, endpoints: EndpointFactory }
//!
//! impl ClientFamily for ItemsClient {
//!     fn endpoint_factory() -> EndpointFactory {
//!         EndpointFactory::new("items").register("SearchItems", || Box::new(SearchItems::default()))
//!     }
//!
//!     fn from_parts(connection: Connection, endpoints: EndpointFactory) -> Self {
//!         Self { connection, endpoints }
//!     }
//! }
//!
//! let client = ItemsClient::builder().host("http://localhost:8080").build()?;
//! let mut search = client.endpoints.create("SearchItems")?;
//! search.set_param("q", "x");
//! let response = client.connection.perform(search.as_ref()).await?;
//! ```

mod builder;
mod config;
mod connection;
pub mod pipeline;
pub mod prelude;
mod sink;
mod transport;

pub use builder::{ClientBuilder, ClientFamily};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use connection::Connection;
pub use sink::{NullSink, Record, Sink, TracingSink};
pub use transport::HyperTransport;

// Re-export tower for custom pipeline layers
pub use tower;

// Re-export core types
pub use gimlet_core::{
    ContentType, Endpoint, EndpointConstructor, EndpointExt, EndpointFactory, Error, FaultKind,
    FormSerializer, JsonSerializer, Method, Params, Payload, RawOutcome, Request, RequestBuilder,
    Response, Result, Serializer, SmartSerializer, StatusError, StructuredResponse, TextSerializer,
    Transport, TransportFault, UriTemplate, Value, endpoint, essence, from_value, serde_json,
};
