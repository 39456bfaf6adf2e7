//! Core types and traits for gimlet, the runtime of OpenAPI-generated clients.
//!
//! This crate provides the foundational types used by gimlet:
//! - [`Endpoint`], [`EndpointExt`] and [`endpoint!`] - Operation descriptors implemented by generated code
//! - [`EndpointFactory`] - Operation name to endpoint registry
//! - [`UriTemplate`] - Path placeholders of generated endpoints
//! - [`Method`] - HTTP method enum
//! - [`Request`] and [`RequestBuilder`] - Raw request flowing through the pipeline
//! - [`Response`] and [`StructuredResponse`] - Raw and decoded responses
//! - [`Serializer`] and [`SmartSerializer`] - Body encoding and content negotiation
//! - [`Transport`], [`TransportFault`] and [`RawOutcome`] - Network boundary
//! - [`Error`] and [`Result`] - Error taxonomy

mod endpoint;
mod error;
mod factory;
mod method;
pub mod prelude;
mod request;
mod response;
mod serializer;
mod transport;
mod uri_template;

pub use endpoint::{Endpoint, EndpointExt, Params};
pub use error::{Error, Result, StatusError};
pub use factory::{EndpointConstructor, EndpointFactory};
pub use method::Method;
pub use request::{Request, RequestBuilder};
pub use response::{Response, StructuredResponse};
pub use serializer::{
    ContentType, FormSerializer, JsonSerializer, Payload, Serializer, SmartSerializer,
    TextSerializer, essence, from_value,
};
pub use transport::{FaultKind, RawOutcome, Transport, TransportFault};
pub use uri_template::UriTemplate;

// Re-exported for the `endpoint!` macro and generated code
pub use serde_json;
pub use serde_json::Value;
