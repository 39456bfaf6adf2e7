//! Prelude module for convenient imports.
//!
//! This module re-exports what generated clients and their callers use most:
//!
//! ```ignore
//! use gimlet::prelude::*;
//! ```

pub use crate::{
    ClientBuilder, ClientFamily, Connection, Endpoint, EndpointExt, EndpointFactory, Error,
    HyperTransport, Method, Params, Result, Serializer, Sink, SmartSerializer, StructuredResponse,
    TracingSink, TransportConfig, UriTemplate, Value, endpoint, from_value,
};
pub use serde::{Deserialize, Serialize};
