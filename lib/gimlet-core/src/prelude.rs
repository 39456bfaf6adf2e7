//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use gimlet_core::prelude::*;
//! ```

pub use crate::{
    Endpoint, EndpointExt, EndpointFactory, Error, Method, Params, Request, Response, Result,
    Serializer, SmartSerializer, StructuredResponse, Transport, TransportFault, UriTemplate, Value,
    endpoint, from_value,
};
