//! Transport boundary.
//!
//! The transport sends a fully resolved [`Request<Bytes>`] and reports either a
//! [`Response<Bytes>`] (whatever its status) or a [`TransportFault`]. It never
//! interprets statuses: deciding whether an exchange succeeded is the job of
//! the error classification stage.

use std::future::Future;

use bytes::Bytes;
use derive_more::{Display, Error};

use crate::{Request, Response};

/// Outcome of a raw exchange: a response with any status, or a fault.
pub type RawOutcome = std::result::Result<Response<Bytes>, TransportFault>;

/// Category of a fault that happened below HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum FaultKind {
    /// The connection was refused or reset while connecting.
    #[display("connection failed")]
    Connect,
    /// The host name could not be resolved.
    #[display("name resolution failed")]
    Dns,
    /// The transport gave up waiting.
    #[display("timed out")]
    Timeout,
    /// TLS handshake or certificate failure.
    #[display("TLS failure")]
    Tls,
    /// Malformed exchange or body read failure.
    #[display("protocol error")]
    Protocol,
    /// The exchange was cancelled by the transport.
    #[display("cancelled")]
    Cancelled,
}

/// Connectivity-level fault with the transport's diagnostic attached.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("{kind}: {message}")]
pub struct TransportFault {
    /// Fault category.
    pub kind: FaultKind,
    /// Diagnostic reported by the transport.
    #[error(not(source))]
    pub message: String,
}

impl TransportFault {
    /// Create a fault of the given kind.
    #[must_use]
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Connection refused or reset.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Connect, message)
    }

    /// Transport timeout.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout, message)
    }

    /// Malformed exchange.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Protocol, message)
    }
}

/// Raw network capability consumed by the pipeline.
///
/// Implement this trait to plug another HTTP stack, or a mock in tests.
///
/// # Example
///
/// ```ignore
/// use gimlet_core::{RawOutcome, Request, Response, Transport};
///
/// struct Canned;
///
/// impl Transport for Canned {
///     async fn send(&self, _request: Request<Bytes>) -> RawOutcome {
///         Ok(Response::new(204, HashMap::new(), Bytes::new()))
///     }
/// }
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Send the request and report the raw outcome.
    fn send(&self, request: Request<Bytes>) -> impl Future<Output = RawOutcome> + Send;
}
