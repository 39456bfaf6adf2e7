//! Error taxonomy surfaced to callers of generated clients.
//!
//! Every failure of a request ends up as exactly one [`Error`] kind:
//!
//! | Kind | Trigger |
//! |------|---------|
//! | [`Error::Configuration`] | missing/invalid host, unknown endpoint, malformed endpoint |
//! | [`Error::Encoding`] | body cannot be encoded, response cannot be decoded |
//! | [`Error::Request`] | the server answered with a 4xx status |
//! | [`Error::Server`] | the server answered with a 5xx status |
//! | [`Error::Transport`] | no HTTP status at all (refused, DNS, timeout, TLS) |

use std::collections::HashMap;

use bytes::Bytes;
use derive_more::{Display, Error};
use serde_json::Value;

use crate::{FaultKind, Method, TransportFault};

// ============================================================================
// Status Error Payload
// ============================================================================

/// Context attached to [`Error::Request`] and [`Error::Server`].
#[derive(Debug, Clone, Display)]
#[display("HTTP {status} on {method} {uri}")]
pub struct StatusError {
    /// HTTP status code.
    pub status: u16,
    /// Method of the failed request.
    pub method: Method,
    /// Request URI as given by the endpoint, relative unless the endpoint
    /// declared an absolute one; the host is not part of it.
    pub uri: String,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Raw response body.
    pub body: Bytes,
    /// Response body decoded by the configured serializer, when decodable.
    pub decoded: Option<Value>,
}

impl StatusError {
    /// Create a status error without headers or body.
    #[must_use]
    pub fn new(status: u16, method: Method, uri: impl Into<String>) -> Self {
        Self {
            status,
            method,
            uri: uri.into(),
            headers: HashMap::new(),
            body: Bytes::new(),
            decoded: None,
        }
    }

    /// Attach the raw response headers and body.
    #[must_use]
    pub fn with_payload(mut self, headers: HashMap<String, String>, body: Bytes) -> Self {
        self.headers = headers;
        self.body = body;
        self
    }

    /// Response `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        crate::request::find_header(&self.headers, "Content-Type")
    }
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for gimlet operations.
#[derive(Debug, Display, Error)]
pub enum Error {
    /// Programmer-facing fault: detected before anything is sent.
    #[display("configuration error: {_0}")]
    Configuration(#[error(not(source))] String),

    /// A body could not be encoded, or a response could not be decoded.
    #[display("encoding error ({content_type}): {message}")]
    Encoding {
        /// Offending content type.
        content_type: String,
        /// Underlying cause.
        message: String,
    },

    /// The server answered with a client error status (4xx).
    #[display("request error: {_0}")]
    Request(#[error(not(source))] StatusError),

    /// The server answered with a server error status (5xx).
    #[display("server error: {_0}")]
    Server(#[error(not(source))] StatusError),

    /// The exchange failed below HTTP: no status is available.
    #[display("transport error: {_0}")]
    Transport(TransportFault),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an encoding error.
    #[must_use]
    pub fn encoding(content_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            content_type: content_type.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` if this is an encoding error.
    #[must_use]
    pub const fn is_encoding(&self) -> bool {
        matches!(self, Self::Encoding { .. })
    }

    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if no node could be reached at all (refused or unresolved host).
    #[must_use]
    pub const fn is_no_node_available(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportFault {
                kind: FaultKind::Connect | FaultKind::Dns,
                ..
            })
        )
    }

    /// Returns `true` if the transport gave up waiting.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportFault {
                kind: FaultKind::Timeout,
                ..
            })
        )
    }

    /// Returns the status payload of a 4xx/5xx error.
    #[must_use]
    pub const fn status_error(&self) -> Option<&StatusError> {
        match self {
            Self::Request(error) | Self::Server(error) => Some(error),
            _ => None,
        }
    }

    /// Mutable access to the status payload, used to enrich it after classification.
    pub fn status_error_mut(&mut self) -> Option<&mut StatusError> {
        match self {
            Self::Request(error) | Self::Server(error) => Some(error),
            _ => None,
        }
    }

    /// Returns the HTTP status code if the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status_error().map(|error| error.status)
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::Request(_))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Hint for caller-level retry policies: server and transport faults only.
    ///
    /// The pipeline itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Server(_) | Self::Transport(_))
    }

    /// Raw body of a 4xx/5xx response.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.status_error().map(|error| &error.body)
    }

    /// Decoded body of a 4xx/5xx response, when the serializer could decode it.
    #[must_use]
    pub fn decoded_body(&self) -> Option<&Value> {
        self.status_error().and_then(|error| error.decoded.as_ref())
    }

    /// Convert the decoded error body into a typed value.
    ///
    /// Returns `None` when there is no decoded body.
    ///
    /// # Example
    ///
    /// ```ignore
    /// #[derive(Debug, Deserialize)]
    /// struct ApiError {
    ///     error: String,
    /// }
    ///
    /// if let Some(Ok(api_error)) = err.decode_body::<ApiError>() {
    ///     println!("API error: {}", api_error.error);
    /// }
    /// ```
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.decoded_body()
            .map(|value| crate::from_value(value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn not_found() -> Error {
        Error::Request(StatusError::new(404, Method::Get, "/items"))
    }

    #[test]
    fn error_display() {
        check!(
            not_found().to_string() == "request error: HTTP 404 on GET /items"
        );
        check!(
            Error::configuration("no host configured").to_string()
                == "configuration error: no host configured"
        );
        check!(
            Error::encoding("application/json", "expected value").to_string()
                == "encoding error (application/json): expected value"
        );
        check!(
            Error::Transport(TransportFault::connect("connection refused")).to_string()
                == "transport error: connection failed: connection refused"
        );
    }

    #[test]
    fn error_status() {
        let err = not_found();
        check!(err.status() == Some(404));
        check!(err.is_client_error());
        check!(!err.is_server_error());
        check!(err.is_not_found());

        let err = Error::Server(StatusError::new(503, Method::Post, "/items"));
        check!(err.status() == Some(503));
        check!(err.is_server_error());
        check!(err.is_retryable());

        let err = Error::Transport(TransportFault::timeout("30s elapsed"));
        check!(err.status().is_none());
        check!(err.is_timeout());
        check!(!err.is_client_error());
    }

    #[test]
    fn no_node_available_covers_connect_and_dns() {
        check!(Error::Transport(TransportFault::connect("refused")).is_no_node_available());
        check!(
            Error::Transport(TransportFault::new(FaultKind::Dns, "unknown host"))
                .is_no_node_available()
        );
        check!(!Error::Transport(TransportFault::timeout("slow")).is_no_node_available());
    }

    #[test]
    fn configuration_and_encoding_are_not_retryable() {
        check!(!Error::configuration("bad").is_retryable());
        check!(!Error::encoding("text/plain", "bad").is_retryable());
        check!(!not_found().is_retryable());
    }

    #[test]
    fn error_decode_body() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct ApiError {
            error: String,
        }

        let mut err = not_found();
        check!(err.decode_body::<ApiError>().is_none());

        if let Some(status) = err.status_error_mut() {
            status.decoded = Some(serde_json::json!({"error": "missing"}));
        }

        let_assert!(Some(Ok(decoded)) = err.decode_body::<ApiError>());
        check!(
            decoded
                == ApiError {
                    error: "missing".to_string()
                }
        );

        check!(
            Error::configuration("x")
                .decode_body::<ApiError>()
                .is_none()
        );
    }

    #[test]
    fn status_error_content_type_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        let status = StatusError::new(400, Method::Get, "/").with_payload(headers, Bytes::new());
        check!(status.content_type() == Some("application/json"));
    }
}
