//! HTTP response handling.
//!
//! The transport produces a [`Response<Bytes>`]; the deserialization stage
//! hands callers a [`StructuredResponse`] whose body is already decoded.
//!
//! # Example
//!
//! ```ignore
//! let response = connection.perform(&endpoint).await?;
//! let pet: Pet = response.json()?;
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::Value;

use crate::request::find_header;

/// Decoded success value returned to callers.
pub type StructuredResponse = Response<Value>;

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HashMap<String, String>,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Response `Content-Type`, if any.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HashMap<String, String>, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }
}

impl Response<Value> {
    /// Convert the decoded body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns an encoding error naming the path of the mismatching field.
    pub fn json<T: serde::de::DeserializeOwned>(self) -> crate::Result<T> {
        crate::from_value(self.body)
    }
}
