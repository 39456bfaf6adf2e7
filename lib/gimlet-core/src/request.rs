//! Raw request flowing through the pipeline.
//!
//! A [`Request`] starts with a structured body (`Request<Value>`) and a target
//! that may still be relative to the configured host. The serialization stage
//! turns it into a `Request<Bytes>`, the host stage makes the target absolute.
//!
//! # Example
//!
//! ```
//! use gimlet_core::{Method, Request};
//! use serde_json::Value;
//!
//! let request = Request::<Value>::builder(Method::Get, "/items")
//!     .query("q", "x")
//!     .header("Accept", "application/json")
//!     .build()
//!     .expect("valid request");
//!
//! assert_eq!(request.uri().to_string(), "/items?q=x");
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use http::Uri;

use crate::{Error, Method, Result};

/// Case-insensitive header lookup.
pub(crate) fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// An HTTP request with method, target URI, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    uri: Uri,
    headers: HashMap<String, String>,
    body: Option<B>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, uri: impl Into<String>) -> RequestBuilder<B> {
        RequestBuilder::new(method, uri)
    }

    /// Assemble a request from already validated parts.
    #[must_use]
    pub fn from_parts(
        method: Method,
        uri: Uri,
        headers: HashMap<String, String>,
        body: Option<B>,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Target URI, relative until host resolution.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Replace the target URI.
    pub fn set_uri(&mut self, uri: Uri) {
        self.uri = uri;
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Set a header, replacing any value stored under another casing.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Remove a header under any casing.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Consume into (method, uri, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, Uri, HashMap<String, String>, Option<B>) {
        (self.method, self.uri, self.headers, self.body)
    }

    /// Swap the body for another representation, keeping everything else.
    pub fn try_map_body<F, B2>(self, f: F) -> Result<Request<B2>>
    where
        F: FnOnce(B) -> Result<B2>,
    {
        Ok(Request {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body.map(f).transpose()?,
        })
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: HashMap<String, String>,
    body: Option<B>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            query: Vec::new(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends multiple query parameters.
    #[must_use]
    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets or clears the request body.
    #[must_use]
    pub fn maybe_body(mut self, body: Option<B>) -> Self {
        self.body = body;
        self
    }

    /// Builds the [`Request`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the URI is empty or malformed.
    pub fn build(self) -> Result<Request<B>> {
        if self.uri.trim().is_empty() {
            return Err(Error::configuration("endpoint URI is empty"));
        }

        let mut target = self.uri;
        if !self.query.is_empty() {
            let query = serde_html_form::to_string(&self.query)
                .map_err(|e| Error::configuration(format!("invalid query parameters: {e}")))?;
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&query);
        }

        let uri = target
            .parse::<Uri>()
            .map_err(|e| Error::configuration(format!("invalid URI {target:?}: {e}")))?;

        Ok(Request {
            method: self.method,
            uri,
            headers: self.headers,
            body: self.body,
        })
    }
}
