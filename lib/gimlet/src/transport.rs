//! Default transport built on hyper-util.

use std::collections::HashMap;
use std::error::Error as StdError;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use crate::{FaultKind, RawOutcome, Request, Response, Transport, TransportConfig, TransportFault};

/// [`Transport`] over a pooled hyper client, HTTP/1.1 and HTTP/2, plain or
/// TLS (rustls with the Mozilla roots).
///
/// Every failure is reported as a [`TransportFault`]; an elapsed
/// [`TransportConfig::timeout`] becomes [`FaultKind::Timeout`].
#[derive(Clone)]
pub struct HyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl HyperTransport {
    /// Create a transport with its own connection pool.
    ///
    /// Sending requires a Tokio runtime; construction does not.
    #[must_use]
    pub fn new(config: TransportConfig) -> Self {
        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector());

        Self { inner, config }
    }

    /// Transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn build_hyper_request(
        request: Request<Bytes>,
    ) -> Result<http::Request<Full<Bytes>>, TransportFault> {
        let (method, uri, headers, body) = request.into_parts();

        let mut builder = http::Request::builder()
            .method(http::Method::from(method))
            .uri(uri);

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(body.map_or_else(Full::default, Full::new))
            .map_err(|e| TransportFault::protocol(format!("invalid request: {e}")))
    }

    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    async fn exchange(&self, request: Request<Bytes>) -> RawOutcome {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = self
            .inner
            .request(hyper_request)
            .await
            .map_err(|e| map_hyper_error(&e))?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| TransportFault::protocol(describe(&e)))?
            .to_bytes();

        Ok(Response::new(status, headers, body))
    }
}

impl Transport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> RawOutcome {
        let method = request.method();
        let uri = request.uri().to_string();

        let outcome = tokio::time::timeout(self.config.timeout, self.exchange(request))
            .await
            .unwrap_or_else(|_| {
                Err(TransportFault::timeout(format!(
                    "no response within {:?}",
                    self.config.timeout
                )))
            });

        match &outcome {
            Ok(response) => debug!(%method, %uri, status = response.status(), "exchange done"),
            Err(fault) => debug!(%method, %uri, kind = %fault.kind, "exchange failed"),
        }
        outcome
    }
}

fn connector() -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build()
}

/// Error message followed by its whole source chain.
fn describe(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn map_hyper_error(error: &hyper_util::client::legacy::Error) -> TransportFault {
    let message = describe(error);
    let lower = message.to_lowercase();

    let kind = if lower.contains("dns") || lower.contains("resolve") {
        FaultKind::Dns
    } else if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
        FaultKind::Tls
    } else if error.is_connect() {
        FaultKind::Connect
    } else if lower.contains("canceled") || lower.contains("cancelled") {
        FaultKind::Cancelled
    } else {
        FaultKind::Protocol
    };

    TransportFault::new(kind, message)
}
