//! Host resolution stage.

use std::task::{Context, Poll};

use http::Uri;
use serde_json::Value;
use tower::Layer;
use tower_service::Service;
use tracing::debug;
use url::Url;

use super::{StageFuture, take_ready};
use crate::{Error, Request, Result};

/// Layer resolving relative request URIs against the configured host.
///
/// The host may carry a base path (`https://example.com/api/v1`); it prefixes
/// every endpoint path. A request whose URI is already absolute keeps it.
#[derive(Debug, Clone, Default)]
pub struct HostResolutionLayer {
    host: Option<Url>,
}

impl HostResolutionLayer {
    /// Create the layer. `None` means no host was configured.
    #[must_use]
    pub fn new(host: Option<Url>) -> Self {
        Self { host }
    }
}

impl<S> Layer<S> for HostResolutionLayer {
    type Service = HostResolution<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HostResolution {
            inner,
            host: self.host.clone(),
        }
    }
}

/// Service rewriting the request target before handing it to the inner service.
#[derive(Debug, Clone)]
pub struct HostResolution<S> {
    inner: S,
    host: Option<Url>,
}

impl<S> HostResolution<S> {
    /// Resolve a request target against a host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when the target is relative and no
    /// host is configured.
    pub fn resolve(host: Option<&Url>, uri: &Uri) -> Result<Uri> {
        if uri.scheme().is_some() {
            return Ok(uri.clone());
        }

        let host = host.ok_or_else(|| {
            Error::configuration(format!(
                "no host configured to resolve relative URI {uri}"
            ))
        })?;

        let mut base = host.clone();
        base.set_query(None);
        base.set_fragment(None);
        let base = base.as_str().trim_end_matches('/');
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        let separator = if path_and_query.starts_with('/') { "" } else { "/" };

        let resolved = format!("{base}{separator}{path_and_query}");
        resolved
            .parse::<Uri>()
            .map_err(|e| Error::configuration(format!("invalid resolved URI {resolved:?}: {e}")))
    }
}

impl<S, R> Service<Request<Value>> for HostResolution<S>
where
    S: Service<Request<Value>, Response = R, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
    R: Send + 'static,
{
    type Response = R;
    type Error = Error;
    type Future = StageFuture<R>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Value>) -> Self::Future {
        let resolved = Self::resolve(self.host.as_ref(), request.uri());
        let mut inner = take_ready(&mut self.inner);

        Box::pin(async move {
            let resolved = resolved?;
            debug!(uri = %resolved, "resolved request target");
            request.set_uri(resolved);
            inner.call(request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use tower::service_fn;

    use super::*;
    use crate::Method;
    use crate::pipeline::testing::call;

    fn url(value: &str) -> Url {
        Url::parse(value).expect("url")
    }

    fn uri(value: &str) -> Uri {
        value.parse().expect("uri")
    }

    fn resolve(host: Option<&str>, target: &str) -> Result<String> {
        let host = host.map(url);
        HostResolution::<()>::resolve(host.as_ref(), &uri(target)).map(|uri| uri.to_string())
    }

    #[test]
    fn relative_uri_uses_host() {
        check!(
            resolve(Some("http://api.test"), "/items?q=x").expect("resolved")
                == "http://api.test/items?q=x"
        );
    }

    #[test]
    fn host_base_path_is_preserved() {
        check!(
            resolve(Some("https://example.com/api/v1/"), "/pets/1").expect("resolved")
                == "https://example.com/api/v1/pets/1"
        );
    }

    #[test]
    fn absolute_uri_overrides_host() {
        check!(
            resolve(Some("http://api.test"), "https://other.test/health").expect("resolved")
                == "https://other.test/health"
        );
        check!(resolve(None, "https://other.test/health").is_ok());
    }

    #[test]
    fn host_query_and_fragment_are_not_joined() {
        check!(
            resolve(Some("http://api.test/v1?key=abc#top"), "/items?q=x").expect("resolved")
                == "http://api.test/v1/items?q=x"
        );
    }

    #[test]
    fn missing_host_is_configuration_error() {
        let_assert!(Err(err) = resolve(None, "/items"));
        check!(err.is_configuration());
    }

    #[tokio::test]
    async fn stage_rewrites_before_calling_inner() {
        let inner = service_fn(|request: Request<Value>| async move {
            Ok::<_, Error>(request.uri().to_string())
        });
        let service = HostResolutionLayer::new(Some(url("http://localhost:9200"))).layer(inner);

        let request = Request::builder(Method::Get, "/_search")
            .build()
            .expect("request");
        let target = call(service, request).await.expect("target");

        check!(target == "http://localhost:9200/_search");
    }

    #[tokio::test]
    async fn stage_fails_without_calling_inner() {
        let inner = service_fn(|_: Request<Value>| async move {
            Err::<(), _>(Error::configuration("inner must not be called"))
        });
        let service = HostResolutionLayer::default().layer(inner);

        let request = Request::builder(Method::Get, "/_search")
            .build()
            .expect("request");
        let err = call(service, request).await.expect_err("no host");

        check!(err.to_string().contains("no host configured"));
    }
}
