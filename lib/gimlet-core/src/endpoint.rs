//! Endpoint contract implemented by generated code.
//!
//! An [`Endpoint`] describes one API operation. Method and URI are fixed by
//! the generated type; params and body are set by the caller before the
//! endpoint is handed to a connection.
//!
//! # Example
//!
//! ```
//! use gimlet_core::{Endpoint, EndpointExt, Method, endpoint};
//! use serde_json::json;
//!
//! endpoint! {
//!     /// Search items.
//!     pub struct SearchItems => Get "/items";
//! }
//!
//! let mut search = SearchItems::default();
//! search
//!     .set_param("q", "x")
//!     .set_body(json!({"filter": "new"}));
//!
//! assert_eq!(search.method(), Method::Get);
//! assert_eq!(search.params().and_then(|p| p.get("q")).map(String::as_str), Some("x"));
//! ```

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::{Method, UriTemplate};

/// Query parameters of an endpoint, kept sorted for a stable wire order.
pub type Params = BTreeMap<String, String>;

/// Descriptor of one API operation.
///
/// Implemented by generated code, usually through [`endpoint!`](crate::endpoint).
/// `params`/`body` set to `None` are omitted from the request entirely.
pub trait Endpoint: fmt::Debug + Send + Sync {
    /// HTTP method of the operation.
    fn method(&self) -> Method;

    /// URI of the operation, relative to the client host unless absolute.
    fn uri(&self) -> Cow<'_, str>;

    /// Query parameters.
    fn params(&self) -> Option<&Params>;

    /// Structured request body.
    fn body(&self) -> Option<&Value>;

    /// Preferred request content type, overriding the serializer's choice.
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Template the URI comes from, when it has `{name}` placeholders.
    ///
    /// Placeholders are filled from the params of the same name; those params
    /// are then left out of the query string.
    fn path_template(&self) -> Option<UriTemplate> {
        None
    }

    /// Replace the query parameters.
    fn replace_params(&mut self, params: Option<Params>);

    /// Replace the request body.
    fn replace_body(&mut self, body: Option<Value>);
}

/// Fluent setters for every [`Endpoint`], including `dyn Endpoint`.
pub trait EndpointExt: Endpoint {
    /// Set (or clear with `None`) the query parameters.
    fn set_params(&mut self, params: impl Into<Option<Params>>) -> &mut Self {
        self.replace_params(params.into());
        self
    }

    /// Add a single query parameter, keeping the others.
    fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let mut params = self.params().cloned().unwrap_or_default();
        params.insert(name.into(), value.into());
        self.replace_params(Some(params));
        self
    }

    /// Set (or clear with `None`) the request body.
    fn set_body(&mut self, body: impl Into<Option<Value>>) -> &mut Self {
        self.replace_body(body.into());
        self
    }
}

impl<E: Endpoint + ?Sized> EndpointExt for E {}

/// Declare an endpoint type with a fixed method and URI.
///
/// The generated struct stores optional params and body and implements
/// [`Default`] and [`Endpoint`]. The URI may hold `{name}` placeholders,
/// filled from the params at send time. An optional `as "<content type>"`
/// suffix sets the preferred request content type.
///
/// ```
/// use gimlet_core::{Endpoint, Method, endpoint};
///
/// endpoint! {
///     /// Log in with a form body.
///     pub struct Login => Post "/login" as "application/x-www-form-urlencoded";
/// }
///
/// let login = Login::default();
/// assert_eq!(login.method(), Method::Post);
/// assert_eq!(login.content_type(), Some("application/x-www-form-urlencoded"));
/// ```
#[macro_export]
macro_rules! endpoint {
    ($(#[$meta:meta])* $vis:vis struct $name:ident => $method:ident $uri:literal $(as $content_type:literal)?;) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        $vis struct $name {
            params: ::core::option::Option<$crate::Params>,
            body: ::core::option::Option<$crate::serde_json::Value>,
        }

        impl $crate::Endpoint for $name {
            fn method(&self) -> $crate::Method {
                $crate::Method::$method
            }

            fn uri(&self) -> ::std::borrow::Cow<'_, str> {
                ::std::borrow::Cow::Borrowed($uri)
            }

            fn params(&self) -> ::core::option::Option<&$crate::Params> {
                self.params.as_ref()
            }

            fn body(&self) -> ::core::option::Option<&$crate::serde_json::Value> {
                self.body.as_ref()
            }

            fn path_template(&self) -> ::core::option::Option<$crate::UriTemplate> {
                ::core::option::Option::Some($crate::UriTemplate::new($uri))
            }

            $(
            fn content_type(&self) -> ::core::option::Option<&str> {
                ::core::option::Option::Some($content_type)
            }
            )?

            fn replace_params(&mut self, params: ::core::option::Option<$crate::Params>) {
                self.params = params;
            }

            fn replace_body(&mut self, body: ::core::option::Option<$crate::serde_json::Value>) {
                self.body = body;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    crate::endpoint! {
        /// Delete an item.
        struct DeleteItem => Delete "/items/1";
    }

    #[test]
    fn generated_endpoint_starts_empty() {
        let endpoint = DeleteItem::default();

        assert_eq!(endpoint.method(), Method::Delete);
        assert_eq!(endpoint.uri(), "/items/1");
        assert!(endpoint.params().is_none());
        assert!(endpoint.body().is_none());
        assert!(endpoint.content_type().is_none());
    }

    #[test]
    fn setters_chain_on_the_same_instance() {
        let mut endpoint = DeleteItem::default();
        endpoint
            .set_param("force", "true")
            .set_param("reason", "dup")
            .set_body(json!({"audit": true}));

        let params = endpoint.params().expect("params");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("force").map(String::as_str), Some("true"));
        assert_eq!(endpoint.body(), Some(&json!({"audit": true})));
    }

    crate::endpoint! {
        /// Fetch one item.
        struct GetItem => Get "/items/{itemId}";
    }

    #[test]
    fn generated_endpoint_exposes_its_template() {
        let mut endpoint = GetItem::default();
        endpoint.set_param("itemId", "a b").set_param("expand", "tags");

        assert_eq!(endpoint.uri(), "/items/{itemId}");
        let template = endpoint.path_template().expect("template");
        let (uri, query) = template
            .expand_params(endpoint.params().cloned().unwrap_or_default())
            .expect("expand");
        assert_eq!(uri, "/items/a%20b");
        assert_eq!(query.keys().collect::<Vec<_>>(), vec!["expand"]);
    }

    #[test]
    fn setters_clear_with_none() {
        let mut endpoint = DeleteItem::default();
        endpoint.set_body(json!(1)).set_body(None);
        endpoint.set_param("a", "b").set_params(None);

        assert!(endpoint.body().is_none());
        assert!(endpoint.params().is_none());
    }

    #[test]
    fn setters_work_through_trait_objects() {
        let mut endpoint: Box<dyn Endpoint> = Box::new(DeleteItem::default());
        endpoint.set_param("q", "x").set_body(json!(null));

        assert_eq!(
            endpoint.params().and_then(|p| p.get("q")).map(String::as_str),
            Some("x")
        );
        assert_eq!(endpoint.body(), Some(&Value::Null));
    }
}
