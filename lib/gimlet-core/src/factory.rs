//! Endpoint lookup by operation name.
//!
//! Generated code registers one constructor per operation, once, and clients
//! resolve operations by their exact name. This is the only place where an
//! operation name turns into a concrete endpoint type.
//!
//! # Example
//!
//! ```
//! use std::sync::LazyLock;
//!
//! use gimlet_core::{Endpoint, EndpointFactory, endpoint};
//!
//! endpoint! {
//!     pub struct ListPets => Get "/pets";
//! }
//!
//! static PETSTORE: LazyLock<EndpointFactory> = LazyLock::new(|| {
//!     EndpointFactory::new("petstore").register("ListPets", || Box::new(ListPets::default()))
//! });
//!
//! let endpoint = PETSTORE.create("ListPets").expect("registered");
//! assert_eq!(endpoint.uri(), "/pets");
//! assert!(PETSTORE.create("Unknown").is_err());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{Endpoint, Error, Result};

/// Constructor of a fresh endpoint instance.
pub type EndpointConstructor = fn() -> Box<dyn Endpoint>;

/// Registry of the endpoints of one generated namespace.
///
/// Cheap to clone: the registration table is shared.
#[derive(Clone)]
pub struct EndpointFactory {
    namespace: Arc<str>,
    constructors: Arc<HashMap<&'static str, EndpointConstructor>>,
}

impl EndpointFactory {
    /// Create an empty registry for a namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Arc::from(namespace.into()),
            constructors: Arc::new(HashMap::new()),
        }
    }

    /// Register an operation; a later registration under the same name wins.
    #[must_use]
    pub fn register(mut self, name: &'static str, constructor: EndpointConstructor) -> Self {
        Arc::make_mut(&mut self.constructors).insert(name, constructor);
        self
    }

    /// Register several operations at once.
    #[must_use]
    pub fn register_all(
        mut self,
        entries: impl IntoIterator<Item = (&'static str, EndpointConstructor)>,
    ) -> Self {
        Arc::make_mut(&mut self.constructors).extend(entries);
        self
    }

    /// Namespace of the generated endpoints.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns `true` if an operation is registered under this exact name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered operation names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Create a fresh endpoint for an operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if no operation is registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Endpoint>> {
        self.constructors
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "unknown endpoint {name:?} in namespace {:?}",
                    self.namespace
                ))
            })
    }
}

impl fmt::Debug for EndpointFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointFactory")
            .field("namespace", &self.namespace)
            .field("endpoints", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{EndpointExt, Method};

    crate::endpoint! {
        struct Foo => Get "/foo";
    }

    crate::endpoint! {
        struct Bar => Post "/bar";
    }

    fn factory() -> EndpointFactory {
        EndpointFactory::new("test")
            .register("Foo", || Box::new(Foo::default()))
            .register("Bar", || Box::new(Bar::default()))
    }

    #[test]
    fn create_returns_distinct_instances() {
        let factory = factory();
        let mut first = factory.create("Foo").expect("first");
        let second = factory.create("Foo").expect("second");

        first.set_body(json!({"mutated": true}));

        assert!(second.body().is_none());
        assert!(!std::ptr::addr_eq(first.as_ref(), second.as_ref()));
        for endpoint in [&first, &second] {
            assert_eq!(endpoint.method(), Method::Get);
            assert!(!endpoint.uri().is_empty());
        }
    }

    #[test]
    fn lookup_is_exact() {
        let factory = factory();
        assert!(factory.contains("Foo"));
        assert!(!factory.contains("foo"));

        let err = factory.create("foo").expect_err("case sensitive");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("\"test\""), "{err}");
    }

    #[test]
    fn names_are_sorted() {
        assert_eq!(factory().names(), vec!["Bar", "Foo"]);
    }

    #[test]
    fn register_all_and_override() {
        let foo: EndpointConstructor = || Box::new(Foo::default());
        let factory = EndpointFactory::new("ns")
            .register_all([("Op", foo)])
            .register("Op", || Box::new(Bar::default()));

        assert_eq!(factory.create("Op").expect("op").method(), Method::Post);
        assert_eq!(factory.namespace(), "ns");
    }

    #[test]
    fn debug_lists_endpoints() {
        let debug = format!("{:?}", factory());
        assert!(debug.contains("Bar"));
        assert!(debug.contains("Foo"));
    }
}
