//! The dependency lookup the router depends on.
//!
//! Named middlewares and controller aliases are resolved through a [`Resolver`] handed
//! to the [`Router`](crate::Router) when it is built. Hosts usually adapt their own
//! container; [`Container`] is a plain in-memory one.

use crate::controller::Controller;
use crate::error::RouteError;
use crate::middleware::Capabilities;
use std::collections::HashMap;
use std::sync::Arc;

/// What an alias can be bound to.
#[derive(Debug, Clone)]
pub enum Binding {
    Middleware(Capabilities),
    Controller(Arc<Controller>),
}

/// Looks up aliases.
///
/// Caching is up to the implementation, the router never keeps resolved bindings per request.
pub trait Resolver: Send + Sync {
    fn try_resolve(&self, alias: &str) -> Option<Binding>;

    fn resolve(&self, alias: &str) -> Result<Binding, RouteError> {
        self.try_resolve(alias).ok_or_else(|| RouteError::unresolved(alias))
    }

    fn has(&self, alias: &str) -> bool {
        self.try_resolve(alias).is_some()
    }
}

/// A [`Resolver`] backed by a map.
#[derive(Debug, Clone, Default)]
pub struct Container {
    bindings: HashMap<String, Binding>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, alias: impl Into<String>, binding: Binding) -> &mut Self {
        self.bindings.insert(alias.into(), binding);
        self
    }

    pub fn bind_middleware(&mut self, alias: impl Into<String>, capabilities: Capabilities) -> &mut Self {
        self.bind(alias, Binding::Middleware(capabilities))
    }

    pub fn bind_controller(&mut self, alias: impl Into<String>, controller: impl Into<Arc<Controller>>) -> &mut Self {
        self.bind(alias, Binding::Controller(controller.into()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Resolver for Container {
    fn try_resolve(&self, alias: &str) -> Option<Binding> {
        self.bindings.get(alias).cloned()
    }

    fn has(&self, alias: &str) -> bool {
        self.bindings.contains_key(alias)
    }
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn try_resolve(&self, alias: &str) -> Option<Binding> {
        (**self).try_resolve(alias)
    }

    fn resolve(&self, alias: &str) -> Result<Binding, RouteError> {
        (**self).resolve(alias)
    }

    fn has(&self, alias: &str) -> bool {
        (**self).has(alias)
    }
}
