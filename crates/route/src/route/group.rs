use crate::error::RouteError;
use crate::middleware::{MiddlewareKind, MiddlewareRef, MiddlewareResolver};
use crate::route::{PhaseCursor, RouteNode, RouteSpec};
use serde_json::Value;

/// An ordered set of routes, resources and nested groups sharing modifiers.
///
/// Every modifier reaches all routes below the group, nested groups and resources
/// included. Middlewares registered on a group run before the middlewares the routes
/// declared themselves; use [`append_middleware`](Self::append_middleware) to run after them.
#[derive(Debug)]
pub struct RouteGroup {
    children: Vec<RouteNode>,
    resolver: MiddlewareResolver,
    cursor: PhaseCursor,
}

impl RouteGroup {
    pub(crate) fn new(resolver: MiddlewareResolver) -> Self {
        Self { children: Vec::new(), resolver, cursor: PhaseCursor::default() }
    }

    pub fn children(&self) -> &[RouteNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<RouteNode> {
        &mut self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        for route in self.routes_mut() {
            route.prefix(prefix);
        }
        self
    }

    /// Prefixes the names of the named routes with `name.`
    pub fn name(&mut self, name: &str) -> &mut Self {
        for route in self.routes_mut() {
            route.prefix_name(name);
        }
        self
    }

    pub fn option(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        for route in self.routes_mut() {
            route.option(key, value.clone());
        }
        self
    }

    pub fn middleware(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.broadcast(reference.into(), MiddlewareKind::Middleware)
    }

    pub fn validator(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.broadcast(reference.into(), MiddlewareKind::Validator)
    }

    pub fn interceptor(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.broadcast(reference.into(), MiddlewareKind::Interceptor)
    }

    pub fn terminator(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.broadcast(reference.into(), MiddlewareKind::Terminator)
    }

    /// Registers a middleware after the routes' own middlewares
    pub fn append_middleware(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        let bound = self.resolver.resolve(reference.into(), MiddlewareKind::Middleware)?;
        for route in self.routes_mut() {
            for callable in &bound {
                route.insert_bound(callable.clone(), None);
            }
        }
        Ok(self)
    }

    fn broadcast(&mut self, reference: MiddlewareRef, kind: MiddlewareKind) -> Result<&mut Self, RouteError> {
        let bound = self.resolver.resolve(reference, kind)?;
        let mut cursor = self.cursor;
        cursor.apply(self.routes_mut(), &bound);
        self.cursor = cursor;
        Ok(self)
    }

    fn routes_mut(&mut self) -> Vec<&mut RouteSpec> {
        let mut routes = Vec::new();
        for child in &mut self.children {
            child.collect_mut(&mut routes);
        }
        routes
    }
}
