//! The route tree built by the [`Router`](crate::Router).
//!
//! Builder calls grow a tree of [`RouteNode`]s: single routes, groups and resources.
//! Group and resource modifiers are broadcast to every route below them, so by the time
//! the tree is compiled each [`RouteSpec`] carries everything it inherited.

mod compiled;
mod group;
mod inflect;
mod resource;
mod spec;

pub use compiled::{CompiledRoute, MiddlewareDescriptor, RouteDescriptor};
pub use group::RouteGroup;
pub use resource::{RESOURCE_ACTIONS, RouteResource};
pub use spec::RouteSpec;

use crate::controller::ControllerRef;
use crate::error::RouteError;
use crate::handler::{BoundHandler, RequestHandler};
use crate::middleware::{Bound, BoundCallable, Interceptor, Middleware, MiddlewareResolver, Phase, Terminator, Validator};
use std::sync::Arc;

/// A node of the route tree.
#[derive(Debug)]
pub enum RouteNode {
    Route(RouteSpec),
    Group(RouteGroup),
    Resource(RouteResource),
}

impl RouteNode {
    /// Collects every route below this node, deleted ones included
    pub(crate) fn collect_mut<'a>(&'a mut self, routes: &mut Vec<&'a mut RouteSpec>) {
        match self {
            RouteNode::Route(route) => routes.push(route),
            RouteNode::Group(group) => {
                for child in group.children_mut() {
                    child.collect_mut(routes);
                }
            }
            RouteNode::Resource(resource) => routes.extend(resource.routes_mut()),
        }
    }

    /// Collects the routes that survive compilation, depth first
    pub(crate) fn flatten<'a>(&'a self, routes: &mut Vec<&'a RouteSpec>) {
        match self {
            RouteNode::Route(route) if !route.is_deleted() => routes.push(route),
            RouteNode::Route(_) => {}
            RouteNode::Group(group) => {
                for child in group.children() {
                    child.flatten(routes);
                }
            }
            RouteNode::Resource(resource) => routes.extend(resource.routes().iter().filter(|route| !route.is_deleted())),
        }
    }
}

/// What a route dispatches to.
#[derive(Debug, Clone)]
pub enum HandlerRef {
    Bound(BoundHandler),
    /// an action of a controller, bound when the route is compiled
    Action { controller: ControllerRef, action: String },
    /// `Controller.action`, or a bare action inside a controller scope
    Named(String),
}

impl HandlerRef {
    /// Turns a named handler into a controller action, `scope` is used for bare action names
    pub(crate) fn scoped(self, scope: Option<&ControllerRef>) -> Result<HandlerRef, RouteError> {
        let HandlerRef::Named(name) = self else {
            return Ok(self);
        };

        match name.rsplit_once('.') {
            Some((controller, action)) if !controller.is_empty() && !action.is_empty() => {
                Ok(HandlerRef::Action { controller: controller.into(), action: action.into() })
            }
            Some(_) => Err(RouteError::invalid_handler(name, "expected `Controller.action`")),
            None => match scope {
                Some(controller) => Ok(HandlerRef::Action { controller: controller.clone(), action: name }),
                None => Err(RouteError::invalid_handler(name, "a bare action needs a controller scope")),
            },
        }
    }

    pub(crate) fn bind(&self, resolver: &MiddlewareResolver) -> Result<BoundHandler, RouteError> {
        match self {
            HandlerRef::Bound(handler) => Ok(handler.clone()),
            HandlerRef::Action { controller, action } => {
                let config = resolver.config();
                controller.bind(action, resolver.resolver(), config, config.rebind_controllers)
            }
            HandlerRef::Named(_) => self.clone().scoped(None)?.bind(resolver),
        }
    }
}

impl From<BoundHandler> for HandlerRef {
    fn from(handler: BoundHandler) -> Self {
        HandlerRef::Bound(handler)
    }
}

impl From<Arc<dyn RequestHandler>> for HandlerRef {
    fn from(handler: Arc<dyn RequestHandler>) -> Self {
        HandlerRef::Bound(Bound::new("handler", handler))
    }
}

impl From<&str> for HandlerRef {
    fn from(name: &str) -> Self {
        HandlerRef::Named(name.into())
    }
}

impl From<String> for HandlerRef {
    fn from(name: String) -> Self {
        HandlerRef::Named(name)
    }
}

/// The resolved callables of a route, one ordered list per phase.
#[derive(Debug, Clone, Default)]
pub struct PhaseLists {
    validators: Vec<Bound<dyn Validator>>,
    handlers: Vec<Bound<dyn Middleware>>,
    interceptors: Vec<Bound<dyn Interceptor>>,
    terminators: Vec<Bound<dyn Terminator>>,
}

impl PhaseLists {
    pub fn validators(&self) -> &[Bound<dyn Validator>] {
        &self.validators
    }

    pub fn handlers(&self) -> &[Bound<dyn Middleware>] {
        &self.handlers
    }

    pub fn interceptors(&self) -> &[Bound<dyn Interceptor>] {
        &self.interceptors
    }

    pub fn terminators(&self) -> &[Bound<dyn Terminator>] {
        &self.terminators
    }

    /// Owners of the callables of `phase`, in run order
    pub fn owners(&self, phase: Phase) -> Vec<&str> {
        match phase {
            Phase::Validate => self.validators.iter().map(Bound::owner).collect(),
            Phase::Handle => self.handlers.iter().map(Bound::owner).collect(),
            Phase::Intercept => self.interceptors.iter().map(Bound::owner).collect(),
            Phase::Terminate => self.terminators.iter().map(Bound::owner).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.validators.len() + self.handlers.len() + self.interceptors.len() + self.terminators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts at `at`, clamped to the list length, or appends when `at` is `None`
    pub(crate) fn insert(&mut self, callable: BoundCallable, at: Option<usize>) {
        fn place<T: ?Sized>(list: &mut Vec<Bound<T>>, bound: Bound<T>, at: Option<usize>) {
            match at {
                Some(index) => list.insert(index.min(list.len()), bound),
                None => list.push(bound),
            }
        }

        match callable {
            BoundCallable::Validate(bound) => place(&mut self.validators, bound, at),
            BoundCallable::Handle(bound) => place(&mut self.handlers, bound, at),
            BoundCallable::Intercept(bound) => place(&mut self.interceptors, bound, at),
            BoundCallable::Terminate(bound) => place(&mut self.terminators, bound, at),
        }
    }
}

/// Where the next broadcast middleware of a group or resource lands, per phase.
///
/// Broadcast entries go ahead of the route's own entries but keep their call order, and
/// an outer group, modified after its inner groups were built, ends up in front of them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PhaseCursor([usize; 4]);

impl PhaseCursor {
    pub(crate) fn apply<'a>(&mut self, routes: impl IntoIterator<Item = &'a mut RouteSpec>, bound: &[BoundCallable]) {
        for route in routes {
            for callable in bound {
                route.insert_bound(callable.clone(), Some(self.0[callable.phase().index()]));
            }
        }
        for callable in bound {
            self.0[callable.phase().index()] += 1;
        }
    }
}

/// Joins url parts into `/a/b/c`, empty segments and duplicate separators are dropped
pub(crate) fn join_url<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let segments: Vec<&str> = parts.into_iter().flat_map(|part| part.split('/')).filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
