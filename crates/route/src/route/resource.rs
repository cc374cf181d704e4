use crate::controller::ControllerRef;
use crate::error::RouteError;
use crate::middleware::{MiddlewareKind, MiddlewareRef, MiddlewareResolver};
use crate::route::inflect::singularize;
use crate::route::{HandlerRef, PhaseCursor, RouteSpec};
use http::Method;
use serde_json::Value;

/// The actions of a resource, in the order their routes are declared
pub const RESOURCE_ACTIONS: [&str; 5] = ["index", "store", "show", "update", "delete"];

/// The five conventional routes of a collection, all dispatched to one controller.
///
/// | action | methods   | path          |
/// |--------|-----------|---------------|
/// | index  | GET, HEAD | `{base}`      |
/// | store  | POST      | `{base}`      |
/// | show   | GET, HEAD | `{base}/:id`  |
/// | update | PUT, PATCH| `{base}/:id`  |
/// | delete | DELETE    | `{base}/:id`  |
///
/// A dotted name nests the resource: `posts.comments` has the base `posts/:post_id/comments`.
#[derive(Debug)]
pub struct RouteResource {
    resource_name: String,
    controller: ControllerRef,
    routes: Vec<RouteSpec>,
    resolver: MiddlewareResolver,
    cursor: PhaseCursor,
}

impl RouteResource {
    pub(crate) fn new(resource_name: &str, controller: ControllerRef, resolver: MiddlewareResolver) -> Self {
        let base = base_url(resource_name);
        let member = format!("{base}/:id");

        let routes = RESOURCE_ACTIONS
            .iter()
            .map(|&action| {
                let (url, methods) = match action {
                    "index" => (base.as_str(), vec![Method::GET, Method::HEAD]),
                    "store" => (base.as_str(), vec![Method::POST]),
                    "show" => (member.as_str(), vec![Method::GET, Method::HEAD]),
                    "update" => (member.as_str(), vec![Method::PUT, Method::PATCH]),
                    _ => (member.as_str(), vec![Method::DELETE]),
                };
                let handler = HandlerRef::Action { controller: controller.clone(), action: action.to_string() };
                let mut route = RouteSpec::new(url, methods, handler, resolver.clone());
                route.name(format!("{resource_name}.{action}"));
                route
            })
            .collect();

        Self { resource_name: resource_name.to_string(), controller, routes, resolver, cursor: PhaseCursor::default() }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn controller(&self) -> &ControllerRef {
        &self.controller
    }

    pub fn routes(&self) -> &[RouteSpec] {
        &self.routes
    }

    pub(crate) fn routes_mut(&mut self) -> impl Iterator<Item = &mut RouteSpec> {
        self.routes.iter_mut()
    }

    /// The route of `action`, deleted or not
    pub fn route_mut(&mut self, action: &str) -> Option<&mut RouteSpec> {
        let suffix = format!(".{action}");
        self.routes.iter_mut().find(|route| route.route_name().is_some_and(|name| name.ends_with(&suffix)))
    }

    /// Keeps only the routes of the given actions
    pub fn only(&mut self, actions: &[&str]) -> &mut Self {
        for route in &mut self.routes {
            if !matches_any(route, actions) {
                route.delete();
            }
        }
        self
    }

    /// Drops the routes of the given actions
    pub fn except(&mut self, actions: &[&str]) -> &mut Self {
        for route in &mut self.routes {
            if matches_any(route, actions) {
                route.delete();
            }
        }
        self
    }

    /// Keeps the routes an api serves, which are all of them since no form routes are generated
    pub fn api_only(&mut self) -> &mut Self {
        self.only(&RESOURCE_ACTIONS)
    }

    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        for route in &mut self.routes {
            route.prefix(prefix);
        }
        self
    }

    /// Prefixes the route names with `name.`
    pub fn name(&mut self, name: &str) -> &mut Self {
        for route in &mut self.routes {
            route.prefix_name(name);
        }
        self
    }

    pub fn option(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        for route in &mut self.routes {
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

    fn broadcast(&mut self, reference: MiddlewareRef, kind: MiddlewareKind) -> Result<&mut Self, RouteError> {
        let bound = self.resolver.resolve(reference, kind)?;
        self.cursor.apply(self.routes.iter_mut(), &bound);
        Ok(self)
    }
}

fn matches_any(route: &RouteSpec, actions: &[&str]) -> bool {
    route.route_name().is_some_and(|name| actions.iter().any(|action| name.ends_with(&format!(".{action}"))))
}

/// `a.b.c` becomes `a/:a_id/b/:b_id/c`
fn base_url(resource_name: &str) -> String {
    let segments: Vec<&str> = resource_name.split('.').filter(|s| !s.is_empty()).collect();
    let Some((collection, ancestors)) = segments.split_last() else {
        return String::new();
    };

    let mut url = String::new();
    for ancestor in ancestors {
        url.push_str(&format!("{ancestor}/:{}_id/", singularize(ancestor)));
    }
    url.push_str(collection);
    url
}
