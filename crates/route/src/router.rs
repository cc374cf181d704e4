//! The route builder and compiler.
//!
//! A [`Router`] collects routes, groups and resources at startup, then compiles them into
//! a flat list of [`CompiledRoute`]s and registers them into a [`Transport`].
//!
//! ```
//! use micro_route::{Container, Router, handler_fn, Payload};
//!
//! let mut router = Router::new(Container::new());
//! router
//!     .group(|router| {
//!         router.get("users/:id", handler_fn(|ctx| {
//!             Box::pin(async move { Ok(Payload::from(format!("user {}", ctx.params().get("id").unwrap_or("?")))) })
//!         }))?;
//!         Ok(())
//!     })
//!     .unwrap()
//!     .prefix("api");
//!
//! let routes = router.compile().unwrap();
//! assert_eq!(routes[0].url(), "/api/users/:id");
//! ```

use crate::config::RouterConfig;
use crate::controller::ControllerRef;
use crate::error::RouteError;
use crate::middleware::{ErrorHandler, MiddlewareResolver};
use crate::phase::PhaseAdapter;
use crate::resolver::Resolver;
use crate::route::{CompiledRoute, HandlerRef, RouteGroup, RouteNode, RouteResource, RouteSpec};
use crate::transport::Transport;
use http::Method;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Collects the route tree at startup and compiles it for a [`Transport`].
///
/// Builder calls made inside [`group`](Self::group) land in the innermost open group.
pub struct Router {
    resolver: Arc<dyn Resolver>,
    config: Arc<RouterConfig>,
    middlewares: MiddlewareResolver,
    nodes: Vec<RouteNode>,
    open_groups: Vec<RouteGroup>,
    controllers: Vec<ControllerRef>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl Router {
    pub fn new<R: Resolver + 'static>(resolver: R) -> Self {
        Self::with_config(resolver, RouterConfig::default())
    }

    pub fn with_config<R: Resolver + 'static>(resolver: R, config: RouterConfig) -> Self {
        let resolver: Arc<dyn Resolver> = Arc::new(resolver);
        let config = Arc::new(config);
        let middlewares = MiddlewareResolver::new(Arc::clone(&resolver), Arc::clone(&config));
        Self {
            resolver,
            config,
            middlewares,
            nodes: Vec::new(),
            open_groups: Vec::new(),
            controllers: Vec::new(),
            error_handler: None,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Declares a route for `methods`.
    ///
    /// `handler` is a bound handler, a `"Controller.action"` string, or a bare action name
    /// when called inside [`controller`](Self::controller).
    pub fn route<M>(&mut self, pattern: &str, methods: M, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError>
    where
        M: IntoIterator<Item = Method>,
    {
        let handler = self.scoped_handler(handler.into())?;
        let spec = RouteSpec::new(pattern, methods, handler, self.middlewares.clone());

        let children = self.children_mut();
        children.push(RouteNode::Route(spec));
        match children.last_mut() {
            Some(RouteNode::Route(spec)) => Ok(spec),
            _ => unreachable!("a route was just pushed"),
        }
    }

    /// GET route, HEAD is answered by the same handler
    pub fn get(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::GET, Method::HEAD], handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::POST], handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::PUT], handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::PATCH], handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::DELETE], handler)
    }

    pub fn options(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::OPTIONS], handler)
    }

    pub fn head(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        self.route(pattern, [Method::HEAD], handler)
    }

    pub fn any(&mut self, pattern: &str, handler: impl Into<HandlerRef>) -> Result<&mut RouteSpec, RouteError> {
        let methods =
            [Method::GET, Method::HEAD, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS];
        self.route(pattern, methods, handler)
    }

    /// Runs `callback` with a new group open, every route it declares lands in the group.
    ///
    /// The group is closed even when the callback fails, the error is returned as is.
    pub fn group<F>(&mut self, callback: F) -> Result<&mut RouteGroup, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.open_groups.push(RouteGroup::new(self.middlewares.clone()));
        let result = callback(self);
        let Some(group) = self.open_groups.pop() else {
            unreachable!("the group opened above is still on the stack");
        };
        result?;

        let children = self.children_mut();
        children.push(RouteNode::Group(group));
        match children.last_mut() {
            Some(RouteNode::Group(group)) => Ok(group),
            _ => unreachable!("a group was just pushed"),
        }
    }

    /// Declares the five routes of a resource, see [`RouteResource`]
    pub fn resource(&mut self, name: &str, controller: impl Into<ControllerRef>) -> &mut RouteResource {
        let resource = RouteResource::new(name, controller.into(), self.middlewares.clone());

        let children = self.children_mut();
        children.push(RouteNode::Resource(resource));
        match children.last_mut() {
            Some(RouteNode::Resource(resource)) => resource,
            _ => unreachable!("a resource was just pushed"),
        }
    }

    /// Runs `callback` with `controller` as the target of bare action names
    pub fn controller<F>(&mut self, controller: impl Into<ControllerRef>, callback: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        self.controllers.push(controller.into());
        let result = callback(self);
        self.controllers.pop();
        result
    }

    /// Sets the error handler of every route
    pub fn error_handler(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.error_handler = Some(handler);
        self
    }

    /// Compiles the route tree, deleted routes are left out
    pub fn compile(&self) -> Result<Vec<CompiledRoute>, RouteError> {
        let mut specs = Vec::new();
        for node in &self.nodes {
            node.flatten(&mut specs);
        }

        specs
            .into_iter()
            .map(|spec| {
                let route = spec.compile()?;
                debug!(url = route.url(), methods = ?route.methods(), name = ?route.name(), handler = route.handler().owner(), "compiled route");
                Ok(route)
            })
            .collect()
    }

    /// The compiled routes, for route listings
    pub fn list(&self) -> Result<Vec<CompiledRoute>, RouteError> {
        self.compile()
    }

    /// Compiles and hands every route to `transport`, returns how many were registered
    pub fn register<T: Transport + ?Sized>(self, transport: &mut T) -> Result<usize, RouteError> {
        let routes = self.compile()?;
        let adapter = PhaseAdapter::new(self.error_handler.clone());

        for route in &routes {
            transport.register_route(adapter.adapt(route))?;
        }

        info!(routes = routes.len(), "registered routes");
        Ok(routes.len())
    }

    fn children_mut(&mut self) -> &mut Vec<RouteNode> {
        match self.open_groups.last_mut() {
            Some(group) => group.children_mut(),
            None => &mut self.nodes,
        }
    }

    fn scoped_handler(&self, handler: HandlerRef) -> Result<HandlerRef, RouteError> {
        let bare = matches!(&handler, HandlerRef::Named(name) if !name.contains('.'));
        let handler = handler.scoped(self.controllers.last())?;

        // bare actions are rewritten against the scope controller and checked right away
        if let (true, HandlerRef::Action { controller, action }) = (bare, &handler) {
            let controller = controller.resolve(self.resolver.as_ref(), &self.config)?;
            if !controller.has_action(action) {
                return Err(RouteError::undefined_method(action, controller.name()));
            }
        }
        Ok(handler)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("config", &self.config)
            .field("nodes", &self.nodes.len())
            .field("error_handler", &self.error_handler.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Router;
    use crate::context::HandleContext;
    use crate::controller::Controller;
    use crate::error::{BoxError, RouteError};
    use crate::handler::{BoundHandler, handler_fn};
    use crate::middleware::{Capabilities, Middleware, Phase};
    use crate::payload::Payload;
    use crate::resolver::Container;
    use crate::transport::{Flow, MockTransport};
    use async_trait::async_trait;
    use http::Method;
    use std::sync::Arc;

    struct Noop;

    #[async_trait]
    impl Middleware for Noop {
        async fn handle(&self, _ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
            Ok(Flow::Next)
        }
    }

    fn ok_handler() -> BoundHandler {
        handler_fn(|_ctx| Box::pin(async { Ok(Payload::Empty) }))
    }

    fn container() -> Container {
        let mut container = Container::new();
        for name in ["auth", "inner", "outer", "own", "last", "M"] {
            container.bind_middleware(format!("App/Middlewares/Names/{name}"), Capabilities::new(name).with_handler(Arc::new(Noop)));
        }
        container.bind_controller(
            "App/Controllers/TestController",
            ["index", "store", "show", "update", "delete", "list"]
                .into_iter()
                .fold(Controller::new("TestController"), |controller, action| controller.action(action, ok_handler())),
        );
        container
    }

    #[test]
    fn test_get_adds_head() {
        let mut router = Router::new(container());
        router.get("/", ok_handler()).unwrap();
        router.route("plain", [Method::GET], ok_handler()).unwrap();

        let routes = router.compile().unwrap();
        assert_eq!(routes[0].url(), "/");
        assert_eq!(routes[0].methods(), &[Method::GET, Method::HEAD]);
        assert_eq!(routes[1].methods(), &[Method::GET]);
    }

    #[test]
    fn test_nested_group_prefixes() {
        let mut router = Router::new(container());
        router
            .group(|router| {
                router
                    .group(|router| {
                        router.get("users", ok_handler())?;
                        Ok(())
                    })?
                    .prefix("v1");
                Ok(())
            })
            .unwrap()
            .prefix("api");
        router.get("health", ok_handler()).unwrap();

        let urls: Vec<_> = router.compile().unwrap().iter().map(|route| route.url().to_string()).collect();
        assert_eq!(urls, vec!["/api/v1/users", "/health"]);
    }

    #[test]
    fn test_end_to_end_group() {
        let mut router = Router::new(container());
        router
            .group(|router| {
                router.route("test", [Method::GET], ok_handler())?;
                Ok(())
            })
            .unwrap()
            .prefix("v1")
            .middleware("M")
            .unwrap();

        let routes = router.compile().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].url(), "/v1/test");
        assert_eq!(routes[0].methods(), &[Method::GET]);
        assert_eq!(routes[0].middlewares().owners(Phase::Handle), vec!["M"]);
    }

    #[test]
    fn test_group_middleware_order() {
        let mut router = Router::new(container());
        router
            .group(|router| {
                router
                    .group(|router| {
                        router.get("users", ok_handler())?.middleware("own")?;
                        Ok(())
                    })?
                    .middleware("inner")?
                    .append_middleware("last")?;
                Ok(())
            })
            .unwrap()
            .middleware("outer")
            .unwrap()
            .middleware("auth")
            .unwrap();

        let routes = router.compile().unwrap();
        assert_eq!(routes[0].middlewares().owners(Phase::Handle), vec!["outer", "auth", "inner", "own", "last"]);
    }

    #[test]
    fn test_group_name_and_deleted_routes() {
        let mut router = Router::new(container());
        router
            .group(|router| {
                router.get("users", ok_handler())?.name("users");
                router.get("hidden", ok_handler())?.delete();
                router.group(|router| {
                    router.resource("tests", "TestController").only(&["index"]);
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .name("admin");

        let routes = router.list().unwrap();
        let names: Vec<_> = routes.iter().map(|route| route.name().unwrap_or_default().to_string()).collect();
        assert_eq!(names, vec!["admin.users", "admin.tests.index"]);
    }

    #[test]
    fn test_failed_callback_closes_the_group() {
        let mut router = Router::new(container());
        let err = router
            .group(|router| {
                router.get("users", ok_handler())?.middleware("not-found")?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, RouteError::MiddlewareNotFound { .. }));

        router.get("after", ok_handler()).unwrap();
        let routes = router.compile().unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].url(), "/after");
    }

    #[test]
    fn test_controller_scope() {
        let mut router = Router::new(container());
        router
            .controller("TestController", |router| {
                router.get("tests", "list")?;
                router.post("tests", "TestController.store")?;
                Ok(())
            })
            .unwrap();

        let routes = router.compile().unwrap();
        assert_eq!(routes[0].handler().owner(), "TestController.list");
        assert_eq!(routes[1].handler().owner(), "TestController.store");

        let err = router.controller("TestController", |router| router.get("tests", "missing").map(|_| ())).unwrap_err();
        assert!(matches!(err, RouteError::UndefinedMethod { ref method, .. } if method == "missing"));

        // the scope is gone
        assert!(matches!(router.get("tests", "list"), Err(RouteError::InvalidHandler { .. })));
    }

    #[test]
    fn test_unknown_controller_fails_at_compile() {
        let mut router = Router::new(container());
        router.get("users", "UserController.index").unwrap();
        assert!(matches!(router.compile(), Err(RouteError::ControllerNotFound { .. })));

        let mut router = Router::new(container());
        router.get("tests", "TestController.destroy").unwrap();
        assert!(matches!(router.compile(), Err(RouteError::UndefinedMethod { .. })));
    }

    #[test]
    fn test_register_hands_every_route_to_the_transport() {
        let mut router = Router::new(container());
        router.resource("tests.subTests", "TestController").except(&["delete"]);
        router.get("deleted", ok_handler()).unwrap().delete();

        let mut transport = MockTransport::new();
        transport.expect_register_route().times(4).returning(|_| Ok(()));

        assert_eq!(router.register(&mut transport).unwrap(), 4);
    }

    #[test]
    fn test_register_stops_on_transport_error() {
        let mut router = Router::new(container());
        router.get("a", ok_handler()).unwrap();
        router.get("b", ok_handler()).unwrap();

        let mut transport = MockTransport::new();
        transport
            .expect_register_route()
            .times(1)
            .returning(|route| Err(RouteError::conflict(route.url, "already registered")));

        assert!(matches!(router.register(&mut transport), Err(RouteError::Conflict { .. })));
    }
}
