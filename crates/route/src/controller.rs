//! Controllers: named tables of actions.
//!
//! A route handler can point at a controller action instead of carrying its own closure,
//! either as a `"Controller.action"` string resolved through the [`Resolver`] or by
//! handing a [`Controller`] instance to a resource. Actions are looked up in the table
//! when the route is compiled, a missing one fails startup.

use crate::config::RouterConfig;
use crate::context::HandleContext;
use crate::error::{BoxError, RouteError};
use crate::handler::{BoundHandler, RequestHandler};
use crate::middleware::Bound;
use crate::payload::Payload;
use crate::resolver::{Binding, Resolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A named table of request handlers.
pub struct Controller {
    name: Arc<str>,
    actions: HashMap<String, Arc<dyn RequestHandler>>,
}

impl Controller {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into(), actions: HashMap::new() }
    }

    /// Adds an action, replacing any action of the same name
    #[must_use]
    pub fn action(mut self, name: impl Into<String>, handler: BoundHandler) -> Self {
        self.actions.insert(name.into(), handler.shared());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, action: &str) -> Option<&Arc<dyn RequestHandler>> {
        self.actions.get(action)
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    /// Action names, sorted
    pub fn actions(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Binds an action, the owner of the bound handler reads `Controller.action`
    pub fn bind(&self, action: &str) -> Option<BoundHandler> {
        self.actions.get(action).map(|handler| Bound::new(format!("{}.{action}", self.name), Arc::clone(handler)))
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller").field("name", &self.name).field("actions", &self.actions()).finish()
    }
}

/// A controller given either by alias or as an instance.
#[derive(Debug, Clone)]
pub enum ControllerRef {
    Alias(String),
    Instance(Arc<Controller>),
}

impl ControllerRef {
    pub fn name(&self) -> &str {
        match self {
            ControllerRef::Alias(alias) => alias,
            ControllerRef::Instance(controller) => controller.name(),
        }
    }

    /// Resolves the controller, looking the alias up when needed
    pub(crate) fn resolve(&self, resolver: &dyn Resolver, config: &RouterConfig) -> Result<Arc<Controller>, RouteError> {
        match self {
            ControllerRef::Instance(controller) => Ok(Arc::clone(controller)),
            ControllerRef::Alias(alias) => lookup(resolver, &config.controller_alias(alias)),
        }
    }

    /// Binds `action` for a compiled route.
    ///
    /// With `rebind` an alias controller is looked up again for every request; the action
    /// still has to exist now.
    pub(crate) fn bind(
        &self,
        action: &str,
        resolver: &Arc<dyn Resolver>,
        config: &RouterConfig,
        rebind: bool,
    ) -> Result<BoundHandler, RouteError> {
        let controller = self.resolve(resolver.as_ref(), config)?;
        let bound = controller.bind(action).ok_or_else(|| RouteError::undefined_method(action, controller.name()))?;

        match self {
            ControllerRef::Alias(alias) if rebind => {
                let handler: Arc<dyn RequestHandler> = Arc::new(RebindingHandler {
                    resolver: Arc::clone(resolver),
                    alias: config.controller_alias(alias),
                    action: action.to_string(),
                });
                Ok(Bound::new(bound.owner(), handler))
            }
            _ => Ok(bound),
        }
    }
}

impl From<&str> for ControllerRef {
    fn from(alias: &str) -> Self {
        ControllerRef::Alias(alias.into())
    }
}

impl From<String> for ControllerRef {
    fn from(alias: String) -> Self {
        ControllerRef::Alias(alias)
    }
}

impl From<Controller> for ControllerRef {
    fn from(controller: Controller) -> Self {
        ControllerRef::Instance(Arc::new(controller))
    }
}

impl From<Arc<Controller>> for ControllerRef {
    fn from(controller: Arc<Controller>) -> Self {
        ControllerRef::Instance(controller)
    }
}

fn lookup(resolver: &dyn Resolver, alias: &str) -> Result<Arc<Controller>, RouteError> {
    match resolver.try_resolve(alias) {
        Some(Binding::Controller(controller)) => Ok(controller),
        _ => Err(RouteError::controller_not_found(alias)),
    }
}

/// Resolves the controller on every invocation, for hosts that swap controllers at runtime
struct RebindingHandler {
    resolver: Arc<dyn Resolver>,
    alias: String,
    action: String,
}

#[async_trait]
impl RequestHandler for RebindingHandler {
    async fn invoke(&self, ctx: HandleContext<'_>) -> Result<Payload, BoxError> {
        let controller = lookup(self.resolver.as_ref(), &self.alias)?;
        trace!(alias = %self.alias, action = %self.action, "rebind controller action");
        let handler = controller.bind(&self.action).ok_or_else(|| RouteError::undefined_method(&self.action, controller.name()))?;
        handler.invoke(ctx).await
    }
}
