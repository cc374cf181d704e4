use crate::config::RouterConfig;
use crate::error::RouteError;
use crate::middleware::{BoundCallable, Capabilities, MiddlewareKind, MiddlewareRef};
use crate::resolver::{Binding, Resolver};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns a [`MiddlewareRef`] into bound callables.
///
/// Named references are looked up under the named alias namespace first and the direct
/// alias namespace second. Resolution runs when the builder call is made, so a missing
/// middleware fails at startup and never while serving a request.
#[derive(Clone)]
pub struct MiddlewareResolver {
    resolver: Arc<dyn Resolver>,
    config: Arc<RouterConfig>,
}

impl MiddlewareResolver {
    pub fn new(resolver: Arc<dyn Resolver>, config: Arc<RouterConfig>) -> Self {
        Self { resolver, config }
    }

    /// Resolves `reference` into every callable `kind` accepts, in phase order
    pub fn resolve(&self, reference: MiddlewareRef, kind: MiddlewareKind) -> Result<Vec<BoundCallable>, RouteError> {
        match reference {
            MiddlewareRef::Closure(callable) => {
                if kind.accepts(callable.phase()) {
                    Ok(vec![callable])
                } else {
                    Err(RouteError::phase_mismatch(kind, callable.phase(), callable.owner()))
                }
            }
            MiddlewareRef::Instance(capabilities) => Self::bind(&capabilities, kind),
            MiddlewareRef::Named(name) => {
                let capabilities = self.lookup(&name, kind)?;
                Self::bind(&capabilities, kind)
            }
        }
    }

    pub(crate) fn resolver(&self) -> &Arc<dyn Resolver> {
        &self.resolver
    }

    pub(crate) fn config(&self) -> &RouterConfig {
        &self.config
    }

    fn bind(capabilities: &Capabilities, kind: MiddlewareKind) -> Result<Vec<BoundCallable>, RouteError> {
        let bound = capabilities.bind(kind);
        if bound.is_empty() {
            return Err(RouteError::no_capability(kind, capabilities.owner()));
        }
        Ok(bound)
    }

    fn lookup(&self, name: &str, kind: MiddlewareKind) -> Result<Capabilities, RouteError> {
        let named_alias = self.config.named_middleware_alias(name);
        let direct_alias = self.config.direct_middleware_alias(name);

        for alias in [&named_alias, &direct_alias] {
            match self.resolver.try_resolve(alias) {
                Some(Binding::Middleware(capabilities)) => {
                    debug!(%kind, name, alias = %alias, "resolved middleware");
                    return Ok(capabilities);
                }
                Some(Binding::Controller(_)) => {
                    warn!(%kind, name, alias = %alias, "alias is bound to a controller, skip it");
                }
                None => {}
            }
        }

        Err(RouteError::middleware_not_found(kind, direct_alias, named_alias))
    }
}

impl fmt::Debug for MiddlewareResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareResolver").field("config", &self.config).finish_non_exhaustive()
    }
}
