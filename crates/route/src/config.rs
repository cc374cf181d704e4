//! Router configuration.
//!
//! Loading the configuration is left to the host application; [`RouterConfig`]
//! only describes the knobs and their defaults, and can be deserialized from any
//! serde format.

use serde::Deserialize;

const DEFAULT_MIDDLEWARE_NAMESPACE: &str = "App/Middlewares";
const DEFAULT_CONTROLLER_NAMESPACE: &str = "App/Controllers";

/// Knobs of a [`Router`](crate::Router).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RouterConfig {
    /// namespace of middleware aliases, named middlewares live under `{namespace}/Names`
    pub middleware_namespace: String,

    /// namespace prepended to controller aliases which are not already qualified
    pub controller_namespace: String,

    /// resolve alias controllers again on every request instead of binding them once at compile time
    pub rebind_controllers: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            middleware_namespace: DEFAULT_MIDDLEWARE_NAMESPACE.into(),
            controller_namespace: DEFAULT_CONTROLLER_NAMESPACE.into(),
            rebind_controllers: false,
        }
    }
}

impl RouterConfig {
    #[must_use]
    pub fn middleware_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.middleware_namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn controller_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.controller_namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn rebind_controllers(mut self, rebind: bool) -> Self {
        self.rebind_controllers = rebind;
        self
    }

    /// the alias a named middleware is registered under
    pub(crate) fn named_middleware_alias(&self, name: &str) -> String {
        format!("{}/Names/{name}", self.middleware_namespace.trim_end_matches('/'))
    }

    /// the alias a middleware class is registered under
    pub(crate) fn direct_middleware_alias(&self, name: &str) -> String {
        format!("{}/{name}", self.middleware_namespace.trim_end_matches('/'))
    }

    /// qualifies a controller alias with the controller namespace, unless it already has a path
    pub(crate) fn controller_alias(&self, controller: &str) -> String {
        if controller.contains('/') {
            controller.to_string()
        } else {
            format!("{}/{controller}", self.controller_namespace.trim_end_matches('/'))
        }
    }
}
