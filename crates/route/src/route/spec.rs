use crate::error::RouteError;
use crate::middleware::{BoundCallable, MiddlewareKind, MiddlewareRef, MiddlewareResolver};
use crate::route::compiled::CompiledRoute;
use crate::route::{HandlerRef, PhaseLists, join_url};
use crate::transport::TransportOptions;
use http::Method;
use serde_json::Value;

/// The mutable definition of one route.
///
/// The url is stored without surrounding separators. Prefixes pushed by enclosing groups
/// are kept in the order they were added and applied outermost first when the route is
/// compiled.
#[derive(Debug)]
pub struct RouteSpec {
    url: String,
    methods: Vec<Method>,
    handler: HandlerRef,
    name: Option<String>,
    deleted: bool,
    prefixes: Vec<String>,
    middlewares: PhaseLists,
    options: TransportOptions,
    resolver: MiddlewareResolver,
}

impl RouteSpec {
    pub fn new(
        url: &str,
        methods: impl IntoIterator<Item = Method>,
        handler: impl Into<HandlerRef>,
        resolver: MiddlewareResolver,
    ) -> Self {
        let mut unique: Vec<Method> = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }

        Self {
            url: url.trim_matches('/').to_string(),
            methods: unique,
            handler: handler.into(),
            name: None,
            deleted: false,
            prefixes: Vec::new(),
            middlewares: PhaseLists::default(),
            options: TransportOptions::default(),
            resolver,
        }
    }

    /// The url as declared, without prefixes
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The url with every prefix applied, always starting with `/`
    pub fn full_url(&self) -> String {
        join_url(self.prefixes.iter().rev().map(String::as_str).chain(std::iter::once(self.url.as_str())))
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    pub fn route_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn middlewares(&self) -> &PhaseLists {
        &self.middlewares
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.prefixes.push(prefix.to_string());
        self
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets an option handed to the transport as is
    pub fn option(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.options.insert(key, value);
        self
    }

    /// Marks the route deleted, it is left out when the router compiles
    pub fn delete(&mut self) -> &mut Self {
        self.deleted = true;
        self
    }

    /// Registers the handle, intercept and terminate capabilities of `reference`
    pub fn middleware(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Middleware, None)
    }

    pub fn validator(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Validator, None)
    }

    pub fn interceptor(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Interceptor, None)
    }

    pub fn terminator(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Terminator, None)
    }

    pub fn prepend_middleware(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Middleware, Some(0))
    }

    pub fn prepend_validator(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Validator, Some(0))
    }

    pub fn prepend_interceptor(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Interceptor, Some(0))
    }

    pub fn prepend_terminator(&mut self, reference: impl Into<MiddlewareRef>) -> Result<&mut Self, RouteError> {
        self.add(reference.into(), MiddlewareKind::Terminator, Some(0))
    }

    /// Freezes the route.
    ///
    /// Controller actions are bound here, an unknown controller or action is an error.
    pub fn compile(&self) -> Result<CompiledRoute, RouteError> {
        let handler = self.handler.bind(&self.resolver)?;
        Ok(CompiledRoute::new(
            self.full_url(),
            self.methods.clone(),
            self.name.clone(),
            handler,
            self.middlewares.clone(),
            self.options.clone(),
        ))
    }

    pub(crate) fn insert_bound(&mut self, callable: BoundCallable, at: Option<usize>) {
        self.middlewares.insert(callable, at);
    }

    /// Prepends `prefix.` to the route name, unnamed routes stay unnamed
    pub(crate) fn prefix_name(&mut self, prefix: &str) {
        if let Some(name) = self.name.as_mut() {
            *name = format!("{prefix}.{name}");
        }
    }

    fn add(&mut self, reference: MiddlewareRef, kind: MiddlewareKind, at: Option<usize>) -> Result<&mut Self, RouteError> {
        for callable in self.resolver.resolve(reference, kind)? {
            self.middlewares.insert(callable, at);
        }
        Ok(self)
    }
}
