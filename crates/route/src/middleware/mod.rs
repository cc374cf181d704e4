//! Middleware capabilities and their bound form.
//!
//! A middleware object takes part in a request through up to four capabilities, one per
//! phase: [`Validator`], [`Middleware`] (the handle phase), [`Interceptor`] and
//! [`Terminator`]. An object declares the capabilities it implements once, through
//! [`Capabilities`], and the [`MiddlewareResolver`] turns a [`MiddlewareRef`] into the
//! matching [`BoundCallable`]s.

mod resolver;

pub use resolver::MiddlewareResolver;

use crate::context::{ErrorContext, HandleContext, InterceptContext, TerminateContext};
use crate::error::BoxError;
use crate::payload::Payload;
use crate::transport::Flow;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A point in the request lifecycle where bound callables run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Validate,
    Handle,
    Intercept,
    Terminate,
}

impl Phase {
    pub(crate) fn index(self) -> usize {
        match self {
            Phase::Validate => 0,
            Phase::Handle => 1,
            Phase::Intercept => 2,
            Phase::Terminate => 3,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Validate => "validate",
            Phase::Handle => "handle",
            Phase::Intercept => "intercept",
            Phase::Terminate => "terminate",
        };
        f.write_str(name)
    }
}

/// What a registration call asks for.
///
/// `middleware()` accepts every capability of the handle, intercept and terminate phases,
/// the other kinds accept their own phase only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareKind {
    Middleware,
    Validator,
    Interceptor,
    Terminator,
}

impl MiddlewareKind {
    pub fn accepts(self, phase: Phase) -> bool {
        match self {
            MiddlewareKind::Middleware => matches!(phase, Phase::Handle | Phase::Intercept | Phase::Terminate),
            MiddlewareKind::Validator => phase == Phase::Validate,
            MiddlewareKind::Interceptor => phase == Phase::Intercept,
            MiddlewareKind::Terminator => phase == Phase::Terminate,
        }
    }
}

impl fmt::Display for MiddlewareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MiddlewareKind::Middleware => "middleware",
            MiddlewareKind::Validator => "validator",
            MiddlewareKind::Interceptor => "interceptor",
            MiddlewareKind::Terminator => "terminator",
        };
        f.write_str(name)
    }
}

/// Runs before the handle phase, typically to reject malformed requests.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, ctx: HandleContext<'_>) -> Result<Flow, BoxError>;
}

/// Runs before the route handler.
///
/// Return [`Flow::Next`] to let the chain go on, [`Flow::Halt`] after sending a reply yourself.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: HandleContext<'_>) -> Result<Flow, BoxError>;
}

/// Rewrites the response payload before it is written.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, ctx: InterceptContext<'_>, body: Payload) -> Result<Payload, BoxError>;
}

/// Observes the finished exchange after the response was sent.
#[async_trait]
pub trait Terminator: Send + Sync {
    async fn terminate(&self, ctx: TerminateContext<'_>) -> Result<(), BoxError>;
}

/// The single handler of the error phase, responsible for sending an error response.
#[async_trait]
pub trait ErrorHandler: Send + Sync {
    async fn handle_error(&self, ctx: ErrorContext<'_>);
}

/// A callable bound to its owner, the owner is kept for diagnostics and route listings.
pub struct Bound<T: ?Sized> {
    owner: Arc<str>,
    callable: Arc<T>,
}

impl<T: ?Sized> Bound<T> {
    pub fn new(owner: impl Into<Arc<str>>, callable: Arc<T>) -> Self {
        Self { owner: owner.into(), callable }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub(crate) fn shared(&self) -> Arc<T> {
        Arc::clone(&self.callable)
    }
}

impl<T: ?Sized> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Self { owner: Arc::clone(&self.owner), callable: Arc::clone(&self.callable) }
    }
}

impl<T: ?Sized> Deref for Bound<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.callable
    }
}

impl<T: ?Sized> fmt::Debug for Bound<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Bound").field(&self.owner).finish()
    }
}

/// A resolved callable tagged with the phase it runs in.
#[derive(Clone, Debug)]
pub enum BoundCallable {
    Validate(Bound<dyn Validator>),
    Handle(Bound<dyn Middleware>),
    Intercept(Bound<dyn Interceptor>),
    Terminate(Bound<dyn Terminator>),
}

impl BoundCallable {
    pub fn phase(&self) -> Phase {
        match self {
            BoundCallable::Validate(_) => Phase::Validate,
            BoundCallable::Handle(_) => Phase::Handle,
            BoundCallable::Intercept(_) => Phase::Intercept,
            BoundCallable::Terminate(_) => Phase::Terminate,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            BoundCallable::Validate(bound) => bound.owner(),
            BoundCallable::Handle(bound) => bound.owner(),
            BoundCallable::Intercept(bound) => bound.owner(),
            BoundCallable::Terminate(bound) => bound.owner(),
        }
    }
}

/// The capabilities a middleware object implements, declared once when it is built.
///
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use micro_route::{BoxError, Capabilities, Flow, HandleContext, Middleware};
///
/// struct Auth;
///
/// #[async_trait]
/// impl Middleware for Auth {
///     async fn handle(&self, _ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
///         Ok(Flow::Next)
///     }
/// }
///
/// let auth = Capabilities::new("Auth").with_handler(Arc::new(Auth));
/// assert!(!auth.is_empty());
/// ```
#[derive(Clone)]
pub struct Capabilities {
    owner: Arc<str>,
    validator: Option<Arc<dyn Validator>>,
    handler: Option<Arc<dyn Middleware>>,
    interceptor: Option<Arc<dyn Interceptor>>,
    terminator: Option<Arc<dyn Terminator>>,
}

impl Capabilities {
    pub fn new(owner: impl Into<Arc<str>>) -> Self {
        Self { owner: owner.into(), validator: None, handler: None, interceptor: None, terminator: None }
    }

    #[must_use]
    pub fn with_validator<V: Validator + 'static>(mut self, validator: Arc<V>) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn with_handler<M: Middleware + 'static>(mut self, handler: Arc<M>) -> Self {
        self.handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_interceptor<I: Interceptor + 'static>(mut self, interceptor: Arc<I>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    #[must_use]
    pub fn with_terminator<T: Terminator + 'static>(mut self, terminator: Arc<T>) -> Self {
        self.terminator = Some(terminator);
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_empty(&self) -> bool {
        self.validator.is_none() && self.handler.is_none() && self.interceptor.is_none() && self.terminator.is_none()
    }

    /// Binds every capability `kind` accepts, in phase order
    pub(crate) fn bind(&self, kind: MiddlewareKind) -> Vec<BoundCallable> {
        let owner = &self.owner;
        let mut bound = Vec::with_capacity(4);

        if let Some(validator) = self.validator.as_ref().filter(|_| kind.accepts(Phase::Validate)) {
            bound.push(BoundCallable::Validate(Bound::new(Arc::clone(owner), Arc::clone(validator))));
        }
        if let Some(handler) = self.handler.as_ref().filter(|_| kind.accepts(Phase::Handle)) {
            bound.push(BoundCallable::Handle(Bound::new(Arc::clone(owner), Arc::clone(handler))));
        }
        if let Some(interceptor) = self.interceptor.as_ref().filter(|_| kind.accepts(Phase::Intercept)) {
            bound.push(BoundCallable::Intercept(Bound::new(Arc::clone(owner), Arc::clone(interceptor))));
        }
        if let Some(terminator) = self.terminator.as_ref().filter(|_| kind.accepts(Phase::Terminate)) {
            bound.push(BoundCallable::Terminate(Bound::new(Arc::clone(owner), Arc::clone(terminator))));
        }

        bound
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("owner", &self.owner)
            .field("validator", &self.validator.is_some())
            .field("handler", &self.handler.is_some())
            .field("interceptor", &self.interceptor.is_some())
            .field("terminator", &self.terminator.is_some())
            .finish()
    }
}

/// The ways a middleware can be referenced from a builder call.
#[derive(Debug, Clone)]
pub enum MiddlewareRef {
    /// an alias looked up in the [`Resolver`](crate::Resolver)
    Named(String),
    /// a closure already bound to its phase, see [`handle_fn`] and friends
    Closure(BoundCallable),
    /// a middleware object with its declared capabilities
    Instance(Capabilities),
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        MiddlewareRef::Named(name.into())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        MiddlewareRef::Named(name)
    }
}

impl From<Capabilities> for MiddlewareRef {
    fn from(capabilities: Capabilities) -> Self {
        MiddlewareRef::Instance(capabilities)
    }
}

impl From<BoundCallable> for MiddlewareRef {
    fn from(callable: BoundCallable) -> Self {
        MiddlewareRef::Closure(callable)
    }
}

struct FnValidator<F>(F);
struct FnMiddleware<F>(F);
struct FnInterceptor<F>(F);
struct FnTerminator<F>(F);
struct FnErrorHandler<F>(F);

#[async_trait]
impl<F> Validator for FnValidator<F>
where
    F: for<'a> Fn(HandleContext<'a>) -> BoxFuture<'a, Result<Flow, BoxError>> + Send + Sync,
{
    async fn validate(&self, ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
        (self.0)(ctx).await
    }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(HandleContext<'a>) -> BoxFuture<'a, Result<Flow, BoxError>> + Send + Sync,
{
    async fn handle(&self, ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
        (self.0)(ctx).await
    }
}

#[async_trait]
impl<F> Interceptor for FnInterceptor<F>
where
    F: for<'a> Fn(InterceptContext<'a>, Payload) -> BoxFuture<'a, Result<Payload, BoxError>> + Send + Sync,
{
    async fn intercept(&self, ctx: InterceptContext<'_>, body: Payload) -> Result<Payload, BoxError> {
        (self.0)(ctx, body).await
    }
}

#[async_trait]
impl<F> Terminator for FnTerminator<F>
where
    F: for<'a> Fn(TerminateContext<'a>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn terminate(&self, ctx: TerminateContext<'_>) -> Result<(), BoxError> {
        (self.0)(ctx).await
    }
}

#[async_trait]
impl<F> ErrorHandler for FnErrorHandler<F>
where
    F: for<'a> Fn(ErrorContext<'a>) -> BoxFuture<'a, ()> + Send + Sync,
{
    async fn handle_error(&self, ctx: ErrorContext<'_>) {
        (self.0)(ctx).await;
    }
}

/// Wraps a closure as a validate phase callable
pub fn validate_fn<F>(f: F) -> BoundCallable
where
    F: for<'a> Fn(HandleContext<'a>) -> BoxFuture<'a, Result<Flow, BoxError>> + Send + Sync + 'static,
{
    let callable: Arc<dyn Validator> = Arc::new(FnValidator(f));
    BoundCallable::Validate(Bound::new(std::any::type_name::<F>(), callable))
}

/// Wraps a closure as a handle phase callable
///
/// ```
/// use micro_route::{handle_fn, Flow};
///
/// let stamp = handle_fn(|mut ctx| {
///     Box::pin(async move {
///         ctx.data_mut().insert("stamped", true);
///         Ok(Flow::Next)
///     })
/// });
/// ```
pub fn handle_fn<F>(f: F) -> BoundCallable
where
    F: for<'a> Fn(HandleContext<'a>) -> BoxFuture<'a, Result<Flow, BoxError>> + Send + Sync + 'static,
{
    let callable: Arc<dyn Middleware> = Arc::new(FnMiddleware(f));
    BoundCallable::Handle(Bound::new(std::any::type_name::<F>(), callable))
}

/// Wraps a closure as an intercept phase callable
pub fn intercept_fn<F>(f: F) -> BoundCallable
where
    F: for<'a> Fn(InterceptContext<'a>, Payload) -> BoxFuture<'a, Result<Payload, BoxError>> + Send + Sync + 'static,
{
    let callable: Arc<dyn Interceptor> = Arc::new(FnInterceptor(f));
    BoundCallable::Intercept(Bound::new(std::any::type_name::<F>(), callable))
}

/// Wraps a closure as a terminate phase callable
pub fn terminate_fn<F>(f: F) -> BoundCallable
where
    F: for<'a> Fn(TerminateContext<'a>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    let callable: Arc<dyn Terminator> = Arc::new(FnTerminator(f));
    BoundCallable::Terminate(Bound::new(std::any::type_name::<F>(), callable))
}

/// Wraps a closure as the error handler
pub fn error_fn<F>(f: F) -> Arc<dyn ErrorHandler>
where
    F: for<'a> Fn(ErrorContext<'a>) -> BoxFuture<'a, ()> + Send + Sync + 'static,
{
    Arc::new(FnErrorHandler(f))
}

#[cfg(test)]
mod tests {
    use super::{Capabilities, Middleware, MiddlewareKind, Phase, Terminator, Validator};
    use crate::context::{HandleContext, TerminateContext};
    use crate::error::BoxError;
    use crate::transport::Flow;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Audit;

    #[async_trait]
    impl Middleware for Audit {
        async fn handle(&self, _ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
            Ok(Flow::Next)
        }
    }

    #[async_trait]
    impl Validator for Audit {
        async fn validate(&self, _ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
            Ok(Flow::Next)
        }
    }

    #[async_trait]
    impl Terminator for Audit {
        async fn terminate(&self, _ctx: TerminateContext<'_>) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn audit() -> Capabilities {
        let audit = Arc::new(Audit);
        Capabilities::new("Audit")
            .with_terminator(Arc::clone(&audit))
            .with_validator(Arc::clone(&audit))
            .with_handler(audit)
    }

    #[test]
    fn test_bind_keeps_phase_order() {
        let phases: Vec<_> = audit().bind(MiddlewareKind::Middleware).iter().map(|c| c.phase()).collect();
        assert_eq!(phases, vec![Phase::Handle, Phase::Terminate]);
    }

    #[test]
    fn test_bind_filters_by_kind() {
        let bound = audit().bind(MiddlewareKind::Validator);
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].phase(), Phase::Validate);
        assert_eq!(bound[0].owner(), "Audit");

        assert!(audit().bind(MiddlewareKind::Interceptor).is_empty());
    }

    #[test]
    fn test_kind_accepts() {
        assert!(MiddlewareKind::Middleware.accepts(Phase::Intercept));
        assert!(!MiddlewareKind::Middleware.accepts(Phase::Validate));
        assert!(MiddlewareKind::Terminator.accepts(Phase::Terminate));
        assert!(!MiddlewareKind::Terminator.accepts(Phase::Handle));
    }

    #[test]
    fn test_empty_capabilities() {
        assert!(Capabilities::new("Nothing").is_empty());
        assert!(!audit().is_empty());
    }
}
