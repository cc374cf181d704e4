use crate::context::HandleContext;
use crate::error::BoxError;
use crate::middleware::Bound;
use crate::payload::Payload;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// The handler at the end of a route.
///
/// The returned [`Payload`] becomes the response body, unless the handler already sent
/// a reply through [`HandleContext::response`].
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, ctx: HandleContext<'_>) -> Result<Payload, BoxError>;
}

/// A request handler bound to its owner, `Controller.action` for controller actions
pub type BoundHandler = Bound<dyn RequestHandler>;

/// a closure holder which represents an async request handler
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: for<'a> Fn(HandleContext<'a>) -> BoxFuture<'a, Result<Payload, BoxError>> + Send + Sync,
{
    async fn invoke(&self, ctx: HandleContext<'_>) -> Result<Payload, BoxError> {
        (self.f)(ctx).await
    }
}

/// Wraps a closure as a route handler
///
/// ```
/// use micro_route::{handler_fn, Payload};
///
/// let hello = handler_fn(|ctx| {
///     Box::pin(async move { Ok(Payload::from(format!("hello {}", ctx.request().path()))) })
/// });
/// ```
pub fn handler_fn<F>(f: F) -> BoundHandler
where
    F: for<'a> Fn(HandleContext<'a>) -> BoxFuture<'a, Result<Payload, BoxError>> + Send + Sync + 'static,
{
    let handler: Arc<dyn RequestHandler> = Arc::new(FnHandler { f });
    Bound::new(std::any::type_name::<F>(), handler)
}
