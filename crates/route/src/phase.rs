//! Adapts compiled routes to the hook model of a [`Transport`](crate::Transport).
//!
//! Every bound callable becomes one hook. Hooks build the context of their phase over
//! the transport's [`Exchange`], so all of them share the request, the reply and the
//! data bag of that exchange.

use crate::context::{ErrorContext, HandleContext, InterceptContext, TerminateContext};
use crate::error::BoxError;
use crate::handler::BoundHandler;
use crate::middleware::{Bound, ErrorHandler, Interceptor, Middleware, Terminator, Validator};
use crate::payload::Payload;
use crate::route::CompiledRoute;
use crate::transport::{Exchange, Flow, OnError, OnResponse, OnSend, PreHandler, RouteHandler, RouteHooks, TransportRoute};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{error, trace};

/// Builds [`TransportRoute`]s out of compiled routes.
#[derive(Clone, Default)]
pub struct PhaseAdapter {
    error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl PhaseAdapter {
    pub fn new(error_handler: Option<Arc<dyn ErrorHandler>>) -> Self {
        Self { error_handler }
    }

    pub fn adapt(&self, route: &CompiledRoute) -> TransportRoute {
        let middlewares = route.middlewares();

        let mut pre_handlers: Vec<Arc<dyn PreHandler>> = Vec::with_capacity(middlewares.validators().len() + middlewares.handlers().len());
        for validator in middlewares.validators() {
            pre_handlers.push(Arc::new(ValidateHook(validator.clone())));
        }
        for handler in middlewares.handlers() {
            pre_handlers.push(Arc::new(HandleHook(handler.clone())));
        }

        let on_send: Vec<Arc<dyn OnSend>> =
            middlewares.interceptors().iter().map(|interceptor| Arc::new(InterceptHook(interceptor.clone())) as Arc<dyn OnSend>).collect();

        let on_response: Vec<Arc<dyn OnResponse>> =
            middlewares.terminators().iter().map(|terminator| Arc::new(TerminateHook(terminator.clone())) as Arc<dyn OnResponse>).collect();

        let on_error = self.error_handler.as_ref().map(|handler| Arc::new(ErrorHook(Arc::clone(handler))) as Arc<dyn OnError>);

        TransportRoute {
            url: route.url().to_string(),
            methods: route.methods().to_vec(),
            handler: Arc::new(HandlerHook(route.handler().clone())),
            hooks: RouteHooks { pre_handlers, on_send, on_response, on_error },
            options: route.options().clone(),
        }
    }
}

impl std::fmt::Debug for PhaseAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseAdapter").field("error_handler", &self.error_handler.is_some()).finish()
    }
}

struct ValidateHook(Bound<dyn Validator>);

#[async_trait]
impl PreHandler for ValidateHook {
    async fn pre_handle(&self, exchange: &mut Exchange) -> Result<Flow, BoxError> {
        trace!(owner = self.0.owner(), "validate");
        self.0.validate(HandleContext::new(exchange)).await
    }
}

struct HandleHook(Bound<dyn Middleware>);

#[async_trait]
impl PreHandler for HandleHook {
    async fn pre_handle(&self, exchange: &mut Exchange) -> Result<Flow, BoxError> {
        trace!(owner = self.0.owner(), "handle");
        self.0.handle(HandleContext::new(exchange)).await
    }
}

struct HandlerHook(BoundHandler);

#[async_trait]
impl RouteHandler for HandlerHook {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), BoxError> {
        let payload = self.0.invoke(HandleContext::new(exchange)).await?;
        if !exchange.reply().is_sent() {
            exchange.reply_mut().send(payload)?;
        }
        Ok(())
    }
}

struct InterceptHook(Bound<dyn Interceptor>);

#[async_trait]
impl OnSend for InterceptHook {
    async fn on_send(&self, exchange: &mut Exchange, payload: Bytes) -> Result<Bytes, BoxError> {
        let body = Payload::decode(payload, exchange.reply().headers().get(CONTENT_TYPE));
        trace!(owner = self.0.owner(), "intercept");
        let body = self.0.intercept(InterceptContext::new(exchange), body).await?;
        exchange.reply_mut().label(&body);
        Ok(body.encode()?)
    }
}

struct TerminateHook(Bound<dyn Terminator>);

#[async_trait]
impl OnResponse for TerminateHook {
    async fn on_response(&self, exchange: &Exchange) {
        if let Err(e) = self.0.terminate(TerminateContext::new(exchange)).await {
            error!(owner = self.0.owner(), "terminator failed: {}", e);
        }
    }
}

struct ErrorHook(Arc<dyn ErrorHandler>);

#[async_trait]
impl OnError for ErrorHook {
    async fn on_error(&self, exchange: &mut Exchange, error: BoxError) {
        self.0.handle_error(ErrorContext::new(exchange, error)).await;
    }
}
