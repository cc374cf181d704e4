//! Per phase views over an [`Exchange`].
//!
//! Each phase gets its own context type exposing what that phase may see or touch:
//! - `HandleContext`: validators, middlewares and route handlers, full access to the reply
//! - `InterceptContext`: interceptors, status and headers only, the body is passed next to the context
//! - `TerminateContext`: terminators, read only, the response is already final
//! - `ErrorContext`: the error handler, with the failure that interrupted the request
//!
//! All of them borrow the same [`DataBag`], so a value written in one phase is seen by
//! every later phase of the same request.

use crate::data::DataBag;
use crate::error::BoxError;
use crate::request::{PathParams, Queries, Request};
use crate::transport::{Exchange, Reply};
use http::{HeaderMap, StatusCode};
use std::error::Error;
use std::time::Duration;

/// Context of the validate and handle phases.
#[derive(Debug)]
pub struct HandleContext<'a> {
    request: &'a Request,
    response: &'a mut Reply,
    data: &'a mut DataBag,
}

impl<'a> HandleContext<'a> {
    pub fn new(exchange: &'a mut Exchange) -> Self {
        let (request, response, data) = exchange.split_mut();
        Self { request, response, data }
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn params(&self) -> &PathParams {
        self.request.params()
    }

    pub fn queries(&self) -> &Queries {
        self.request.queries()
    }

    pub fn response(&mut self) -> &mut Reply {
        &mut *self.response
    }

    pub fn data(&self) -> &DataBag {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBag {
        &mut *self.data
    }
}

/// Context of the intercept phase.
#[derive(Debug)]
pub struct InterceptContext<'a> {
    request: &'a Request,
    response: &'a mut Reply,
    data: &'a mut DataBag,
}

impl<'a> InterceptContext<'a> {
    pub fn new(exchange: &'a mut Exchange) -> Self {
        let (request, response, data) = exchange.split_mut();
        Self { request, response, data }
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    /// The status the response is about to be sent with
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    /// Response headers, the body is the payload handed to the interceptor and returned by it
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.response.headers_mut()
    }

    pub fn data(&self) -> &DataBag {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBag {
        &mut *self.data
    }
}

/// Context of the terminate phase, everything is read only.
#[derive(Debug, Clone, Copy)]
pub struct TerminateContext<'a> {
    exchange: &'a Exchange,
}

impl<'a> TerminateContext<'a> {
    pub fn new(exchange: &'a Exchange) -> Self {
        Self { exchange }
    }

    pub fn request(&self) -> &'a Request {
        self.exchange.request()
    }

    pub fn response(&self) -> &'a Reply {
        self.exchange.reply()
    }

    pub fn data(&self) -> &'a DataBag {
        self.exchange.data()
    }

    /// Headers of the sent response
    pub fn headers(&self) -> &'a HeaderMap {
        self.exchange.reply().headers()
    }

    pub fn status(&self) -> StatusCode {
        self.exchange.reply().status()
    }

    /// Time between the start of the exchange and now
    pub fn response_time(&self) -> Duration {
        self.exchange.elapsed()
    }
}

/// Context of the error phase.
#[derive(Debug)]
pub struct ErrorContext<'a> {
    request: &'a Request,
    response: &'a mut Reply,
    data: &'a mut DataBag,
    error: BoxError,
}

impl<'a> ErrorContext<'a> {
    pub fn new(exchange: &'a mut Exchange, error: BoxError) -> Self {
        let (request, response, data) = exchange.split_mut();
        Self { request, response, data, error }
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn response(&mut self) -> &mut Reply {
        &mut *self.response
    }

    pub fn data(&self) -> &DataBag {
        &*self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBag {
        &mut *self.data
    }

    pub fn error(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.error.as_ref()
    }

    /// Tries to view the error as a concrete type
    pub fn downcast_error<E: Error + 'static>(&self) -> Option<&E> {
        self.error.downcast_ref::<E>()
    }

    pub fn into_error(self) -> BoxError {
        self.error
    }
}
