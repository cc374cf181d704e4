//! The boundary towards the HTTP transport.
//!
//! A transport owns sockets, parsing and url matching. This crate hands it one
//! [`TransportRoute`] per compiled route: the url pattern, the methods, the route
//! handler and the hook lists it must run, in order, for every matching request.
//! Per request the transport owns an [`Exchange`] which every hook borrows.
//!
//! [`LocalTransport`] is an in-process implementation which is handy for tests and
//! for embedding the router behind another server.

mod local;

pub use local::LocalTransport;

use crate::data::DataBag;
use crate::error::{BoxError, RouteError};
use crate::payload::Payload;
use crate::request::Request;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tells the transport whether the pre-handler chain goes on.
///
/// Nothing advances implicitly: every pre-handler answers with one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// run the next callable of the chain
    Next,
    /// stop here, the reply is sent as it is and the route handler is skipped
    Halt,
}

/// A hook run before the route handler, in registration order.
#[async_trait]
pub trait PreHandler: Send + Sync {
    async fn pre_handle(&self, exchange: &mut Exchange) -> Result<Flow, BoxError>;
}

/// The route handler itself.
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, exchange: &mut Exchange) -> Result<(), BoxError>;
}

/// A hook receiving the serialized payload before it is written, returning the payload to write.
#[async_trait]
pub trait OnSend: Send + Sync {
    async fn on_send(&self, exchange: &mut Exchange, payload: Bytes) -> Result<Bytes, BoxError>;
}

/// A hook run once the response is final.
#[async_trait]
pub trait OnResponse: Send + Sync {
    async fn on_response(&self, exchange: &Exchange);
}

/// The hook run instead of normal completion when any other hook fails.
#[async_trait]
pub trait OnError: Send + Sync {
    async fn on_error(&self, exchange: &mut Exchange, error: BoxError);
}

/// The hook lists of one route.
#[derive(Clone, Default)]
pub struct RouteHooks {
    pub pre_handlers: Vec<Arc<dyn PreHandler>>,
    pub on_send: Vec<Arc<dyn OnSend>>,
    pub on_response: Vec<Arc<dyn OnResponse>>,
    pub on_error: Option<Arc<dyn OnError>>,
}

impl fmt::Debug for RouteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteHooks")
            .field("pre_handlers", &self.pre_handlers.len())
            .field("on_send", &self.on_send.len())
            .field("on_response", &self.on_response.len())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything a transport needs to serve one route.
#[derive(Clone)]
pub struct TransportRoute {
    pub url: String,
    pub methods: Vec<Method>,
    pub handler: Arc<dyn RouteHandler>,
    pub hooks: RouteHooks,
    pub options: TransportOptions,
}

impl fmt::Debug for TransportRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRoute")
            .field("url", &self.url)
            .field("methods", &self.methods)
            .field("hooks", &self.hooks)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Registers compiled routes into a concrete transport.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    fn register_route(&mut self, route: TransportRoute) -> Result<(), RouteError>;
}

/// Options for the transport (schemas, rate limits, security headers, ...).
///
/// They are opaque to the router and passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransportOptions {
    inner: Map<String, Value>,
}

impl TransportOptions {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.inner.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

/// The response under construction.
#[derive(Debug, Default)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    sent: bool,
    // content type derived from the last payload, any other value was chosen by a callable
    labelled: Option<HeaderValue>,
}

impl Reply {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// The serialized body written so far
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns true once a callable has sent a payload
    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Writes `payload` as the response body.
    ///
    /// The content type follows the payload, unless a callable chose one through the headers.
    pub fn send(&mut self, payload: impl Into<Payload>) -> Result<(), serde_json::Error> {
        let payload = payload.into();
        self.label(&payload);
        self.body = payload.encode()?;
        self.sent = true;
        Ok(())
    }

    /// Sets the content type announced by `payload`, replacing one set by an earlier payload
    pub(crate) fn label(&mut self, payload: &Payload) {
        let chosen_by_callable = self.headers.get(CONTENT_TYPE).is_some_and(|value| self.labelled.as_ref() != Some(value));
        if chosen_by_callable {
            return;
        }

        match payload.content_type().and_then(|mime| HeaderValue::from_str(mime.as_ref()).ok()) {
            Some(value) => {
                self.headers.insert(CONTENT_TYPE, value.clone());
                self.labelled = Some(value);
            }
            None => {
                self.headers.remove(CONTENT_TYPE);
                self.labelled = None;
            }
        }
    }

    /// Serializes `value` as json and sends it
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        self.send(Payload::json(value)?)
    }

    pub(crate) fn take_body(&mut self) -> Bytes {
        std::mem::take(&mut self.body)
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    /// Forgets a sent payload so the error phase starts from a clean body
    pub(crate) fn discard(&mut self) {
        self.body = Bytes::new();
        self.headers.remove(CONTENT_TYPE);
        self.labelled = None;
        self.sent = false;
    }
}

/// One physical request/response pair, owned by the transport for the lifetime of the request.
#[derive(Debug)]
pub struct Exchange {
    request: Request,
    reply: Reply,
    data: DataBag,
    started_at: Instant,
}

impl Exchange {
    pub fn new(request: Request) -> Self {
        Self { request, reply: Reply::default(), data: DataBag::new(), started_at: Instant::now() }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn reply(&self) -> &Reply {
        &self.reply
    }

    pub fn reply_mut(&mut self) -> &mut Reply {
        &mut self.reply
    }

    pub fn data(&self) -> &DataBag {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut DataBag {
        &mut self.data
    }

    /// Time elapsed since the exchange was created
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Borrows the request, the reply and the data bag at the same time
    pub fn split_mut(&mut self) -> (&Request, &mut Reply, &mut DataBag) {
        (&self.request, &mut self.reply, &mut self.data)
    }

    /// Builds the http response out of the reply, the body is cloned and the exchange stays usable
    pub fn to_response(&self) -> Response<Bytes> {
        let mut response = Response::new(self.reply.body.clone());
        *response.status_mut() = self.reply.status;
        *response.headers_mut() = self.reply.headers.clone();
        response
    }
}
