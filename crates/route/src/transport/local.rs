use crate::error::{BoxError, RouteError};
use crate::request::{PathParams, Request};
use crate::transport::{Exchange, Flow, Transport, TransportRoute};
use bytes::Bytes;
use http::header::ALLOW;
use http::{HeaderValue, Method, Response, StatusCode};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, trace};

type InnerRouter = matchit::Router<usize>;

/// An in-process transport: matches urls with `matchit` and runs the hooks of the matched
/// route against an [`Exchange`].
///
/// Route patterns use `:name` for a segment parameter and `*` (or `*name`) for the rest
/// of the path.
#[derive(Default)]
pub struct LocalTransport {
    inner_router: InnerRouter,
    patterns: HashMap<String, usize>,
    routes: Vec<Vec<TransportRoute>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.routes.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Serves one request.
    ///
    /// Unknown paths get a 404, known paths without a route for the method a 405.
    pub async fn dispatch(&self, request: http::Request<Bytes>) -> Response<Bytes> {
        let (head, body) = request.into_parts();
        let path = head.uri.path().to_string();

        let matched = match self.inner_router.at(&path) {
            Ok(matched) => matched,
            Err(e) => {
                debug!(path = %path, "no route matched: {}", e);
                return bare(StatusCode::NOT_FOUND);
            }
        };

        let candidates = &self.routes[*matched.value];
        let Some(route) = candidates.iter().find(|route| route.methods.contains(&head.method)) else {
            debug!(path = %path, method = %head.method, "method not allowed");
            return method_not_allowed(candidates);
        };

        let params = PathParams::from(matched.params);
        let is_head = head.method == Method::HEAD;
        let mut exchange = Exchange::new(Request::new(head, body, params));

        let mut response = match run(route, &mut exchange).await {
            Ok(()) => {
                let response = exchange.to_response();
                for hook in &route.hooks.on_response {
                    hook.on_response(&exchange).await;
                }
                response
            }
            Err(e) => fail(route, &mut exchange, e).await,
        };

        if is_head {
            *response.body_mut() = Bytes::new();
        }
        response
    }
}

async fn run(route: &TransportRoute, exchange: &mut Exchange) -> Result<(), BoxError> {
    let mut halted = false;
    for hook in &route.hooks.pre_handlers {
        if hook.pre_handle(exchange).await? == Flow::Halt {
            trace!(url = %route.url, "pre handler chain halted");
            halted = true;
            break;
        }
    }

    if !halted {
        route.handler.handle(exchange).await?;
    }

    if exchange.reply().is_sent() {
        let mut payload = exchange.reply_mut().take_body();
        for hook in &route.hooks.on_send {
            payload = hook.on_send(exchange, payload).await?;
        }
        exchange.reply_mut().set_body(payload);
    }
    Ok(())
}

async fn fail(route: &TransportRoute, exchange: &mut Exchange, e: BoxError) -> Response<Bytes> {
    exchange.reply_mut().discard();

    match &route.hooks.on_error {
        Some(hook) => hook.on_error(exchange, e).await,
        None => error!(url = %route.url, "request failed without error handler: {}", e),
    }

    if exchange.reply().is_sent() { exchange.to_response() } else { bare(StatusCode::INTERNAL_SERVER_ERROR) }
}

fn bare(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

fn method_not_allowed(routes: &[TransportRoute]) -> Response<Bytes> {
    let mut response = bare(StatusCode::METHOD_NOT_ALLOWED);
    let allowed: Vec<&str> = routes.iter().flat_map(|route| route.methods.iter().map(Method::as_str)).collect();
    if let Ok(value) = HeaderValue::from_str(&allowed.join(", ")) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// `/users/:id/*` becomes `/users/{id}/{*wildcard}`
fn to_matchit(url: &str) -> String {
    let segments: Vec<String> = url
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if let Some(name) = segment.strip_prefix('*') {
                let name = if name.is_empty() { "wildcard" } else { name };
                format!("{{*{name}}}")
            } else {
                segment.to_string()
            }
        })
        .collect();
    segments.join("/")
}

impl Transport for LocalTransport {
    fn register_route(&mut self, route: TransportRoute) -> Result<(), RouteError> {
        let pattern = to_matchit(&route.url);

        if let Some(&index) = self.patterns.get(&pattern) {
            let registered = &mut self.routes[index];
            if let Some(method) = route.methods.iter().find(|method| registered.iter().any(|r| r.methods.contains(*method))) {
                return Err(RouteError::conflict(&route.url, format!("{method} is already registered")));
            }
            debug!(url = %route.url, methods = ?route.methods, "register route");
            registered.push(route);
            return Ok(());
        }

        let index = self.routes.len();
        self.inner_router.insert(pattern.clone(), index).map_err(|e| RouteError::conflict(&route.url, e))?;
        debug!(url = %route.url, methods = ?route.methods, "register route");
        self.patterns.insert(pattern, index);
        self.routes.push(vec![route]);
        Ok(())
    }
}

impl fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTransport").field("patterns", &self.patterns.keys().collect::<Vec<_>>()).finish_non_exhaustive()
    }
}
