use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, StatusCode};
use micro_route::{
    Binding, BoxError, Capabilities, Container, Controller, Flow, HandleContext, InterceptContext, Interceptor,
    LocalTransport, Middleware, Payload, Resolver, RouteError, Router, RouterConfig, TerminateContext, Terminator,
    error_fn, handle_fn, handler_fn, intercept_fn, terminate_fn,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

fn request(method: Method, uri: &str) -> http::Request<Bytes> {
    http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap()
}

fn json_body(response: &http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

/// counts requests in the handle phase, flags the response in the intercept phase and
/// counts finished responses in the terminate phase
struct Tracker {
    handled: AtomicUsize,
    terminated: AtomicUsize,
}

#[async_trait]
impl Middleware for Tracker {
    async fn handle(&self, mut ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        ctx.data_mut().insert("user", "alice");
        Ok(Flow::Next)
    }
}

#[async_trait]
impl Interceptor for Tracker {
    async fn intercept(&self, ctx: InterceptContext<'_>, mut body: Payload) -> Result<Payload, BoxError> {
        if let Some(object) = body.as_json_mut().and_then(Value::as_object_mut) {
            object.insert("flag".into(), json!(true));
            object.insert("status".into(), json!(ctx.status().as_u16()));
        }
        Ok(body)
    }
}

#[async_trait]
impl Terminator for Tracker {
    async fn terminate(&self, ctx: TerminateContext<'_>) -> Result<(), BoxError> {
        assert_eq!(ctx.data().get_as::<String>("user").as_deref(), Some("alice"));
        self.terminated.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn tracker() -> Arc<Tracker> {
    Arc::new(Tracker { handled: AtomicUsize::new(0), terminated: AtomicUsize::new(0) })
}

fn capabilities(tracker: &Arc<Tracker>) -> Capabilities {
    Capabilities::new("Tracker")
        .with_handler(Arc::clone(tracker))
        .with_interceptor(Arc::clone(tracker))
        .with_terminator(Arc::clone(tracker))
}

fn whoami() -> micro_route::BoundHandler {
    handler_fn(|ctx| {
        Box::pin(async move {
            let user = ctx.data().get_as::<String>("user").unwrap_or_default();
            Ok(Payload::json(&json!({ "user": user, "path": ctx.request().path() }))?)
        })
    })
}

#[tokio::test]
async fn test_group_route_runs_every_phase() {
    let tracker = tracker();
    let mut container = Container::new();
    container.bind_middleware("App/Middlewares/Names/track", capabilities(&tracker));

    let mut router = Router::new(container);
    router
        .group(|router| {
            router.route("test", [Method::GET], whoami())?;
            Ok(())
        })
        .unwrap()
        .prefix("v1")
        .middleware("track")
        .unwrap();

    let routes = router.list().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].url(), "/v1/test");
    assert_eq!(routes[0].describe().middlewares.handlers, vec!["Tracker"]);

    let mut transport = LocalTransport::new();
    assert_eq!(router.register(&mut transport).unwrap(), 1);

    let response = transport.dispatch(request(Method::GET, "/v1/test")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(json_body(&response), json!({"user": "alice", "path": "/v1/test", "flag": true, "status": 200}));
    assert_eq!(tracker.handled.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.terminated.load(Ordering::SeqCst), 1);

    let response = transport.dispatch(request(Method::POST, "/v1/test")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let response = transport.dispatch(request(Method::GET, "/v2/test")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(tracker.handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_halt_skips_the_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let terminated = Arc::new(AtomicUsize::new(0));

    let mut router = Router::new(Container::new());
    let handler_calls = Arc::clone(&calls);
    let terminator_calls = Arc::clone(&terminated);
    router
        .get(
            "private",
            handler_fn(move |_ctx| {
                handler_calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { Ok(Payload::from("secret")) })
            }),
        )
        .unwrap()
        .middleware(handle_fn(|mut ctx| {
            Box::pin(async move {
                if ctx.request().headers().contains_key("authorization") {
                    return Ok(Flow::Next);
                }
                ctx.response().set_status(StatusCode::UNAUTHORIZED).send("unauthorized")?;
                Ok(Flow::Halt)
            })
        }))
        .unwrap()
        .terminator(terminate_fn(move |_ctx| {
            terminator_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }))
        .unwrap();

    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let response = transport.dispatch(request(Method::GET, "/private")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.body(), &Bytes::from_static(b"unauthorized"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(terminated.load(Ordering::SeqCst), 1);

    let authorized =
        http::Request::builder().uri("/private").header("authorization", "token").body(Bytes::new()).unwrap();
    let response = transport.dispatch(authorized).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), &Bytes::from_static(b"secret"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_error_goes_to_the_error_handler_once() {
    let after_failure = Arc::new(AtomicUsize::new(0));
    let terminated = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));

    let mut router = Router::new(Container::new());
    let (skipped, terminator_calls, error_calls) = (Arc::clone(&after_failure), Arc::clone(&terminated), Arc::clone(&errors));
    router
        .post("orders", handler_fn(|_ctx| Box::pin(async { Ok(Payload::Empty) })))
        .unwrap()
        .middleware(handle_fn(|_ctx| Box::pin(async { Err::<Flow, BoxError>("payment declined".into()) })))
        .unwrap()
        .middleware(handle_fn(move |_ctx| {
            skipped.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(Flow::Next) })
        }))
        .unwrap()
        .terminator(terminate_fn(move |_ctx| {
            terminator_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }))
        .unwrap();

    router.error_handler(error_fn(move |mut ctx| {
        error_calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            let body = json!({"error": ctx.error().to_string()});
            let _ = ctx.response().set_status(StatusCode::PAYMENT_REQUIRED).json(&body);
        })
    }));

    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let response = transport.dispatch(request(Method::POST, "/orders")).await;
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(json_body(&response), json!({"error": "payment declined"}));
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(after_failure.load(Ordering::SeqCst), 0);
    assert_eq!(terminated.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failing_interceptor_without_error_handler() {
    let mut router = Router::new(Container::new());
    router
        .get("broken", handler_fn(|_ctx| Box::pin(async { Ok(Payload::from("fine")) })))
        .unwrap()
        .interceptor(intercept_fn(|_ctx, _body| Box::pin(async { Err::<Payload, BoxError>("cannot rewrite".into()) })))
        .unwrap();

    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let response = transport.dispatch(request(Method::GET, "/broken")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn test_interceptor_changing_the_payload_kind() {
    let mut router = Router::new(Container::new());
    router
        .get("greeting", handler_fn(|_ctx| Box::pin(async { Ok(Payload::from("hello")) })))
        .unwrap()
        .interceptor(intercept_fn(|_ctx, body| {
            Box::pin(async move {
                let text = body.as_text().unwrap_or_default().to_string();
                Ok(Payload::from(json!({ "wrapped": text })))
            })
        }))
        .unwrap()
        .interceptor(intercept_fn(|_ctx, body| {
            Box::pin(async move {
                match body {
                    Payload::Json(mut value) => {
                        value["flag"] = json!(true);
                        Ok(Payload::Json(value))
                    }
                    other => Err::<Payload, BoxError>(format!("expected json, got {other:?}").into()),
                }
            })
        }))
        .unwrap();

    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let response = transport.dispatch(request(Method::GET, "/greeting")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(json_body(&response), json!({"wrapped": "hello", "flag": true}));
}

#[tokio::test]
async fn test_interceptor_header_changes_reach_the_client() {
    let mut router = Router::new(Container::new());
    router
        .get("report", handler_fn(|_ctx| Box::pin(async { Ok(Payload::from(json!({"rows": 3}))) })))
        .unwrap()
        .interceptor(intercept_fn(|mut ctx, body| {
            Box::pin(async move {
                ctx.set_status(StatusCode::ACCEPTED);
                ctx.headers_mut().insert(CONTENT_TYPE, http::HeaderValue::from_static("application/vnd.report+json"));
                Ok(body)
            })
        }))
        .unwrap();

    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let response = transport.dispatch(request(Method::GET, "/report")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/vnd.report+json");
    assert_eq!(json_body(&response), json!({"rows": 3}));
}

#[tokio::test]
async fn test_nested_resource_with_controller_instance() {
    let show = handler_fn(|ctx| {
        Box::pin(async move {
            let params = ctx.params();
            Ok(Payload::json(&json!({
                "test": params.get("test_id"),
                "subTest": params.get("id"),
            }))?)
        })
    });
    let index = handler_fn(|_ctx| Box::pin(async { Ok(Payload::json(&json!([]))?) }));
    let controller = ["store", "update", "delete"]
        .into_iter()
        .fold(Controller::new("SubTestController").action("show", show).action("index", index), |controller, action| {
            controller.action(action, handler_fn(|_ctx| Box::pin(async { Ok(Payload::Empty) })))
        });

    let mut router = Router::new(Container::new());
    router.group(|router| {
        router.resource("tests.subTests", controller).only(&["index", "show"]);
        Ok(())
    })
    .unwrap()
    .prefix("api");

    let routes = router.compile().unwrap();
    let urls: Vec<_> = routes.iter().map(|route| route.url()).collect();
    assert_eq!(urls, vec!["/api/tests/:test_id/subTests", "/api/tests/:test_id/subTests/:id"]);
    assert_eq!(routes[1].handler().owner(), "SubTestController.show");

    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let response = transport.dispatch(request(Method::GET, "/api/tests/3/subTests/9")).await;
    assert_eq!(json_body(&response), json!({"test": "3", "subTest": "9"}));

    let response = transport.dispatch(request(Method::DELETE, "/api/tests/3/subTests/9")).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn test_missing_middleware_fails_startup() {
    let mut router = Router::new(Container::new());
    let err = router.get("users", whoami()).unwrap().validator("not-found").unwrap_err();
    assert_eq!(
        err.to_string(),
        "validator not found, tried `App/Middlewares/Names/not-found` and `App/Middlewares/not-found`"
    );
    assert!(matches!(err, RouteError::MiddlewareNotFound { .. }));
}

#[test]
fn test_duplicate_route_is_a_conflict() {
    let mut router = Router::new(Container::new());
    router.get("users", whoami()).unwrap();
    router.any("users", whoami()).unwrap();

    let mut transport = LocalTransport::new();
    assert!(matches!(router.register(&mut transport), Err(RouteError::Conflict { .. })));
}

/// hands out whichever home controller is current, so it can be swapped while serving
struct LiveControllers(RwLock<Arc<Controller>>);

impl LiveControllers {
    fn new(version: &'static str) -> Arc<Self> {
        Arc::new(Self(RwLock::new(Arc::new(home(version)))))
    }

    fn swap(&self, version: &'static str) {
        *self.0.write().unwrap() = Arc::new(home(version));
    }
}

impl Resolver for LiveControllers {
    fn try_resolve(&self, alias: &str) -> Option<Binding> {
        (alias == "App/Controllers/HomeController").then(|| Binding::Controller(Arc::clone(&self.0.read().unwrap())))
    }
}

fn home(version: &'static str) -> Controller {
    Controller::new("HomeController").action("index", handler_fn(move |_ctx| Box::pin(async move { Ok(Payload::from(version)) })))
}

async fn serve_home(controllers: &Arc<LiveControllers>, config: RouterConfig) -> (Bytes, Bytes) {
    let mut router = Router::with_config(Arc::clone(controllers), config);
    router.get("/", "HomeController.index").unwrap();
    let mut transport = LocalTransport::new();
    router.register(&mut transport).unwrap();

    let before = transport.dispatch(request(Method::GET, "/")).await.into_body();
    controllers.swap("v2");
    let after = transport.dispatch(request(Method::GET, "/")).await.into_body();
    (before, after)
}

#[tokio::test]
async fn test_controllers_bound_once_by_default() {
    let controllers = LiveControllers::new("v1");
    let (before, after) = serve_home(&controllers, RouterConfig::default()).await;
    assert_eq!(before, Bytes::from_static(b"v1"));
    assert_eq!(after, Bytes::from_static(b"v1"));
}

#[tokio::test]
async fn test_rebinding_controllers_per_request() {
    let controllers = LiveControllers::new("v1");
    let (before, after) = serve_home(&controllers, RouterConfig::default().rebind_controllers(true)).await;
    assert_eq!(before, Bytes::from_static(b"v1"));
    assert_eq!(after, Bytes::from_static(b"v2"));
}
