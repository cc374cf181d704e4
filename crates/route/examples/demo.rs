use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use micro_route::{
    BoxError, Capabilities, Container, Controller, Flow, HandleContext, LocalTransport, Middleware, Payload, Router,
    RouteError, TerminateContext, Terminator, error_fn, handler_fn, intercept_fn,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Deserialize, Debug)]
struct NewUser {
    name: String,
}

/// rejects requests without an api key and logs every finished request
struct ApiKey;

#[async_trait]
impl Middleware for ApiKey {
    async fn handle(&self, mut ctx: HandleContext<'_>) -> Result<Flow, BoxError> {
        match ctx.request().headers().get("x-api-key").and_then(|value| value.to_str().ok()) {
            Some(key) => {
                let key = key.to_string();
                ctx.data_mut().insert("api_key", key);
                Ok(Flow::Next)
            }
            None => {
                ctx.response().set_status(StatusCode::UNAUTHORIZED).json(&json!({"error": "missing api key"}))?;
                Ok(Flow::Halt)
            }
        }
    }
}

#[async_trait]
impl Terminator for ApiKey {
    async fn terminate(&self, ctx: TerminateContext<'_>) -> Result<(), BoxError> {
        info!(
            path = ctx.request().path(),
            status = ctx.status().as_u16(),
            elapsed = ?ctx.response_time(),
            "request finished"
        );
        Ok(())
    }
}

fn users() -> Controller {
    Controller::new("UserController")
        .action("index", handler_fn(|_ctx| Box::pin(async { Ok(Payload::json(&json!([{"id": 1, "name": "alice"}]))?) })))
        .action(
            "show",
            handler_fn(|ctx| {
                Box::pin(async move {
                    let id: u64 = ctx.params().get("id").unwrap_or_default().parse()?;
                    Ok(Payload::json(&json!({"id": id, "name": "alice"}))?)
                })
            }),
        )
        .action(
            "store",
            handler_fn(|mut ctx| {
                Box::pin(async move {
                    let user: NewUser = ctx.request().json()?;
                    ctx.response().set_status(StatusCode::CREATED);
                    Ok(Payload::json(&json!({"id": 2, "name": user.name}))?)
                })
            }),
        )
        .action("update", handler_fn(|_ctx| Box::pin(async { Ok(Payload::Empty) })))
        .action("delete", handler_fn(|_ctx| Box::pin(async { Ok(Payload::Empty) })))
}

fn routes(router: &mut Router) -> Result<(), RouteError> {
    router.get("health", handler_fn(|_ctx| Box::pin(async { Ok(Payload::from("ok")) })))?.name("health");

    router
        .group(|router| {
            router.resource("users", "UserController").except(&["delete"]);
            Ok(())
        })?
        .prefix("api")
        .name("api")
        .middleware("apiKey")?
        .interceptor(intercept_fn(|ctx, body| {
            Box::pin(async move {
                match body {
                    Payload::Json(data) => Ok(Payload::from(json!({"data": data, "status": ctx.status().as_u16()}))),
                    other => Ok(other),
                }
            })
        }))?;

    router.error_handler(error_fn(|mut ctx| {
        Box::pin(async move {
            let message = ctx.error().to_string();
            let _ = ctx.response().set_status(StatusCode::BAD_REQUEST).json(&json!({"error": message}));
        })
    }));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), RouteError> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let api_key = Arc::new(ApiKey);
    let mut container = Container::new();
    container.bind_middleware("App/Middlewares/Names/apiKey", Capabilities::new("ApiKey").with_handler(Arc::clone(&api_key)).with_terminator(api_key));
    container.bind_controller("App/Controllers/UserController", users());

    let mut router = Router::new(container);
    routes(&mut router)?;

    for route in router.list()? {
        info!(route = %serde_json::to_string(&route.describe()).unwrap_or_default(), "route");
    }

    let mut transport = LocalTransport::new();
    router.register(&mut transport)?;

    let requests = [
        (Method::GET, "/health", None, Bytes::new()),
        (Method::GET, "/api/users/1", Some("secret"), Bytes::new()),
        (Method::GET, "/api/users/abc", Some("secret"), Bytes::new()),
        (Method::POST, "/api/users", Some("secret"), Bytes::from_static(br#"{"name":"bob"}"#)),
        (Method::GET, "/api/users", None, Bytes::new()),
        (Method::DELETE, "/api/users/1", Some("secret"), Bytes::new()),
    ];

    for (method, uri, key, body) in requests {
        let mut builder = http::Request::builder().method(method.clone()).uri(uri);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        let request = builder.body(body).expect("valid request");

        let response = transport.dispatch(request).await;
        info!(%method, uri, status = response.status().as_u16(), body = %String::from_utf8_lossy(response.body()), "dispatched");
    }

    Ok(())
}
