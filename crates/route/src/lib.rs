//! Route tree compiler and middleware phases in front of an HTTP transport.
//!
//! Routes, groups and resources are declared on a [`Router`] at startup. Middlewares are
//! referenced by name, by closure or by instance and resolved right away, so a typo fails
//! startup instead of a request. [`Router::register`] compiles the tree into flat
//! [`CompiledRoute`]s and hands them to a [`Transport`] as hook lists, one per phase:
//!
//! 1. validate: [`Validator`]s
//! 2. handle: [`Middleware`]s, then the route [`RequestHandler`]
//! 3. intercept: [`Interceptor`]s rewriting the response payload
//! 4. terminate: [`Terminator`]s once the response is final
//!
//! A failure in any of them goes to the single [`ErrorHandler`] instead.

mod config;
mod context;
mod controller;
mod data;
mod error;
mod handler;
mod payload;
mod phase;
mod request;
mod resolver;

pub mod middleware;
pub mod route;
pub mod router;
pub mod transport;

pub use config::RouterConfig;
pub use context::{ErrorContext, HandleContext, InterceptContext, TerminateContext};
pub use controller::{Controller, ControllerRef};
pub use data::DataBag;
pub use error::{BoxError, RouteError};
pub use handler::{BoundHandler, FnHandler, RequestHandler, handler_fn};
pub use middleware::{
    Bound, BoundCallable, Capabilities, ErrorHandler, Interceptor, Middleware, MiddlewareKind, MiddlewareRef,
    MiddlewareResolver, Phase, Terminator, Validator, error_fn, handle_fn, intercept_fn, terminate_fn, validate_fn,
};
pub use payload::Payload;
pub use phase::PhaseAdapter;
pub use request::{PathParams, Queries, Request};
pub use resolver::{Binding, Container, Resolver};
pub use route::{CompiledRoute, HandlerRef, RouteDescriptor, RouteGroup, RouteResource, RouteSpec};
pub use router::Router;
pub use transport::{Exchange, Flow, LocalTransport, Reply, Transport, TransportOptions, TransportRoute};
