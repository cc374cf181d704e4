use crate::middleware::{MiddlewareKind, Phase};
use std::error::Error;
use thiserror::Error;

/// error raised by a callable while a request is being served
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors raised while declaring, compiling or registering routes.
///
/// All of them are configuration errors: they surface synchronously from the
/// builder call, [`Router::compile`](crate::Router::compile) or
/// [`Router::register`](crate::Router::register) and are expected to abort startup.
#[derive(Error, Debug)]
pub enum RouteError {
    #[error("method `{method}` is not defined on controller `{controller}`")]
    UndefinedMethod { method: String, controller: String },

    #[error("nothing is bound to `{alias}`")]
    Unresolved { alias: String },

    #[error("controller `{alias}` could not be resolved")]
    ControllerNotFound { alias: String },

    #[error("{kind} not found, tried `{named_alias}` and `{direct_alias}`")]
    MiddlewareNotFound { kind: MiddlewareKind, direct_alias: String, named_alias: String },

    #[error("`{owner}` declares no {kind} capability")]
    NoCapability { kind: MiddlewareKind, owner: String },

    #[error("`{owner}` is a {phase} callable and can not be registered as {kind}")]
    PhaseMismatch { kind: MiddlewareKind, phase: Phase, owner: String },

    #[error("invalid handler `{handler}`: {reason}")]
    InvalidHandler { handler: String, reason: String },

    #[error("route conflict at `{url}`: {reason}")]
    Conflict { url: String, reason: String },
}

impl RouteError {
    pub fn undefined_method<M: ToString, C: ToString>(method: M, controller: C) -> Self {
        Self::UndefinedMethod { method: method.to_string(), controller: controller.to_string() }
    }

    pub fn unresolved<S: ToString>(alias: S) -> Self {
        Self::Unresolved { alias: alias.to_string() }
    }

    pub fn controller_not_found<S: ToString>(alias: S) -> Self {
        Self::ControllerNotFound { alias: alias.to_string() }
    }

    pub fn middleware_not_found(kind: MiddlewareKind, direct_alias: String, named_alias: String) -> Self {
        Self::MiddlewareNotFound { kind, direct_alias, named_alias }
    }

    pub fn no_capability<S: ToString>(kind: MiddlewareKind, owner: S) -> Self {
        Self::NoCapability { kind, owner: owner.to_string() }
    }

    pub fn phase_mismatch<S: ToString>(kind: MiddlewareKind, phase: Phase, owner: S) -> Self {
        Self::PhaseMismatch { kind, phase, owner: owner.to_string() }
    }

    pub fn invalid_handler<H: ToString, R: ToString>(handler: H, reason: R) -> Self {
        Self::InvalidHandler { handler: handler.to_string(), reason: reason.to_string() }
    }

    pub fn conflict<U: ToString, R: ToString>(url: U, reason: R) -> Self {
        Self::Conflict { url: url.to_string(), reason: reason.to_string() }
    }
}
