//! `allowed_methods()`: 405 / 501 / OPTIONS responses derived from path matches.

use std::fmt;
use std::sync::Arc;

use http::header::ALLOW;
use http::{Method, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::core::Router;
use crate::context::Context;
use crate::error::{Result, RouterError};
use crate::middleware::{handler, Handler};

/// Builds the error returned instead of a 405/501 response in `throw` mode
pub type ErrorFactory = Arc<dyn Fn() -> RouterError + Send + Sync>;

/// Options for [`Router::allowed_methods`]
#[derive(Clone, Default)]
pub struct AllowedMethodsOptions {
    /// Return an error instead of setting 405/501
    pub throw: bool,
    pub not_implemented: Option<ErrorFactory>,
    pub method_not_allowed: Option<ErrorFactory>,
}

impl fmt::Debug for AllowedMethodsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedMethodsOptions")
            .field("throw", &self.throw)
            .field("not_implemented", &self.not_implemented.is_some())
            .field("method_not_allowed", &self.method_not_allowed.is_some())
            .finish()
    }
}

impl Router {
    /// Handler that shapes 405 / 501 / OPTIONS responses after the rest of
    /// the chain has run.
    ///
    /// It only acts when nothing downstream set a status (or set 404). The
    /// allowed set is the union of the methods of every path-matched layer
    /// recorded in `ctx.matched`, so register it alongside `routes()`.
    #[must_use]
    pub fn allowed_methods(&self, opts: AllowedMethodsOptions) -> Handler {
        let implemented = self.opts().methods.clone();
        handler(move |ctx, next| {
            next.run(ctx)?;
            respond(&implemented, &opts, ctx)
        })
    }
}

fn respond(implemented: &[Method], opts: &AllowedMethodsOptions, ctx: &mut Context) -> Result<()> {
    if !matches!(ctx.status, None | Some(StatusCode::NOT_FOUND)) {
        return Ok(());
    }

    let mut allowed: Vec<Method> = Vec::new();
    for layer in &ctx.matched {
        for method in layer.methods() {
            if !allowed.contains(method) {
                allowed.push(method.clone());
            }
        }
    }
    let allow = allowed
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    if !implemented.contains(&ctx.method) {
        debug!(method = %ctx.method, allow = %allow, "Method not implemented");
        if opts.throw {
            return Err(match &opts.not_implemented {
                Some(factory) => (**factory)(),
                None => RouterError::NotImplemented { allow: allowed },
            });
        }
        ctx.status = Some(StatusCode::NOT_IMPLEMENTED);
        return ctx.set_header(ALLOW, &allow);
    }

    if allowed.is_empty() {
        return Ok(());
    }

    if ctx.method == Method::OPTIONS {
        ctx.status = Some(StatusCode::OK);
        ctx.body = Some(Value::String(String::new()));
        return ctx.set_header(ALLOW, &allow);
    }

    let head_via_get = ctx.method == Method::HEAD && allowed.contains(&Method::GET);
    if !allowed.contains(&ctx.method) && !head_via_get {
        debug!(method = %ctx.method, allow = %allow, "Method not allowed");
        if opts.throw {
            return Err(match &opts.method_not_allowed {
                Some(factory) => (**factory)(),
                None => RouterError::MethodNotAllowed { allow: allowed },
            });
        }
        ctx.status = Some(StatusCode::METHOD_NOT_ALLOWED);
        return ctx.set_header(ALLOW, &allow);
    }

    Ok(())
}
