#![allow(dead_code)]

use http::{Method, StatusCode};
use layered_router::context::Context;
use layered_router::middleware::{compose, handler, run, Handler};
use layered_router::router::{AllowedMethodsOptions, Router};
use layered_router::RouterError;
use serde_json::{json, Value};

/// Handler that sets `status` and continues.
pub fn respond(status: StatusCode) -> Handler {
    handler(move |ctx, next| {
        ctx.status = Some(status);
        next.run(ctx)
    })
}

/// Handler that appends `tag` to a JSON array in the body and continues.
pub fn trail(tag: &'static str) -> Handler {
    handler(move |ctx, next| {
        let mut items = ctx.body.take().unwrap_or_else(|| json!([]));
        if let Some(array) = items.as_array_mut() {
            array.push(json!(tag));
        }
        ctx.body = Some(items);
        next.run(ctx)
    })
}

pub fn trail_of(ctx: &Context) -> Vec<String> {
    ctx.body
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// `routes()` followed by `allowed_methods()`, the usual application setup.
pub fn app(router: &Router) -> Handler {
    app_with(router, AllowedMethodsOptions::default())
}

pub fn app_with(router: &Router, opts: AllowedMethodsOptions) -> Handler {
    compose(vec![router.routes(), router.allowed_methods(opts)])
}

pub fn request(app: &Handler, method: Method, path: &str) -> Context {
    let mut ctx = Context::new(method, path);
    run(app, &mut ctx).unwrap();
    ctx
}

pub fn try_request(app: &Handler, method: Method, path: &str) -> (Context, Result<(), RouterError>) {
    let mut ctx = Context::new(method, path);
    let result = run(app, &mut ctx);
    (ctx, result)
}
