//! The `routes()` dispatch handler.

use std::slice;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::core::Router;
use super::layer::Layer;
use crate::context::Context;
use crate::error::Result;
use crate::middleware::{handler, Handler, Next};

impl Router {
    /// Handler that matches the request and runs the matched layers' chains.
    ///
    /// The router is snapshotted; later registrations on `self` are not seen
    /// by the returned handler. When no method-bearing layer matches, the
    /// handler falls through to `next` after recording the path matches in
    /// `ctx.matched` for `allowed_methods()`.
    #[must_use]
    pub fn routes(&self) -> Handler {
        let router = Arc::new(self.clone());
        handler(move |ctx, next| dispatch(&router, ctx, next))
    }

    /// Alias of [`routes`](Router::routes)
    #[must_use]
    pub fn middleware(&self) -> Handler {
        self.routes()
    }
}

fn dispatch(router: &Arc<Router>, ctx: &mut Context, next: Next<'_>) -> Result<()> {
    let opts = router.opts();

    if let Some(host) = &opts.host {
        if !host.matches(ctx.host.as_deref()) {
            debug!(host = ?ctx.host, expected = ?host, "Host not matched, skipping router");
            return next.run(ctx);
        }
    }

    let path = opts
        .router_path
        .clone()
        .or_else(|| ctx.router_path.clone())
        .unwrap_or_else(|| ctx.path.clone());

    let matched = router.match_route(&path, &ctx.method);
    ctx.matched.extend(matched.path.iter().cloned());
    ctx.router = Some(Arc::clone(router));

    let most_specific = match matched.most_specific() {
        Some(layer) if matched.route => layer,
        _ => {
            warn!(
                method = %ctx.method,
                path = %path,
                path_matches = matched.path.len(),
                "No route matched"
            );
            return next.run(ctx);
        }
    };

    ctx.matched_route = Some(most_specific.path().to_string());
    // An anonymous route keeps the name recorded by an earlier router.
    if let Some(name) = most_specific.name() {
        ctx.matched_route_name = Some(name.to_string());
    }

    info!(
        method = %ctx.method,
        path = %path,
        route = %most_specific.path(),
        route_name = ?most_specific.name(),
        layers = matched.path_and_method.len(),
        exclusive = opts.exclusive,
        "Route matched"
    );

    let layers = if opts.exclusive {
        slice::from_ref(most_specific)
    } else {
        matched.path_and_method.as_slice()
    };

    let path: Arc<str> = Arc::from(path);
    let mut chain = Vec::new();
    for layer in layers {
        chain.push(bind_step(Arc::clone(layer), Arc::clone(&path)));
        chain.extend(layer.chain(router.params()));
    }

    Next::chain(&chain, &next).run(ctx)
}

/// Bind the layer's captures and params onto the context before its handlers run.
fn bind_step(layer: Arc<Layer>, path: Arc<str>) -> Handler {
    handler(move |ctx, next| {
        let captures = layer.captures(&path, &ctx.captures);
        ctx.params = layer.params(&path, &captures, &ctx.params)?;
        ctx.captures = captures;
        ctx.route_name = layer.name().map(str::to_string);
        next.run(ctx)
    })
}
