use std::time::Instant;

use tracing::{info, info_span, warn};

use super::{handler, Handler};

/// Wrap the rest of the chain in a `request` span and log the outcome.
///
/// Register it first so the span covers routing and `allowed_methods()`.
#[must_use]
pub fn trace_requests() -> Handler {
    handler(|ctx, next| {
        let span = info_span!("request", method = %ctx.method, path = %ctx.path);
        let _guard = span.enter();
        let start = Instant::now();

        let result = next.run(ctx);

        let latency_us = start.elapsed().as_micros() as u64;
        let status = ctx.status.map_or(404, |s| s.as_u16());
        match &result {
            Ok(()) => info!(
                status,
                route = ?ctx.matched_route,
                route_name = ?ctx.matched_route_name,
                latency_us,
                "Request completed"
            ),
            Err(err) => warn!(
                error = %err,
                error_status = err.status().as_u16(),
                latency_us,
                "Request failed"
            ),
        }
        result
    })
}
