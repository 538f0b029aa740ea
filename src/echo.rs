use http::StatusCode;
use serde_json::json;

use crate::middleware::{handler, Handler};

/// Handler that echoes the routing state back as the response body.
///
/// Backs the routes of a configured route table so a table can be exercised
/// without application code.
pub fn echo_handler(handler_name: impl Into<String>) -> Handler {
    let handler_name = handler_name.into();
    handler(move |ctx, next| {
        ctx.status = Some(StatusCode::OK);
        ctx.body = Some(json!({
            "handler": handler_name,
            "method": ctx.method.as_str(),
            "path": ctx.path,
            "route": ctx.matched_route,
            "route_name": ctx.matched_route_name,
            "params": ctx.params_map(),
        }));
        next.run(ctx)
    })
}
