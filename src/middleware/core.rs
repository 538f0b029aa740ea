use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;

/// A middleware function: receives the request context and the continuation.
///
/// Calling `next.run(ctx)` continues the chain; returning without calling it
/// short-circuits everything downstream.
pub type Handler = Arc<dyn Fn(&mut Context, Next<'_>) -> Result<()> + Send + Sync>;

/// A parameter validator/loader, called with the decoded parameter value.
pub type ParamHandler = Arc<dyn Fn(&str, &mut Context, Next<'_>) -> Result<()> + Send + Sync>;

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context, Next<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Box a closure as a [`ParamHandler`].
pub fn param_handler<F>(f: F) -> ParamHandler
where
    F: Fn(&str, &mut Context, Next<'_>) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Continuation handed to every handler in a composed chain.
///
/// Holds the handlers still to run plus the continuation of the enclosing
/// chain, so nested compositions resume their caller once exhausted.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    handlers: &'a [Handler],
    outer: Option<&'a Next<'a>>,
}

impl<'a> Next<'a> {
    /// Terminal continuation: running it does nothing.
    #[must_use]
    pub fn end() -> Next<'static> {
        Next {
            handlers: &[],
            outer: None,
        }
    }

    /// Continuation that runs `handlers` in order, then `outer`.
    #[must_use]
    pub fn chain(handlers: &'a [Handler], outer: &'a Next<'a>) -> Self {
        Next {
            handlers,
            outer: Some(outer),
        }
    }

    /// Invoke the next handler, or the enclosing continuation once this chain is exhausted.
    pub fn run(self, ctx: &mut Context) -> Result<()> {
        match self.handlers.split_first() {
            Some((head, rest)) => (**head)(
                ctx,
                Next {
                    handlers: rest,
                    outer: self.outer,
                },
            ),
            None => match self.outer {
                Some(outer) => (*outer).run(ctx),
                None => Ok(()),
            },
        }
    }
}

/// Compose an ordered list of handlers into a single handler.
///
/// Errors from any handler propagate to the caller of the composed handler.
#[must_use]
pub fn compose(handlers: Vec<Handler>) -> Handler {
    handler(move |ctx, next| Next::chain(&handlers, &next).run(ctx))
}

/// Run a top-level handler against a context with a terminal continuation.
pub fn run(handler: &Handler, ctx: &mut Context) -> Result<()> {
    (**handler)(ctx, Next::end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use http::{Method, StatusCode};
    use serde_json::json;

    fn push(tag: &'static str) -> Handler {
        handler(move |ctx, next| {
            let mut trail = ctx.body.take().unwrap_or_else(|| json!([]));
            if let Some(items) = trail.as_array_mut() {
                items.push(json!(tag));
            }
            ctx.body = Some(trail);
            next.run(ctx)
        })
    }

    #[test]
    fn test_compose_runs_in_order() {
        let chain = compose(vec![push("a"), push("b"), push("c")]);
        let mut ctx = Context::new(Method::GET, "/");
        run(&chain, &mut ctx).unwrap();
        assert_eq!(ctx.body, Some(json!(["a", "b", "c"])));
    }

    #[test]
    fn test_short_circuit_stops_chain() {
        let stop = handler(|ctx, _next| {
            ctx.status = Some(StatusCode::UNAUTHORIZED);
            Ok(())
        });
        let chain = compose(vec![push("a"), stop, push("never")]);
        let mut ctx = Context::new(Method::GET, "/");
        run(&chain, &mut ctx).unwrap();
        assert_eq!(ctx.body, Some(json!(["a"])));
        assert_eq!(ctx.status, Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_nested_compose_resumes_outer() {
        let inner = compose(vec![push("inner")]);
        let chain = compose(vec![push("before"), inner, push("after")]);
        let mut ctx = Context::new(Method::GET, "/");
        run(&chain, &mut ctx).unwrap();
        assert_eq!(ctx.body, Some(json!(["before", "inner", "after"])));
    }

    #[test]
    fn test_errors_propagate() {
        let fail = handler(|_ctx, _next| Err(RouterError::handler("nope")));
        let chain = compose(vec![push("a"), fail, push("b")]);
        let mut ctx = Context::new(Method::GET, "/");
        let err = run(&chain, &mut ctx).unwrap_err();
        assert!(matches!(err, RouterError::Handler(_)));
        assert_eq!(ctx.body, Some(json!(["a"])));
    }
}
