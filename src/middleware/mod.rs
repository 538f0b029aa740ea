//! # Middleware Module
//!
//! Handler types and the composition primitive the router builds its
//! dispatch chains with, plus a couple of general-purpose middlewares.
//!
//! A [`Handler`] receives the [`Context`](crate::context::Context) and a
//! [`Next`] continuation. Handlers run in order; each decides whether to
//! continue (`next.run(ctx)`), short-circuit (return without calling it),
//! or do work after the rest of the chain has finished (call `next` first,
//! then inspect the context, which is how `allowed_methods()` works).

mod core;
mod metrics;
mod tracing;

pub use self::core::{compose, handler, param_handler, run, Handler, Next, ParamHandler};
pub use metrics::MetricsMiddleware;
pub use self::tracing::trace_requests;
