//! # Router Module
//!
//! Path matching, layer registration and request dispatch.
//!
//! ## Overview
//!
//! A [`Router`] owns an ordered stack of [`Layer`]s. Each layer pairs a
//! compiled [`PathMatcher`] with a method set, a handler stack and an
//! optional name. The router is responsible for:
//!
//! - Registering routes (verb shortcuts, `all`, `use_middleware`/`use_path`)
//! - Prefixing and mounting nested routers
//! - Matching a method and path against every layer in registration order
//! - Binding path parameters and composing the matched layers into one chain
//! - Deriving `Allow` / 405 / 501 responses via [`Router::allowed_methods`]
//!
//! ## Matching
//!
//! Matching is a single linear pass with no early exit. Every layer whose
//! path matches is recorded; those that also accept the method join the
//! execution chain. Among them the **last registered** is the matched route:
//! there is no specificity scoring beyond registration order.
//!
//! ## Example
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use layered_router::context::Context;
//! use layered_router::middleware::{compose, handler, run};
//! use layered_router::router::{AllowedMethodsOptions, Router};
//!
//! let mut router = Router::new();
//! router
//!     .get_named("user", "/users/:id", vec![handler(|ctx, next| {
//!         ctx.status = Some(StatusCode::OK);
//!         next.run(ctx)
//!     })])
//!     .unwrap();
//!
//! let app = compose(vec![
//!     router.routes(),
//!     router.allowed_methods(AllowedMethodsOptions::default()),
//! ]);
//!
//! let mut ctx = Context::new(Method::GET, "/users/7");
//! run(&app, &mut ctx).unwrap();
//! assert_eq!(ctx.param("id"), Some("7"));
//!
//! let mut ctx = Context::new(Method::POST, "/users/7");
//! run(&app, &mut ctx).unwrap();
//! assert_eq!(ctx.status, Some(StatusCode::METHOD_NOT_ALLOWED));
//! assert_eq!(ctx.header("allow"), Some("GET"));
//! ```

mod allowed;
mod core;
mod dispatch;
mod layer;
mod pattern;
#[cfg(test)]
mod tests;

pub use allowed::{AllowedMethodsOptions, ErrorFactory};
pub use self::core::{
    Host, MatchResult, Mountable, RouteOptions, RouteSummary, Router, RouterOptions,
    DEFAULT_METHODS,
};
pub use layer::{url_for, Captures, Layer, LayerOptions, ParamVec, MAX_INLINE_PARAMS};
pub use pattern::{PathMatcher, PathSpec, PatternOptions, UrlParams};
