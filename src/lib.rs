//! # layered-router
//!
//! An ordered, layer-based request router. Routes are registered as
//! **layers** (compiled path pattern + method set + handler stack) and every
//! request is matched against all of them in registration order. The
//! matched layers are composed into a single middleware chain.
//!
//! ## Overview
//!
//! - Express-style path patterns: `/users/:id`, `/files/:path*`,
//!   `/posts/:id(\\d+)`, `{/:slug}?`, or a pre-built [`regex::Regex`]
//! - Verb shortcuts, `all`, named routes and reverse URL generation
//! - Method-agnostic middleware and nested routers via `use_middleware` /
//!   `use_path`, with router prefixes composed innermost first
//! - Router-wide and per-layer parameter validators
//! - `allowed_methods()` for `Allow` headers and 405 / 501 / `OPTIONS`
//!
//! The router does no HTTP parsing and owns no sockets: it consumes a
//! [`Context`](context::Context) that the host application fills in and
//! writes status, headers and params back into it.
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern compiler, layers, registration, match and dispatch
//! - **[`middleware`]** - Handler types and the `compose` primitive
//! - **[`context`]** - Per-request state read and written by the router
//! - **[`error`]** - `RouterError` and its HTTP status mapping
//! - **[`config`]** - YAML/JSON route tables with environment overrides
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`cli`]** - The `layered-router` command line
//!
//! ## Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant App
//!     participant Allowed as allowed_methods()
//!     participant Routes as routes()
//!     participant Router
//!     participant Layer as Matched layers
//!
//!     App->>Allowed: run(ctx)
//!     Allowed->>Routes: next.run(ctx)
//!     Routes->>Router: match_route(path, method)
//!     Router-->>Routes: MatchResult { path, path_and_method, route }
//!     Routes->>Routes: ctx.matched += path
//!     alt route
//!         Routes->>Layer: bind params, validators, handlers
//!         Layer-->>Routes: status set
//!     else no route
//!         Routes-->>Allowed: next (falls through)
//!     end
//!     Allowed->>Allowed: status unset? derive 405 / 501 / OPTIONS
//!     Allowed-->>App: ctx
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::{Method, StatusCode};
//! use layered_router::context::Context;
//! use layered_router::middleware::{compose, handler, param_handler, run};
//! use layered_router::router::{AllowedMethodsOptions, Router, RouterOptions};
//!
//! let mut router = Router::with_options(RouterOptions {
//!     prefix: Some("/api".into()),
//!     ..RouterOptions::default()
//! });
//! router.param("id", param_handler(|id, ctx, next| {
//!     if id.parse::<u64>().is_ok() {
//!         next.run(ctx)
//!     } else {
//!         ctx.status = Some(StatusCode::BAD_REQUEST);
//!         Ok(())
//!     }
//! }));
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
//! let mut ctx = Context::new(Method::GET, "/api/users/42");
//! run(&app, &mut ctx).unwrap();
//! assert_eq!(ctx.status, Some(StatusCode::OK));
//! assert_eq!(ctx.param("id"), Some("42"));
//!
//! let mut ctx = Context::new(Method::GET, "/api/users/abc");
//! run(&app, &mut ctx).unwrap();
//! assert_eq!(ctx.status, Some(StatusCode::BAD_REQUEST));
//!
//! assert_eq!(router.url("user", [("id", 7)]).unwrap(), "/api/users/7");
//! ```

pub mod cli;
pub mod config;
pub mod context;
pub mod echo;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod router;

pub use context::Context;
pub use error::{Result, RouterError};
pub use router::{Layer, Router, RouterOptions};
