//! Router core: the layer stack, registration surface and the match pass.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use http::{Method, StatusCode};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::layer::{append_query, Layer, LayerOptions};
use super::pattern::{PathSpec, UrlParams};
use crate::error::{Result, RouterError};
use crate::middleware::{handler, Handler, ParamHandler};

/// Methods a router implements unless configured otherwise.
///
/// Requests using any other method get a 501 from `allowed_methods()`.
pub const DEFAULT_METHODS: [Method; 7] = [
    Method::HEAD,
    Method::OPTIONS,
    Method::GET,
    Method::PUT,
    Method::PATCH,
    Method::POST,
    Method::DELETE,
];

/// Pattern for method-agnostic middleware registered without a path
const ANY_SEGMENT: &str = "([^/]*)";

/// Host restriction for a router
#[derive(Debug, Clone)]
pub enum Host {
    /// Exact host, compared case-insensitively
    Exact(String),
    Pattern(Regex),
}

impl Host {
    /// A router with a host restriction never matches requests without a host.
    #[must_use]
    pub fn matches(&self, host: Option<&str>) -> bool {
        match (self, host) {
            (_, None) => false,
            (Host::Exact(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            (Host::Pattern(regex), Some(actual)) => regex.is_match(actual),
        }
    }
}

/// Router-wide configuration
#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Prefix applied to every layer; no trailing slash
    pub prefix: Option<String>,
    /// Default trailing-slash strictness for new routes
    pub strict: bool,
    /// Default case sensitivity for new routes
    pub sensitive: bool,
    /// Only run the most specific matched layer
    pub exclusive: bool,
    /// Methods this router implements; also what `all()` registers
    pub methods: Vec<Method>,
    pub host: Option<Host>,
    /// Path to match instead of the request path
    pub router_path: Option<String>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            prefix: None,
            strict: false,
            sensitive: false,
            exclusive: false,
            methods: DEFAULT_METHODS.to_vec(),
            host: None,
            router_path: None,
        }
    }
}

/// Per-route overrides of the router defaults
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    pub name: Option<String>,
    pub end: Option<bool>,
    pub strict: Option<bool>,
    pub sensitive: Option<bool>,
    pub ignore_captures: Option<bool>,
}

impl RouteOptions {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// Result of one match pass. Built fresh per call.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Layers whose path matched, in registration order
    pub path: Vec<Arc<Layer>>,
    /// Layers whose path and method matched; the last one is the most specific
    pub path_and_method: Vec<Arc<Layer>>,
    /// `true` when at least one method-bearing layer matched path and method
    pub route: bool,
}

impl MatchResult {
    #[must_use]
    pub fn most_specific(&self) -> Option<&Arc<Layer>> {
        self.path_and_method.last()
    }
}

/// Something `use_middleware` / `use_path` can mount
#[derive(Clone)]
pub enum Mountable {
    Handler(Handler),
    /// A router whose layers are copied into the mounting router
    Router(Router),
}

impl From<Handler> for Mountable {
    fn from(handler: Handler) -> Self {
        Mountable::Handler(handler)
    }
}

impl From<Router> for Mountable {
    fn from(router: Router) -> Self {
        Mountable::Router(router)
    }
}

impl From<&Router> for Mountable {
    fn from(router: &Router) -> Self {
        Mountable::Router(router.clone())
    }
}

/// Serializable view of one layer, for introspection and the CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub methods: Vec<String>,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub handlers: usize,
}

/// Ordered collection of layers plus router-wide param validators.
///
/// Registration order is the only specificity mechanism: layers are tested
/// in insertion order and, among the ones that match, the last is treated
/// as the matched route.
///
/// Mutating a router after handing out its [`routes()`](Router::routes)
/// handler does not affect that handler; it runs against a snapshot.
#[derive(Clone, Default)]
pub struct Router {
    opts: RouterOptions,
    stack: Vec<Arc<Layer>>,
    params: HashMap<String, ParamHandler>,
}

macro_rules! verb_methods {
    ($($verb:ident, $named:ident => $method:expr;)*) => {
        $(
            #[doc = concat!("Register a `", stringify!($verb), "` route.")]
            pub fn $verb(
                &mut self,
                path: impl Into<PathSpec>,
                middleware: Vec<Handler>,
            ) -> Result<Arc<Layer>> {
                self.register(path, &[$method], middleware, RouteOptions::default())
            }

            #[doc = concat!("Register a named `", stringify!($verb), "` route.")]
            pub fn $named(
                &mut self,
                name: &str,
                path: impl Into<PathSpec>,
                middleware: Vec<Handler>,
            ) -> Result<Arc<Layer>> {
                self.register(path, &[$method], middleware, RouteOptions::named(name))
            }
        )*
    };
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router; a trailing `/` on the prefix is dropped.
    #[must_use]
    pub fn with_options(mut opts: RouterOptions) -> Self {
        opts.prefix = opts.prefix.as_deref().and_then(normalize_prefix);
        Self {
            opts,
            stack: Vec::new(),
            params: HashMap::new(),
        }
    }

    /// Register one layer for `path` and `methods`.
    ///
    /// The router's `strict`/`sensitive` defaults apply unless `opts`
    /// overrides them, and the current router prefix is applied.
    ///
    /// # Errors
    ///
    /// `PatternCompile` when the path is malformed.
    pub fn register(
        &mut self,
        path: impl Into<PathSpec>,
        methods: &[Method],
        middleware: Vec<Handler>,
        opts: RouteOptions,
    ) -> Result<Arc<Layer>> {
        let layer_opts = LayerOptions {
            name: opts.name,
            end: opts.end.unwrap_or(true),
            strict: opts.strict.unwrap_or(self.opts.strict),
            sensitive: opts.sensitive.unwrap_or(self.opts.sensitive),
            ignore_captures: opts.ignore_captures.unwrap_or(false),
            prefix: self.opts.prefix.clone(),
        };
        let layer = Arc::new(Layer::new(path, methods, middleware, layer_opts)?);

        info!(
            path = %layer.path(),
            methods = ?layer.methods(),
            name = ?layer.name(),
            position = self.stack.len(),
            "Route registered"
        );

        self.stack.push(Arc::clone(&layer));
        Ok(layer)
    }

    /// Register one layer per path, all sharing `methods`, handlers and options.
    pub fn register_paths<P>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        methods: &[Method],
        middleware: Vec<Handler>,
        opts: RouteOptions,
    ) -> Result<&mut Self>
    where
        P: Into<PathSpec>,
    {
        for path in paths {
            self.register(path, methods, middleware.clone(), opts.clone())?;
        }
        Ok(self)
    }

    verb_methods! {
        get, get_named => Method::GET;
        post, post_named => Method::POST;
        put, put_named => Method::PUT;
        patch, patch_named => Method::PATCH;
        delete, delete_named => Method::DELETE;
        del, del_named => Method::DELETE;
        head, head_named => Method::HEAD;
        options, options_named => Method::OPTIONS;
        trace, trace_named => Method::TRACE;
        connect, connect_named => Method::CONNECT;
    }

    /// Register a route for every method this router implements.
    pub fn all(&mut self, path: impl Into<PathSpec>, middleware: Vec<Handler>) -> Result<Arc<Layer>> {
        let methods = self.opts.methods.clone();
        self.register(path, &methods, middleware, RouteOptions::default())
    }

    pub fn all_named(
        &mut self,
        name: &str,
        path: impl Into<PathSpec>,
        middleware: Vec<Handler>,
    ) -> Result<Arc<Layer>> {
        let methods = self.opts.methods.clone();
        self.register(path, &methods, middleware, RouteOptions::named(name))
    }

    /// Mount middleware or routers on every path.
    ///
    /// Handlers become method-agnostic prefix layers that keep the captures
    /// of earlier layers, unless the router prefix itself has parameters.
    pub fn use_middleware(&mut self, items: Vec<Mountable>) -> Result<&mut Self> {
        self.mount(None, items)?;
        Ok(self)
    }

    /// Mount middleware or routers under each of `paths`.
    pub fn use_path(&mut self, paths: &[&str], items: Vec<Mountable>) -> Result<&mut Self> {
        for path in paths {
            self.mount(Some(*path), items.clone())?;
        }
        Ok(self)
    }

    fn mount(&mut self, path: Option<&str>, items: Vec<Mountable>) -> Result<()> {
        for item in items {
            match item {
                Mountable::Handler(middleware) => {
                    let ignore_captures = match path {
                        Some(_) => false,
                        None => !self.prefix_has_params(),
                    };
                    self.register(
                        path.unwrap_or(ANY_SEGMENT),
                        &[],
                        vec![middleware],
                        RouteOptions {
                            end: Some(false),
                            ignore_captures: Some(ignore_captures),
                            ..RouteOptions::default()
                        },
                    )?;
                }
                Mountable::Router(child) => self.mount_router(path, child)?,
            }
        }
        Ok(())
    }

    fn mount_router(&mut self, path: Option<&str>, child: Router) -> Result<()> {
        debug!(
            mount_path = ?path,
            prefix = ?self.opts.prefix,
            layers = child.stack.len(),
            "Mounting router"
        );

        for layer in &child.stack {
            let mut copy = Layer::clone(layer);
            copy.nest(path)?;
            if let Some(prefix) = self.opts.prefix.as_deref() {
                copy.set_prefix(prefix)?;
            }
            // Names this router already validates keep its validator; the
            // child's one stays attached to its own layers and runs first.
            for (name, validator) in &child.params {
                if self.params.contains_key(name) {
                    copy.param(name, Arc::clone(validator));
                }
            }
            self.stack.push(Arc::new(copy));
        }

        for (name, validator) in child.params {
            self.params.entry(name).or_insert(validator);
        }
        Ok(())
    }

    /// Set the router prefix and re-apply it to every existing layer.
    ///
    /// A trailing `/` is dropped; an empty prefix removes it.
    pub fn prefix(&mut self, prefix: &str) -> Result<&mut Self> {
        let prefix = normalize_prefix(prefix);
        for layer in &mut self.stack {
            Arc::make_mut(layer).set_prefix(prefix.as_deref().unwrap_or(""))?;
        }
        debug!(prefix = ?prefix, layers = self.stack.len(), "Router prefix set");
        self.opts.prefix = prefix;
        Ok(self)
    }

    /// Register a validator for parameter `name`.
    ///
    /// Applies to current and future layers that declare the parameter; it
    /// runs after binding and before the layer's handlers. Registering a
    /// second validator for the same name keeps the first one on the layers
    /// that already exist, so those run both in registration order while
    /// later layers only see the newest.
    pub fn param(&mut self, name: &str, validator: ParamHandler) -> &mut Self {
        if let Some(previous) = self.params.insert(name.to_string(), validator) {
            for layer in &mut self.stack {
                if layer.matcher().key_index(name).is_some() {
                    Arc::make_mut(layer).param(name, Arc::clone(&previous));
                }
            }
        }
        self
    }

    /// First layer registered under `name`
    ///
    /// # Errors
    ///
    /// `UnknownRoute` when no layer carries that name.
    pub fn route(&self, name: &str) -> Result<&Arc<Layer>> {
        self.stack
            .iter()
            .find(|layer| layer.name() == Some(name))
            .ok_or_else(|| RouterError::UnknownRoute {
                name: name.to_string(),
            })
    }

    /// Generate a URL for the named route.
    ///
    /// ```rust
    /// use layered_router::router::Router;
    ///
    /// let mut router = Router::new();
    /// router.get_named("user", "/users/:id", vec![]).unwrap();
    /// assert_eq!(router.url("user", [("id", 5)]).unwrap(), "/users/5");
    /// assert!(router.url("nope", [("id", 5)]).is_err());
    /// ```
    pub fn url(&self, name: &str, params: impl Into<UrlParams>) -> Result<String> {
        self.route(name)?.url(params)
    }

    /// Generate a URL for the named route with a form-encoded query string.
    pub fn url_with_query(
        &self,
        name: &str,
        params: impl Into<UrlParams>,
        query: &[(&str, &str)],
    ) -> Result<String> {
        Ok(append_query(self.url(name, params)?, query))
    }

    /// Redirect `source` to `destination` with a 301.
    ///
    /// Either side may be a path, an absolute URL or a route name.
    pub fn redirect(&mut self, source: &str, destination: &str) -> Result<Arc<Layer>> {
        self.redirect_with_status(source, destination, StatusCode::MOVED_PERMANENTLY)
    }

    pub fn redirect_with_status(
        &mut self,
        source: &str,
        destination: &str,
        status: StatusCode,
    ) -> Result<Arc<Layer>> {
        let source = self.resolve_location(source)?;
        let destination = self.resolve_location(destination)?;

        let redirect = handler(move |ctx, _next| {
            ctx.redirect(&destination)?;
            ctx.status = Some(status);
            Ok(())
        });
        self.all(source, vec![redirect])
    }

    fn resolve_location(&self, location: &str) -> Result<String> {
        if location.starts_with('/') || is_absolute_url(location) {
            return Ok(location.to_string());
        }
        self.url(location, UrlParams::Empty)
    }

    /// Test every layer against `path` and `method`, in registration order.
    ///
    /// There is no early exit: all matching layers are collected.
    #[must_use]
    pub fn match_route(&self, path: &str, method: &Method) -> MatchResult {
        debug!(
            method = %method,
            path = %path,
            layers = self.stack.len(),
            "Route match attempt"
        );

        let mut matched = MatchResult::default();
        for layer in &self.stack {
            if !layer.matches(path) {
                continue;
            }
            matched.path.push(Arc::clone(layer));
            if layer.allows(method) {
                matched.path_and_method.push(Arc::clone(layer));
                if !layer.is_method_agnostic() {
                    matched.route = true;
                }
            }
        }
        matched
    }

    /// Print all registered layers to stdout
    pub fn dump_routes(&self) {
        if let Err(err) = self.dump_routes_to(&mut io::stdout().lock()) {
            warn!(error = %err, "Failed to write route table");
        }
    }

    /// Write one `[routes]` header line and one `[route]` line per layer.
    pub fn dump_routes_to(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(
            out,
            "[routes] prefix={} count={}",
            self.opts.prefix.as_deref().unwrap_or(""),
            self.stack.len()
        )?;
        for summary in self.routes_summary() {
            let methods = if summary.methods.is_empty() {
                "*".to_string()
            } else {
                summary.methods.join(",")
            };
            writeln!(
                out,
                "[route] {methods} {} -> {}",
                summary.path,
                summary.name.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }

    #[must_use]
    pub fn routes_summary(&self) -> Vec<RouteSummary> {
        self.stack
            .iter()
            .map(|layer| RouteSummary {
                methods: layer.methods().iter().map(ToString::to_string).collect(),
                path: layer.path().to_string(),
                name: layer.name().map(str::to_string),
                handlers: layer.handler_count(),
            })
            .collect()
    }

    #[must_use]
    pub fn opts(&self) -> &RouterOptions {
        &self.opts
    }

    /// Layers in registration order
    #[must_use]
    pub fn stack(&self) -> &[Arc<Layer>] {
        &self.stack
    }

    /// Router-wide param validators
    #[must_use]
    pub fn params(&self) -> &HashMap<String, ParamHandler> {
        &self.params
    }

    fn prefix_has_params(&self) -> bool {
        self.opts.prefix.as_deref().is_some_and(|p| p.contains(':'))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params: Vec<&String> = self.params.keys().collect();
        params.sort();
        f.debug_struct("Router")
            .field("opts", &self.opts)
            .field("stack", &self.stack)
            .field("params", &params)
            .finish()
    }
}

fn normalize_prefix(prefix: &str) -> Option<String> {
    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    (!prefix.is_empty()).then(|| prefix.to_string())
}

fn is_absolute_url(location: &str) -> bool {
    location.contains("://") && url::Url::parse(location).is_ok()
}
