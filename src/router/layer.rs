//! A single registered route: compiled path, method set and handler stack.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::debug;

use super::pattern::{PathMatcher, PathSpec, PatternOptions, UrlParams};
use crate::error::{Result, RouterError};
use crate::middleware::{handler, Handler, ParamHandler};

/// Maximum number of path params/captures before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Decoded path parameters, in binding order.
///
/// Param names use `Arc<str>` so rebinding the same name per request is an
/// atomic increment rather than a string copy.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Raw capture groups, in pattern order.
pub type Captures = SmallVec<[String; MAX_INLINE_PARAMS]>;

/// Options a layer is compiled with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOptions {
    /// Route name for reverse lookup
    pub name: Option<String>,
    /// Exact match when `true`, segment-prefix match when `false`
    pub end: bool,
    pub strict: bool,
    pub sensitive: bool,
    /// Keep captures bound by earlier layers instead of extracting new ones
    pub ignore_captures: bool,
    /// Prefix of the owning router at construction time
    pub prefix: Option<String>,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            name: None,
            end: true,
            strict: false,
            sensitive: false,
            ignore_captures: false,
            prefix: None,
        }
    }
}

impl LayerOptions {
    fn pattern(&self) -> PatternOptions {
        PatternOptions {
            end: self.end,
            strict: self.strict,
            sensitive: self.sensitive,
        }
    }
}

/// One registered route.
///
/// The path is kept as given; prefixes are tracked separately so the
/// compiled matcher can be rebuilt whenever the owning router's prefix
/// changes or the layer is copied into a parent router.
#[derive(Clone)]
pub struct Layer {
    spec: PathSpec,
    /// Prefixes from nested mounting, innermost first
    mount_prefixes: Vec<String>,
    /// Prefix of the router that currently owns this layer; applied last
    router_prefix: Option<String>,
    path: String,
    matcher: PathMatcher,
    opts: LayerOptions,
    methods: Vec<Method>,
    stack: Vec<Handler>,
    param_handlers: Vec<(String, ParamHandler)>,
}

impl Layer {
    /// Compile a new layer.
    ///
    /// # Errors
    ///
    /// `PatternCompile` when the path (with prefix) is malformed.
    pub fn new(
        path: impl Into<PathSpec>,
        methods: &[Method],
        stack: Vec<Handler>,
        opts: LayerOptions,
    ) -> Result<Self> {
        let spec = path.into();
        let router_prefix = opts.prefix.clone().filter(|p| !p.is_empty());

        let mut unique: Vec<Method> = Vec::with_capacity(methods.len());
        for method in methods {
            if !unique.contains(method) {
                unique.push(method.clone());
            }
        }

        let (path, matcher) = build_matcher(&spec, &[], router_prefix.as_deref(), &opts)?;

        debug!(
            path = %path,
            methods = ?unique,
            name = ?opts.name,
            handlers = stack.len(),
            "Layer compiled"
        );

        Ok(Self {
            spec,
            mount_prefixes: Vec::new(),
            router_prefix,
            path,
            matcher,
            opts,
            methods: unique,
            stack,
            param_handlers: Vec::new(),
        })
    }

    /// Test a request path against this layer
    #[inline]
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.matcher.test(path)
    }

    /// Whether a request with `method` may run this layer once the path matched.
    ///
    /// Method-agnostic layers accept everything; `HEAD` is served by `GET` layers.
    #[inline]
    #[must_use]
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.is_empty()
            || self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    /// Capture groups for `path`, or `prior` unchanged when this layer ignores captures.
    #[must_use]
    pub fn captures(&self, path: &str, prior: &Captures) -> Captures {
        if self.opts.ignore_captures {
            return prior.clone();
        }
        self.matcher
            .captures(path)
            .map(Captures::from_vec)
            .unwrap_or_default()
    }

    /// Merge `prior` with the named, percent-decoded values from `captures`.
    ///
    /// Empty captures (optional parameters that did not match) are skipped.
    ///
    /// # Errors
    ///
    /// `ParamDecode` when a capture holds a malformed escape or invalid UTF-8.
    pub fn params(&self, _path: &str, captures: &Captures, prior: &ParamVec) -> Result<ParamVec> {
        let mut params = prior.clone();
        for (key, capture) in self.matcher.keys().iter().zip(captures.iter()) {
            let Some(name) = key else { continue };
            if capture.is_empty() {
                continue;
            }
            let value = decode_param(name, capture)?;
            match params.iter_mut().find(|(k, _)| k.as_ref() == name) {
                Some(slot) => slot.1 = value,
                None => params.push((Arc::from(name.as_str()), value)),
            }
        }
        Ok(params)
    }

    /// Set the owning router's prefix and recompile.
    ///
    /// Setting the same prefix again is a no-op; a different prefix replaces
    /// the previous one rather than stacking on top of it.
    pub fn set_prefix(&mut self, prefix: &str) -> Result<&mut Self> {
        let prefix = Some(prefix.to_string()).filter(|p| !p.is_empty());
        if prefix == self.router_prefix {
            return Ok(self);
        }
        let (path, matcher) =
            build_matcher(&self.spec, &self.mount_prefixes, prefix.as_deref(), &self.opts)?;
        self.router_prefix = prefix;
        self.path = path;
        self.matcher = matcher;
        Ok(self)
    }

    /// Prepare a copy of this layer for a parent router mounting it at `mount_path`.
    ///
    /// The current router prefix becomes part of the fixed mount chain, then
    /// `mount_path` is applied on top; the parent sets its own prefix afterwards.
    pub(crate) fn nest(&mut self, mount_path: Option<&str>) -> Result<&mut Self> {
        let mut mount_prefixes = self.mount_prefixes.clone();
        mount_prefixes.extend(self.router_prefix.clone());
        mount_prefixes.extend(
            mount_path
                .filter(|p| !p.is_empty() && *p != "/")
                .map(str::to_string),
        );
        let (path, matcher) = build_matcher(&self.spec, &mount_prefixes, None, &self.opts)?;
        self.mount_prefixes = mount_prefixes;
        self.router_prefix = None;
        self.path = path;
        self.matcher = matcher;
        Ok(self)
    }

    /// Attach a validator for `name`; no-op when the path has no such parameter.
    pub fn param(&mut self, name: &str, validator: ParamHandler) -> &mut Self {
        if self.matcher.key_index(name).is_some() {
            self.param_handlers.push((name.to_string(), validator));
        }
        self
    }

    /// The handlers to run after binding: validators ordered by parameter
    /// position, then the layer's own stack.
    ///
    /// For one parameter, validators attached to this layer run in attach
    /// order, followed by the owning router's current validator from
    /// `router_params`. The router's map is read here so that validators
    /// registered after this layer still apply.
    #[must_use]
    pub fn chain(&self, router_params: &HashMap<String, ParamHandler>) -> Vec<Handler> {
        let mut chain = Vec::with_capacity(self.stack.len() + self.param_handlers.len());
        let names: Vec<&str> = self.matcher.param_names().collect();

        for (index, name) in names.iter().enumerate() {
            if names[..index].contains(name) {
                continue;
            }
            for (_, validator) in self.param_handlers.iter().filter(|(n, _)| n == name) {
                chain.push(param_step(name, Arc::clone(validator)));
            }
            if let Some(validator) = router_params.get(*name) {
                chain.push(param_step(name, Arc::clone(validator)));
            }
        }

        chain.extend(self.stack.iter().cloned());
        chain
    }

    /// Generate a URL for this route.
    ///
    /// # Errors
    ///
    /// `MissingParam` / `InvalidParam` when values do not fit the path,
    /// `NotReversible` for regex routes.
    pub fn url(&self, params: impl Into<UrlParams>) -> Result<String> {
        self.matcher.reverse(&params.into())
    }

    /// Generate a URL and append `query` as `application/x-www-form-urlencoded`.
    pub fn url_with_query(&self, params: impl Into<UrlParams>, query: &[(&str, &str)]) -> Result<String> {
        Ok(append_query(self.url(params)?, query))
    }

    /// Full path including prefixes
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.opts.name.as_deref()
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn is_method_agnostic(&self) -> bool {
        self.methods.is_empty()
    }

    #[must_use]
    pub fn opts(&self) -> &LayerOptions {
        &self.opts
    }

    #[must_use]
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.matcher.param_names()
    }

    /// Number of handlers registered directly on this layer
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.stack.len()
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("name", &self.opts.name)
            .field("handlers", &self.stack.len())
            .field("param_handlers", &self.param_handlers.len())
            .finish()
    }
}

/// Reverse a raw path pattern without registering it.
///
/// ```rust
/// use layered_router::router::url_for;
///
/// let url = url_for("/users/:id", [("id", 3)]).unwrap();
/// assert_eq!(url, "/users/3");
/// ```
pub fn url_for(path: &str, params: impl Into<UrlParams>) -> Result<String> {
    PathMatcher::compile(path, PatternOptions::default())?.reverse(&params.into())
}

pub(crate) fn append_query(mut url: String, query: &[(&str, &str)]) -> String {
    if query.is_empty() {
        return url;
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(query)
        .finish();
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str(&encoded);
    url
}

/// Apply `mount_prefixes` (innermost first) and then `router_prefix` to the registered path.
fn build_matcher(
    spec: &PathSpec,
    mount_prefixes: &[String],
    router_prefix: Option<&str>,
    opts: &LayerOptions,
) -> Result<(String, PathMatcher)> {
    let prefixes = mount_prefixes.iter().map(String::as_str).chain(router_prefix);
    match spec {
        PathSpec::Path(original) => {
            let full = prefixes.fold(original.clone(), |path, prefix| {
                if path == "/" && !opts.strict {
                    prefix.to_string()
                } else {
                    format!("{prefix}{path}")
                }
            });
            let matcher = PathMatcher::compile(&full, opts.pattern())?;
            Ok((full, matcher))
        }
        PathSpec::Regex(regex) => {
            let mut combined: Vec<&str> = prefixes.collect();
            combined.reverse();
            let matcher = PathMatcher::from_regex(regex, &combined.concat())?;
            Ok((matcher.source().to_string(), matcher))
        }
    }
}

fn param_step(name: &str, validator: ParamHandler) -> Handler {
    let name: Arc<str> = Arc::from(name);
    handler(move |ctx, next| {
        let value = ctx.param(&name).unwrap_or_default().to_string();
        (*validator)(&value, ctx, next)
    })
}

fn decode_param(name: &str, raw: &str) -> Result<String> {
    let decode_error = |reason: String| RouterError::ParamDecode {
        name: name.to_string(),
        value: raw.to_string(),
        reason,
    };

    let bytes = raw.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        if *byte == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return Err(decode_error(format!("malformed percent-encoding at {}", i)));
            }
        }
    }

    urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| decode_error(e.to_string()))
}
