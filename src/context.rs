//! Request context threaded through a middleware chain.
//!
//! The router reads `method`, `path`, `host` and `router_path`, and writes
//! the matching state (`matched`, `matched_route`, `captures`, `params`, ...)
//! plus the response fields used by `allowed_methods()`.

use std::collections::HashMap;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue, LOCATION};
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;

use crate::error::{Result, RouterError};
use crate::router::{Captures, Layer, ParamVec, Router};

/// Per-request state shared by the router and the handlers it dispatches to.
#[derive(Debug)]
pub struct Context {
    /// Request method (uppercase verb)
    pub method: Method,
    /// Request path, without query string
    pub path: String,
    /// Host the request was addressed to
    pub host: Option<String>,
    /// Overrides `path` for route matching when set
    pub router_path: Option<String>,
    /// Every path-matched layer seen so far, across all routers in the chain
    pub matched: Vec<Arc<Layer>>,
    /// The router whose dispatch handler ran last
    pub router: Option<Arc<Router>>,
    /// Path of the most specific matched route
    pub matched_route: Option<String>,
    /// Name of the most specific matched route
    pub matched_route_name: Option<String>,
    /// Name of the layer currently being executed
    pub route_name: Option<String>,
    /// Raw captures of the layer currently being executed
    pub captures: Captures,
    /// Decoded path parameters accumulated by the chain
    pub params: ParamVec,
    /// Response status; `None` until a handler sets one
    pub status: Option<StatusCode>,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Option<Value>,
}

impl Context {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            host: None,
            router_path: None,
            matched: Vec::new(),
            router: None,
            matched_route: None,
            matched_route_name: None,
            route_name: None,
            captures: Captures::new(),
            params: ParamVec::new(),
            status: None,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Get a path parameter by name
    ///
    /// Uses "last write wins" semantics, matching how later layers in the
    /// chain overwrite values bound by earlier ones.
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert params to a HashMap. Allocates; prefer [`Context::param`].
    #[must_use]
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Response header value, if set and valid UTF-8
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value).map_err(|_| RouterError::InvalidHeader {
            name: name.as_str().to_string(),
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Set `Location` and a 302 status. Callers may override the status afterwards.
    pub fn redirect(&mut self, location: &str) -> Result<()> {
        self.set_header(LOCATION, location)?;
        self.status = Some(StatusCode::FOUND);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_param_last_write_wins() {
        let mut ctx = Context::new(Method::GET, "/org/1/user/2");
        ctx.params.push((Arc::from("id"), "1".to_string()));
        ctx.params.push((Arc::from("id"), "2".to_string()));
        assert_eq!(ctx.param("id"), Some("2"));
        assert_eq!(ctx.param("missing"), None);
        assert_eq!(ctx.params_map().get("id").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_redirect_sets_location() {
        let mut ctx = Context::new(Method::GET, "/old");
        ctx.redirect("/new").unwrap();
        assert_eq!(ctx.status, Some(StatusCode::FOUND));
        assert_eq!(ctx.header("location"), Some("/new"));
    }

    #[test]
    fn test_set_header_rejects_control_chars() {
        let mut ctx = Context::new(Method::GET, "/");
        let err = ctx.set_header(LOCATION, "bad\nvalue").unwrap_err();
        assert!(matches!(err, RouterError::InvalidHeader { .. }));
    }
}
