//! # Route table configuration
//!
//! Loads a router definition from YAML or JSON and builds a [`Router`]
//! whose routes are served by the [echo handler](crate::echo::echo_handler).
//!
//! ## File format
//!
//! ```yaml
//! prefix: /api
//! strict: false
//! sensitive: false
//! exclusive: false
//! host: api.example.com        # or host_pattern: '^api\.'
//! methods: [GET, POST, PUT, DELETE, OPTIONS, HEAD, PATCH]
//! routes:
//!   - path: /users/:id
//!     methods: [GET]
//!     name: get_user
//!   - path: /files/:rest*
//!     methods: [GET, HEAD]
//!     handler: serve_file
//! redirects:
//!   - from: /home
//!     to: get_user
//!     status: 302
//! ```
//!
//! ## Environment Variables
//!
//! Applied on top of the file by [`RouterConfig::apply_env_overrides`]:
//!
//! - `LR_PREFIX`: router prefix
//! - `LR_STRICT`, `LR_SENSITIVE`, `LR_EXCLUSIVE`: `true` / `false`

use std::env;
use std::path::Path;

use anyhow::{bail, Context, Result};
use http::{Method, StatusCode};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::echo::echo_handler;
use crate::router::{Host, RouteOptions, Router, RouterOptions};

/// Router definition as read from disk
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub exclusive: bool,
    /// Exact host this router serves
    #[serde(default)]
    pub host: Option<String>,
    /// Host regex; ignored when `host` is set
    #[serde(default)]
    pub host_pattern: Option<String>,
    /// Implemented methods; the router default set when omitted
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub redirects: Vec<RedirectConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub path: String,
    /// Empty means method-agnostic
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Label reported by the echo handler; defaults to the name, then the path
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub end: Option<bool>,
    #[serde(default)]
    pub strict: Option<bool>,
    #[serde(default)]
    pub sensitive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RedirectConfig {
    pub from: String,
    pub to: String,
    #[serde(default = "default_redirect_status")]
    pub status: u16,
}

fn default_redirect_status() -> u16 {
    301
}

/// Load a router definition, choosing the parser from the file extension.
///
/// `.yaml`/`.yml` go through `serde_yaml`, everything else through `serde_json`.
pub fn load_config(path: impl AsRef<Path>) -> Result<RouterConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read router config {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let config = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?
    };
    Ok(config)
}

impl RouterConfig {
    /// Apply `LR_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup; unparseable booleans are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let flag = |key: &str| lookup(key).and_then(|v| v.trim().parse::<bool>().ok());

        if let Some(prefix) = lookup("LR_PREFIX") {
            self.prefix = Some(prefix);
        }
        if let Some(strict) = flag("LR_STRICT") {
            self.strict = strict;
        }
        if let Some(sensitive) = flag("LR_SENSITIVE") {
            self.sensitive = sensitive;
        }
        if let Some(exclusive) = flag("LR_EXCLUSIVE") {
            self.exclusive = exclusive;
        }
    }

    pub fn router_options(&self) -> Result<RouterOptions> {
        let host = match (&self.host, &self.host_pattern) {
            (Some(host), _) => Some(Host::Exact(host.clone())),
            (None, Some(pattern)) => Some(Host::Pattern(
                Regex::new(pattern).with_context(|| format!("Invalid host pattern {pattern}"))?,
            )),
            (None, None) => None,
        };

        let mut opts = RouterOptions {
            prefix: self.prefix.clone(),
            strict: self.strict,
            sensitive: self.sensitive,
            exclusive: self.exclusive,
            host,
            ..RouterOptions::default()
        };
        if let Some(methods) = &self.methods {
            opts.methods = parse_methods(methods)?;
        }
        Ok(opts)
    }

    /// Build a router with every configured route served by the echo handler.
    pub fn build_router(&self) -> Result<Router> {
        let mut router = Router::with_options(self.router_options()?);

        for route in &self.routes {
            let methods = parse_methods(&route.methods)
                .with_context(|| format!("Invalid methods for route {}", route.path))?;
            let label = route
                .handler
                .clone()
                .or_else(|| route.name.clone())
                .unwrap_or_else(|| route.path.clone());
            router
                .register(
                    route.path.as_str(),
                    &methods,
                    vec![echo_handler(label)],
                    RouteOptions {
                        name: route.name.clone(),
                        end: route.end,
                        strict: route.strict,
                        sensitive: route.sensitive,
                        ignore_captures: None,
                    },
                )
                .with_context(|| format!("Failed to register route {}", route.path))?;
        }

        for redirect in &self.redirects {
            let status = StatusCode::from_u16(redirect.status)
                .with_context(|| format!("Invalid redirect status {}", redirect.status))?;
            if !status.is_redirection() {
                bail!("Redirect status must be 3xx, got {}", redirect.status);
            }
            router
                .redirect_with_status(&redirect.from, &redirect.to, status)
                .with_context(|| format!("Failed to register redirect {}", redirect.from))?;
        }

        Ok(router)
    }
}

/// Parse method names case-insensitively into canonical uppercase methods.
pub fn parse_methods(methods: &[String]) -> Result<Vec<Method>> {
    methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.trim().to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method {m:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("LR_PREFIX", "/v2"),
            ("LR_STRICT", "true"),
            ("LR_SENSITIVE", "nope"),
        ]
        .into_iter()
        .collect();

        let mut config = RouterConfig {
            sensitive: true,
            ..RouterConfig::default()
        };
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.prefix.as_deref(), Some("/v2"));
        assert!(config.strict);
        assert!(config.sensitive);
        assert!(!config.exclusive);
    }

    #[test]
    fn test_parse_methods_uppercases() {
        let methods = parse_methods(&["get".to_string(), " Post ".to_string()]).unwrap();
        assert_eq!(methods, vec![Method::GET, Method::POST]);
        assert!(parse_methods(&["GE T".to_string()]).is_err());
    }

    #[test]
    fn test_router_options_host() {
        let config = RouterConfig {
            host_pattern: Some("^api\\.".to_string()),
            methods: Some(vec!["GET".to_string()]),
            ..RouterConfig::default()
        };
        let opts = config.router_options().unwrap();
        assert!(matches!(opts.host, Some(Host::Pattern(_))));
        assert_eq!(opts.methods, vec![Method::GET]);

        let bad = RouterConfig {
            host_pattern: Some("(".to_string()),
            ..RouterConfig::default()
        };
        assert!(bad.router_options().is_err());
    }

    #[test]
    fn test_redirect_status_must_be_3xx() {
        let config = RouterConfig {
            redirects: vec![RedirectConfig {
                from: "/a".to_string(),
                to: "/b".to_string(),
                status: 200,
            }],
            ..RouterConfig::default()
        };
        assert!(config.build_router().is_err());
    }
}
