use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde::Serialize;
use serde_json::Value;

use crate::config::load_config;
use crate::context::Context;
use crate::middleware::{compose, run};
use crate::router::{AllowedMethodsOptions, Router, UrlParams};

/// Command-line interface for layered-router
#[derive(Parser)]
#[command(name = "layered-router")]
#[command(about = "Inspect and exercise router configurations", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered routes in registration order
    Routes {
        /// Path to the router configuration file (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Print JSON instead of one line per route
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Dispatch a request and print the routing outcome as JSON
    Match {
        #[arg(short, long)]
        config: PathBuf,

        /// Request method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request host, for host-restricted routers
        #[arg(long)]
        host: Option<String>,

        /// Request path
        path: String,
    },
    /// Generate a URL for a named route
    Url {
        #[arg(short, long)]
        config: PathBuf,

        /// Route name
        name: String,

        /// Path parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Query parameter as key=value (repeatable)
        #[arg(short, long = "query", value_parser = parse_key_val)]
        query: Vec<(String, String)>,
    },
}

/// Outcome of `match`, as printed
#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub method: String,
    pub path: String,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_name: Option<String>,
    pub params: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s:?}"))
}

fn load_router(path: &Path) -> Result<Router> {
    let mut config = load_config(path)?;
    config.apply_env_overrides();
    config.build_router()
}

/// Run a parsed command, writing to stdout.
pub fn run_cli(cli: Cli) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_cli_to(cli, &mut out)
}

/// Run a parsed command, writing its output to `out`.
pub fn run_cli_to(cli: Cli, out: &mut impl Write) -> Result<()> {
    match cli.command {
        Commands::Routes { config, json } => {
            let router = load_router(&config)?;
            if json {
                serde_json::to_writer_pretty(&mut *out, &router.routes_summary())?;
                writeln!(out)?;
            } else {
                router.dump_routes_to(out)?;
            }
        }
        Commands::Match {
            config,
            method,
            host,
            path,
        } => {
            let router = load_router(&config)?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method {method:?}"))?;
            let output = dispatch_request(&router, method, host, &path);
            serde_json::to_writer_pretty(&mut *out, &output)?;
            writeln!(out)?;
        }
        Commands::Url {
            config,
            name,
            params,
            query,
        } => {
            let router = load_router(&config)?;
            let query: Vec<(&str, &str)> =
                query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let params = if params.is_empty() {
                UrlParams::Empty
            } else {
                UrlParams::named(params)
            };
            let url = router
                .url_with_query(&name, params, &query)
                .with_context(|| format!("Failed to build URL for route {name}"))?;
            writeln!(out, "{url}")?;
        }
    }
    Ok(())
}

/// Run one request through `routes()` then `allowed_methods()`.
pub(crate) fn dispatch_request(
    router: &Router,
    method: Method,
    host: Option<String>,
    path: &str,
) -> MatchOutput {
    let app = compose(vec![
        router.routes(),
        router.allowed_methods(AllowedMethodsOptions::default()),
    ]);

    let mut ctx = Context::new(method, path);
    ctx.host = host;
    let result = run(&app, &mut ctx);

    let (status, error) = match result {
        Ok(()) => (ctx.status.map_or(404, |s| s.as_u16()), None),
        Err(err) => (err.status().as_u16(), Some(err.to_string())),
    };

    MatchOutput {
        method: ctx.method.to_string(),
        path: ctx.path.clone(),
        status,
        allow: ctx.header("allow").map(str::to_string),
        route: ctx.matched_route.clone(),
        route_name: ctx.matched_route_name.clone(),
        params: ctx
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
        location: ctx.header("location").map(str::to_string),
        body: ctx.body.take(),
        error,
    }
}
