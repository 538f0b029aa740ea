//! # CLI Module
//!
//! Command-line access to a router defined in a config file (see
//! [`config`](crate::config)). Useful for checking what a route table
//! does before wiring it into an application.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List the registered layers in registration order:
//!
//! ```bash
//! layered-router routes --config routes.yaml
//! layered-router routes --config routes.yaml --json
//! ```
//!
//! ### `match`
//!
//! Run a request through `routes()` and `allowed_methods()` and print the
//! resulting status, `Allow` header, matched route and params as JSON:
//!
//! ```bash
//! layered-router match --config routes.yaml --method POST /api/users/7
//! ```
//!
//! ### `url`
//!
//! Generate a URL for a named route:
//!
//! ```bash
//! layered-router url --config routes.yaml get_user --param id=7 --query tab=posts
//! ```

mod commands;


pub use commands::{run_cli, run_cli_to, Cli, Commands, MatchOutput};
