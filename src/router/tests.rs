use http::{Method, StatusCode};
use regex::Regex;

use super::{Mountable, RouteOptions, Router, RouterOptions};
use crate::context::Context;
use crate::error::RouterError;
use crate::middleware::{handler, param_handler, run, Handler};

fn ok() -> Handler {
    handler(|ctx, next| {
        ctx.status = Some(StatusCode::OK);
        next.run(ctx)
    })
}

fn paths(layers: &[std::sync::Arc<super::Layer>]) -> Vec<&str> {
    layers.iter().map(|l| l.path()).collect()
}

#[test]
fn test_match_collects_all_in_order() {
    let mut router = Router::new();
    router.use_middleware(vec![ok().into()]).unwrap();
    router.get("/users/:id", vec![ok()]).unwrap();
    router.post("/users/:id", vec![ok()]).unwrap();
    router.get("/users/me", vec![ok()]).unwrap();

    let matched = router.match_route("/users/me", &Method::GET);
    assert_eq!(matched.path.len(), 4);
    assert_eq!(
        paths(&matched.path_and_method),
        vec!["([^/]*)", "/users/:id", "/users/me"]
    );
    assert!(matched.route);
    assert_eq!(matched.most_specific().map(|l| l.path()), Some("/users/me"));
}

#[test]
fn test_method_agnostic_alone_is_not_a_route() {
    let mut router = Router::new();
    router.use_middleware(vec![ok().into()]).unwrap();
    let matched = router.match_route("/anything", &Method::GET);
    assert_eq!(matched.path_and_method.len(), 1);
    assert!(!matched.route);
}

#[test]
fn test_path_match_without_method() {
    let mut router = Router::new();
    router.get("/items", vec![ok()]).unwrap();
    let matched = router.match_route("/items", &Method::DELETE);
    assert_eq!(matched.path.len(), 1);
    assert!(matched.path_and_method.is_empty());
    assert!(!matched.route);
}

#[test]
fn test_head_matches_get_layers() {
    let mut router = Router::new();
    router.get("/items", vec![ok()]).unwrap();
    assert!(router.match_route("/items", &Method::HEAD).route);
}

#[test]
fn test_verb_shortcuts_register_single_method() {
    let mut router = Router::new();
    let layer = router.del("/x", vec![ok()]).unwrap();
    assert_eq!(layer.methods(), &[Method::DELETE]);
    let layer = router.trace_named("t", "/x", vec![ok()]).unwrap();
    assert_eq!(layer.methods(), &[Method::TRACE]);
    assert_eq!(layer.name(), Some("t"));
    let layer = router.all("/y", vec![ok()]).unwrap();
    assert_eq!(layer.methods().len(), 7);
}

#[test]
fn test_register_paths() {
    let mut router = Router::new();
    router
        .register_paths(
            ["/a", "/b"],
            &[Method::GET],
            vec![ok()],
            RouteOptions::named("ab"),
        )
        .unwrap();
    assert_eq!(router.stack().len(), 2);
    assert_eq!(router.route("ab").unwrap().path(), "/a");
}

#[test]
fn test_register_invalid_pattern() {
    let mut router = Router::new();
    let err = router.get("/files/*", vec![ok()]).unwrap_err();
    assert!(matches!(err, RouterError::PatternCompile { .. }));
    assert!(router.stack().is_empty());
}

#[test]
fn test_prefix_applies_to_existing_and_future_layers() {
    let mut router = Router::new();
    router.get("/users/:id", vec![ok()]).unwrap();
    router.prefix("/api/").unwrap();
    router.get("/posts", vec![ok()]).unwrap();

    assert_eq!(router.opts().prefix.as_deref(), Some("/api"));
    assert!(router.match_route("/api/users/7", &Method::GET).route);
    assert!(!router.match_route("/users/7", &Method::GET).route);
    assert!(router.match_route("/api/posts", &Method::GET).route);

    router.prefix("/v2").unwrap();
    assert!(router.match_route("/v2/users/7", &Method::GET).route);
    assert!(!router.match_route("/api/users/7", &Method::GET).route);
}

#[test]
fn test_prefix_twice_is_idempotent() {
    let mut router = Router::new();
    router.get("/users", vec![ok()]).unwrap();
    router.prefix("/api").unwrap();
    router.prefix("/api").unwrap();
    assert_eq!(router.stack()[0].path(), "/api/users");
}

#[test]
fn test_router_options_strict_and_sensitive() {
    let mut router = Router::with_options(RouterOptions {
        strict: true,
        sensitive: true,
        ..RouterOptions::default()
    });
    router.get("/Users", vec![ok()]).unwrap();
    router
        .register(
            "/loose",
            &[Method::GET],
            vec![ok()],
            RouteOptions {
                strict: Some(false),
                sensitive: Some(false),
                ..RouteOptions::default()
            },
        )
        .unwrap();

    assert!(router.match_route("/Users", &Method::GET).route);
    assert!(!router.match_route("/users", &Method::GET).route);
    assert!(!router.match_route("/Users/", &Method::GET).route);
    assert!(router.match_route("/LOOSE/", &Method::GET).route);
}

#[test]
fn test_mount_router_composes_prefixes() {
    let mut users = Router::with_options(RouterOptions {
        prefix: Some("/users".to_string()),
        ..RouterOptions::default()
    });
    users.get_named("user", "/:id", vec![ok()]).unwrap();

    let mut api = Router::with_options(RouterOptions {
        prefix: Some("/api".to_string()),
        ..RouterOptions::default()
    });
    api.use_path(&["/v1"], vec![Mountable::from(&users)]).unwrap();

    assert_eq!(api.stack()[0].path(), "/api/v1/users/:id");
    assert!(api.match_route("/api/v1/users/3", &Method::GET).route);
    assert_eq!(api.url("user", [("id", 3)]).unwrap(), "/api/v1/users/3");

    // Child is unaffected by the copy.
    assert_eq!(users.stack()[0].path(), "/users/:id");
    assert!(users.match_route("/users/3", &Method::GET).route);
}

#[test]
fn test_mount_at_root_applies_no_extra_prefix() {
    let mut child = Router::new();
    child.get("/health", vec![ok()]).unwrap();
    let mut parent = Router::new();
    parent.use_path(&["/"], vec![child.clone().into()]).unwrap();
    parent.use_middleware(vec![child.into()]).unwrap();
    assert_eq!(parent.stack()[0].path(), "/health");
    assert_eq!(parent.stack()[1].path(), "/health");
}

#[test]
fn test_mount_copies_child_params() {
    let mut child = Router::new();
    child.get("/items/:id", vec![ok()]).unwrap();
    child.param(
        "id",
        param_handler(|value, ctx, next| {
            if value.chars().all(|c| c.is_ascii_digit()) {
                next.run(ctx)
            } else {
                ctx.status = Some(StatusCode::BAD_REQUEST);
                Ok(())
            }
        }),
    );

    let mut parent = Router::new();
    parent.use_middleware(vec![child.into()]).unwrap();
    assert!(parent.params().contains_key("id"));

    let app = parent.routes();
    let mut ctx = Context::new(Method::GET, "/items/abc");
    run(&app, &mut ctx).unwrap();
    assert_eq!(ctx.status, Some(StatusCode::BAD_REQUEST));
}

#[test]
fn test_route_and_url_unknown_name() {
    let router = Router::new();
    let err = router.url("missing", [("id", 1)]).unwrap_err();
    assert!(matches!(err, RouterError::UnknownRoute { ref name } if name == "missing"));
    assert!(router.route("missing").is_err());
}

#[test]
fn test_url_with_query() {
    let mut router = Router::new();
    router.get_named("search", "/search/:q", vec![ok()]).unwrap();
    let url = router
        .url_with_query("search", [("q", "x")], &[("page", "1")])
        .unwrap();
    assert_eq!(url, "/search/x?page=1");
}

#[test]
fn test_regex_route() {
    let mut router = Router::new();
    router
        .get(Regex::new(r"^/files/(?P<name>[^/]+)$").unwrap(), vec![ok()])
        .unwrap();

    let app = router.routes();
    let mut ctx = Context::new(Method::GET, "/files/a.txt");
    run(&app, &mut ctx).unwrap();
    assert_eq!(ctx.param("name"), Some("a.txt"));
}

#[test]
fn test_flagged_regex_route_under_prefix() {
    let mut router = Router::with_options(RouterOptions {
        prefix: Some("/api".to_string()),
        ..RouterOptions::default()
    });
    router.get(Regex::new(r"(?i)^/foo$").unwrap(), vec![ok()]).unwrap();

    assert_eq!(router.stack()[0].path(), r"(?i)^/api/foo$");
    assert!(router.match_route("/api/foo", &Method::GET).route);
    assert!(router.match_route("/API/Foo", &Method::GET).route);
    assert!(!router.match_route("/foo", &Method::GET).route);
}

#[test]
fn test_redirect_by_name() {
    let mut router = Router::new();
    router.get_named("home", "/home", vec![ok()]).unwrap();
    router.redirect("/", "home").unwrap();

    let app = router.routes();
    let mut ctx = Context::new(Method::GET, "/");
    run(&app, &mut ctx).unwrap();
    assert_eq!(ctx.status, Some(StatusCode::MOVED_PERMANENTLY));
    assert_eq!(ctx.header("location"), Some("/home"));

    let mut router = Router::new();
    router
        .redirect_with_status("/old", "https://example.com/new", StatusCode::FOUND)
        .unwrap();
    let app = router.routes();
    let mut ctx = Context::new(Method::POST, "/old");
    run(&app, &mut ctx).unwrap();
    assert_eq!(ctx.status, Some(StatusCode::FOUND));
    assert_eq!(ctx.header("location"), Some("https://example.com/new"));
}

#[test]
fn test_redirect_unknown_name() {
    let mut router = Router::new();
    assert!(matches!(
        router.redirect("/", "nowhere"),
        Err(RouterError::UnknownRoute { .. })
    ));
}

#[test]
fn test_routes_summary() {
    let mut router = Router::new();
    router.get_named("list", "/items", vec![ok(), ok()]).unwrap();
    router.use_middleware(vec![ok().into()]).unwrap();

    let summary = router.routes_summary();
    assert_eq!(summary.len(), 2);
    assert_eq!(summary[0].methods, vec!["GET"]);
    assert_eq!(summary[0].name.as_deref(), Some("list"));
    assert_eq!(summary[0].handlers, 2);
    assert!(summary[1].methods.is_empty());

    let json = serde_json::to_value(&summary[1]).unwrap();
    assert!(json.get("name").is_none());

    router.prefix("/v1").unwrap();
    let mut out = Vec::new();
    router.dump_routes_to(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "[routes] prefix=/v1 count=2\n[route] GET /v1/items -> list\n[route] * /v1([^/]*) -> -\n"
    );
}
