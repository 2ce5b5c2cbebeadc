//! Unit tests for CLI commands

use crate::cli::{build_router, Cli, Commands, RouteArgs};
use crate::runtime_config::RuntimeConfig;
use crate::ut::perform_request;
use clap::Parser;
use http::Method;

#[test]
fn test_serve_defaults() {
    let cli = Cli::try_parse_from(["brrtrouter-pprof", "serve"]).unwrap();
    match cli.command {
        Commands::Serve { addr, routes } => {
            assert_eq!(addr, "0.0.0.0:8080");
            assert_eq!(routes, RouteArgs::default());
        }
        other => panic!("expected serve, got {other:?}"),
    }
}

#[test]
fn test_token_requires_group() {
    assert!(Cli::try_parse_from(["brrtrouter-pprof", "serve", "--token", "t"]).is_err());
    let cli = Cli::try_parse_from([
        "brrtrouter-pprof",
        "routes",
        "--group",
        "/admin",
        "--token",
        "t",
        "--fgprof",
    ])
    .unwrap();
    match cli.command {
        Commands::Routes { routes } => {
            assert_eq!(routes.group.as_deref(), Some("/admin"));
            assert_eq!(routes.token.as_deref(), Some("t"));
            assert!(routes.fgprof);
        }
        other => panic!("expected routes, got {other:?}"),
    }
}

#[test]
fn test_prefix_precedence() {
    let config = RuntimeConfig {
        pprof_prefix: Some("/env/pprof".to_string()),
        ..RuntimeConfig::default()
    };
    let router = build_router(&RouteArgs::default(), &config);
    assert!(router.route(&Method::GET, "/env/pprof/heap").is_some());

    let args = RouteArgs {
        prefix: Some("dev/pprof".to_string()),
        ..RouteArgs::default()
    };
    let router = build_router(&args, &config);
    assert!(router.route(&Method::GET, "/dev/pprof/heap").is_some());
    assert!(router.route(&Method::GET, "/env/pprof/heap").is_none());
}

#[test]
fn test_guarded_group() {
    let args = RouteArgs {
        group: Some("/admin".to_string()),
        token: Some("token".to_string()),
        fgprof: true,
        ..RouteArgs::default()
    };
    let router = build_router(&args, &RuntimeConfig::default());
    assert!(router.route(&Method::GET, "/admin/fgprof/").is_some());
    assert!(router.route(&Method::GET, "/debug/fgprof/").is_some());

    let res = perform_request(&router, Method::GET, "/admin/ping", None, &[]);
    assert_eq!(res.status_code(), 403);

    let res = perform_request(
        &router,
        Method::GET,
        "/admin/ping",
        None,
        &[("Authorization", "Bearer token")],
    );
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.body(), br#"{"ping":"pong"}"#);

    let res = perform_request(&router, Method::GET, "/ping", None, &[]);
    assert_eq!(res.status_code(), 200);
}
