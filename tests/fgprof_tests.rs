//! Integration tests for the fgprof route

use brrtrouter_pprof::context::RequestContext;
use brrtrouter_pprof::fgprof::{fgprof_register, fgprof_route_register, get_fgprof_prefix};
use brrtrouter_pprof::middleware::AuthMiddleware;
use brrtrouter_pprof::router::Router;
use brrtrouter_pprof::ut::perform_request;
use http::Method;
use std::sync::Arc;

mod common;
use common::profiler;

fn escaped(ctx: &mut RequestContext) {
    ctx.string(200, "escaped");
}

#[test]
fn test_prefix_options() {
    assert_eq!(get_fgprof_prefix(&[]), "/debug/fgprof");
    assert_eq!(get_fgprof_prefix(&["test/fgprof"]), "test/fgprof");
    assert_eq!(get_fgprof_prefix(&["test/fgprof", "fgprof"]), "test/fgprof");
}

#[test]
fn test_default_route() {
    let _guard = profiler::lock();
    let mut router = Router::new();
    fgprof_register(&mut router, &[]);
    router.get("/", Arc::new(escaped));

    let res = perform_request(&router, Method::GET, "/debug/fgprof/?seconds=1", None, &[]);
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.content_type(), Some("application/x-gzip"));

    let res = perform_request(&router, Method::GET, "/debug/fpprof/302", None, &[]);
    assert_eq!(res.status_code(), 404);

    let res = perform_request(&router, Method::GET, "/", None, &[]);
    assert_eq!(res.body(), b"escaped");
}

#[test]
fn test_folded_format() {
    let _guard = profiler::lock();
    let mut router = Router::new();
    fgprof_register(&mut router, &[]);

    let res = perform_request(
        &router,
        Method::GET,
        "/debug/fgprof/?seconds=0.2&format=folded",
        None,
        &[],
    );
    assert_eq!(res.status_code(), 200);
    assert!(res.content_type().is_some_and(|ct| ct.starts_with("text/plain")));
}

#[test]
fn test_bad_parameters() {
    let mut router = Router::new();
    fgprof_register(&mut router, &[]);

    let res = perform_request(&router, Method::GET, "/debug/fgprof/?seconds=abc", None, &[]);
    assert_eq!(res.status_code(), 400);
    assert_eq!(res.body_string(), "bad seconds: abc\n");

    let res = perform_request(
        &router,
        Method::GET,
        "/debug/fgprof/?seconds=1&format=svg",
        None,
        &[],
    );
    assert_eq!(res.status_code(), 400);
    assert_eq!(res.body_string(), "unknown format: svg\n");

    let res = perform_request(&router, Method::GET, "/debug/fgprof/?seconds=1e30", None, &[]);
    assert_eq!(res.status_code(), 400);
    assert_eq!(res.body_string(), "bad seconds: 1e30\n");
}

#[test]
fn test_group_with_bearer_auth() {
    let _guard = profiler::lock();
    let mut router = Router::new();
    {
        let mut admin = router.group("/admin");
        admin.use_middleware(Arc::new(AuthMiddleware::bearer("token")));
        fgprof_route_register(&mut admin, &["fgprof"]);
    }

    let res = perform_request(&router, Method::GET, "/admin/fgprof/?seconds=1", None, &[]);
    assert_eq!(res.status_code(), 403);

    let res = perform_request(
        &router,
        Method::GET,
        "/admin/fgprof/?seconds=1",
        None,
        &[("Authorization", "Bearer token")],
    );
    assert_eq!(res.status_code(), 200);
    assert_eq!(res.content_type(), Some("application/x-gzip"));
}
