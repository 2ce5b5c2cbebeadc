//! End-to-end tests over TCP
//!
//! Each test starts an [`HttpServer`](brrtrouter_pprof::server::HttpServer)
//! on a free port and speaks raw HTTP/1.1 to it, so the request copy-in,
//! the adaptor and the response copy-out are all on the path.

use brrtrouter_pprof::adaptor::{adapt, set_cookie, Cookie, CompatRequest, CompatRequestExt, ResponseWriter};
use brrtrouter_pprof::context::RequestContext;
use brrtrouter_pprof::pprof;
use brrtrouter_pprof::router::Router;
use http::{HeaderValue, StatusCode};
use std::io::{Read, Write};
use std::sync::Arc;

mod common;
use common::http::{get, send_request, start_server};

fn test_router() -> Router {
    let mut router = Router::with_defaults();
    pprof::register(&mut router, &[]);
    router.get(
        "/ping",
        Arc::new(|ctx: &mut RequestContext| ctx.json(200, &serde_json::json!({"ping": "pong"}))),
    );
    router.post(
        "/echo",
        adapt(|w: &mut dyn ResponseWriter, mut req: CompatRequest| {
            let mut body = Vec::new();
            req.body_mut().read_to_end(&mut body).unwrap();
            let seen = req
                .headers()
                .get("x-custom")
                .cloned()
                .unwrap_or(HeaderValue::from_static("none"));
            w.header().insert("X-Seen", seen);
            w.header().insert("x-go-pprof", HeaderValue::from_static("0"));
            set_cookie(w, &Cookie::new("a", "1"));
            set_cookie(w, &Cookie::new("b", "2"));
            w.write_header(StatusCode::CREATED);
            w.write_all(&body).unwrap();
        }),
    );
    router.get(
        "/cookie",
        adapt(|w: &mut dyn ResponseWriter, req: CompatRequest| {
            let value = req.cookie("session").map(|c| c.value).unwrap_or_default();
            w.write_all(value.as_bytes()).unwrap();
        }),
    );
    router
}

#[test]
fn test_pprof_index_over_tcp() {
    let handle = start_server(test_router());
    let res = get(handle.addr(), "/debug/pprof/", "");
    handle.stop();

    assert_eq!(res.status, 200);
    assert_eq!(res.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert!(res.body_str().contains("<title>/debug/pprof/</title>"));
}

#[test]
fn test_cmdline_over_tcp() {
    let handle = start_server(test_router());
    let res = get(handle.addr(), "/debug/pprof/cmdline", "");
    handle.stop();

    assert_eq!(res.status, 200);
    assert_eq!(res.header("X-Content-Type-Options"), Some("nosniff"));
    let first_arg = std::env::args().next().unwrap();
    assert!(res.body_str().starts_with(&first_arg));
}

#[test]
fn test_unknown_path_is_404() {
    let handle = start_server(test_router());
    let res = get(handle.addr(), "/debug/pprof/nope/deeper", "");
    handle.stop();

    assert_eq!(res.status, 404);
}

#[test]
fn test_json_route() {
    let handle = start_server(test_router());
    let res = get(handle.addr(), "/ping", "");
    handle.stop();

    assert_eq!(res.status, 200);
    assert_eq!(res.header("Content-Type"), Some("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&res.body).unwrap();
    assert_eq!(body["ping"], "pong");
}

#[test]
fn test_body_headers_and_cookies_round_trip() {
    let handle = start_server(test_router());
    let payload = "<!doctype html><html>";
    let req = format!(
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nX-Custom: yes\r\nContent-Length: {}\r\n\r\n{payload}",
        payload.len()
    );
    let res = send_request(handle.addr(), &req);
    handle.stop();

    assert_eq!(res.status, 201);
    assert_eq!(res.body_str(), payload);
    assert_eq!(res.header("X-Seen"), Some("yes"));
    assert_eq!(res.header("X-Go-Pprof"), Some("0"));
    assert_eq!(res.header_values("Set-Cookie"), vec!["a=1", "b=2"]);
    assert_eq!(res.header("Content-Type"), Some("text/html; charset=utf-8"));
}

#[test]
fn test_request_cookie_reaches_handler() {
    let handle = start_server(test_router());
    let res = get(handle.addr(), "/cookie", "Cookie: theme=dark; session=abc123\r\n");
    handle.stop();

    assert_eq!(res.status, 200);
    assert_eq!(res.body_str(), "abc123");
}

#[test]
fn test_keep_alive_reuses_context() {
    let handle = start_server(test_router());
    let addr = handle.addr();
    let mut stream = std::net::TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(std::time::Duration::from_millis(500)))
        .unwrap();

    for session in ["first", "second"] {
        let req = format!(
            "GET /cookie HTTP/1.1\r\nHost: localhost\r\nCookie: session={session}\r\n\r\n"
        );
        stream.write_all(req.as_bytes()).unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).unwrap();
        let res = common::http::parse_response(&buf[..n]);
        assert_eq!(res.status, 200);
        assert_eq!(res.body_str(), session);
    }
    handle.stop();
}
