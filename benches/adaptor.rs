use brrtrouter_pprof::adaptor::{adapt, compat_request, detect_content_type, CompatRequest, ResponseWriter};
use brrtrouter_pprof::context::RequestContext;
use brrtrouter_pprof::pprof;
use brrtrouter_pprof::router::Router;
use brrtrouter_pprof::ut::perform_request;
use criterion::{criterion_group, criterion_main, Criterion};
use http::{HeaderValue, Method, StatusCode};
use std::hint::black_box;
use std::io::Write;

fn populated_context() -> RequestContext {
    let mut ctx = RequestContext::new();
    ctx.request.set_method("POST");
    ctx.request
        .set_request_uri("http://foobar.com/foo/bar?baz=123&qux=456");
    ctx.request.add_header("Foo-Bar", "baz");
    ctx.request.add_header("Abc", "defg");
    ctx.request.add_header("Cookie", "a=1; b=2");
    ctx.request.add_header("Content-Type", "text/html");
    ctx.request.set_body(b"<!doctype html><html>");
    ctx.set("contextKey", "contextValue");
    ctx
}

fn echo(w: &mut dyn ResponseWriter, req: CompatRequest) {
    w.header().insert("Header1", HeaderValue::from_static("value1"));
    w.write_header(StatusCode::OK);
    let _ = w.write_all(req.body().as_bytes());
}

fn bench_compat_request(c: &mut Criterion) {
    let ctx = populated_context();
    c.bench_function("compat_request", |b| {
        b.iter(|| {
            let req = compat_request(black_box(&ctx));
            black_box(&req);
        })
    });
}

fn bench_adapted_handler(c: &mut Criterion) {
    let handler = adapt(echo);
    let mut ctx = populated_context();
    c.bench_function("adapted_echo", |b| {
        b.iter(|| {
            ctx.response.reset();
            handler(&mut ctx);
            black_box(ctx.response.body());
        })
    });
}

fn bench_sniff(c: &mut Criterion) {
    let inputs: [&[u8]; 4] = [
        b"<!DOCTYPE HTML><html><body>",
        b"\x1f\x8b\x08\x00\x00\x00\x00\x00",
        b"{\"ping\":\"pong\"}",
        b"\x00\x01\x02binary",
    ];
    c.bench_function("detect_content_type", |b| {
        b.iter(|| {
            for data in inputs {
                black_box(detect_content_type(black_box(data)));
            }
        })
    });
}

fn bench_pprof_index(c: &mut Criterion) {
    let mut router = Router::new();
    pprof::register(&mut router, &[]);
    c.bench_function("pprof_index", |b| {
        b.iter(|| {
            let res = perform_request(&router, Method::GET, "/debug/pprof/", None, &[]);
            black_box(res.status_code());
        })
    });
}

criterion_group!(
    benches,
    bench_compat_request,
    bench_adapted_handler,
    bench_sniff,
    bench_pprof_index
);
criterion_main!(benches);
