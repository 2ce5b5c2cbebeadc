//! In-process requests against a [`Router`], no socket involved.
//!
//! ```rust
//! use brrtrouter_pprof::context::RequestContext;
//! use brrtrouter_pprof::router::Router;
//! use brrtrouter_pprof::ut::perform_request;
//! use http::Method;
//! use std::sync::Arc;
//!
//! let mut router = Router::new();
//! router.get("/", Arc::new(|ctx: &mut RequestContext| ctx.string(200, "escaped")));
//!
//! let res = perform_request(&router, Method::GET, "/", None, &[]);
//! assert_eq!(res.status_code(), 200);
//! assert_eq!(res.body(), b"escaped");
//! ```

use http::Method;

use crate::context::{RequestContext, Response};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::router::Router;

/// Run one request through `router` and return the response.
///
/// `url` becomes the raw request-URI, so both origin-form (`/a?b=c`) and
/// absolute-form (`http://host/a`) work. Headers are added in order.
#[must_use]
pub fn perform_request(
    router: &Router,
    method: Method,
    url: &str,
    body: Option<&[u8]>,
    headers: &[(&str, &str)],
) -> Response {
    let mut ctx = RequestContext::new();
    ctx.request.set_method(method.as_str());
    ctx.request.set_request_uri(url);
    for (name, value) in headers {
        ctx.request.add_header(name, value);
    }
    if let Some(body) = body {
        ctx.request.set_body(body);
    }
    ctx.set_request_id(RequestId::from_header_or_new(
        ctx.request.header(REQUEST_ID_HEADER),
    ));
    router.serve(&mut ctx);
    std::mem::take(&mut ctx.response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::NOT_FOUND_BODY;
    use std::sync::Arc;

    #[test]
    fn test_headers_and_body_reach_handler() {
        let mut router = Router::new();
        router.post(
            "/echo",
            Arc::new(|ctx: &mut RequestContext| {
                let token = ctx.request.header("authorization").unwrap_or("").to_string();
                let body = ctx.request.body().to_vec();
                ctx.response.set_header("X-Token", &token);
                ctx.response.set_body(&body);
            }),
        );
        let res = perform_request(
            &router,
            Method::POST,
            "/echo?x=1",
            Some(b"payload"),
            &[("Authorization", "Bearer token")],
        );
        assert_eq!(res.header("x-token"), Some("Bearer token"));
        assert_eq!(res.body(), b"payload");
    }

    #[test]
    fn test_unknown_route() {
        let res = perform_request(&Router::new(), Method::GET, "/nope", None, &[]);
        assert_eq!(res.status_code(), 404);
        assert_eq!(res.body(), NOT_FOUND_BODY.as_bytes());
    }
}
