use may_minihttp::Request;
use std::io::{self, Read};
use tracing::debug;

use crate::context::RequestContext;
use crate::ids::{RequestId, REQUEST_ID_HEADER};

/// Copy a parsed wire request into a (reset) pooled context.
///
/// The request-URI is stored verbatim, header names keep their case and
/// order, and the body is read in full. The request id comes from the
/// `X-Request-Id` header when it holds a valid ULID.
///
/// # Errors
///
/// Returns an error if reading the request body fails.
pub fn copy_request(req: Request, ctx: &mut RequestContext) -> io::Result<()> {
    let target = &mut ctx.request;
    target.set_method(req.method());
    target.set_request_uri(req.path());
    target.set_protocol(&format!("HTTP/1.{:?}", req.version()));

    for header in req.headers() {
        target.add_header(header.name, &String::from_utf8_lossy(header.value));
    }

    let request_id = RequestId::from_header_or_new(target.header(REQUEST_ID_HEADER));
    ctx.set_request_id(request_id);

    let body = ctx.request.body_mut();
    let size = req.body().read_to_end(body)?;

    debug!(
        request_id = %request_id,
        method = %ctx.request.method(),
        uri = %ctx.request.request_uri(),
        protocol = %ctx.request.protocol(),
        header_count = ctx.request.header_count(),
        body_size_bytes = size,
        "HTTP request parsed"
    );
    Ok(())
}
