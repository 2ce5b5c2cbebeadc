use std::ops::ControlFlow;
use std::time::Duration;

use tracing::{info, warn};

use super::Middleware;
use crate::context::RequestContext;

/// Logs one line per request with status and latency.
///
/// Requests slower than `slow_threshold` are logged at `warn`.
pub struct TracingMiddleware {
    slow_threshold: Duration,
}

impl Default for TracingMiddleware {
    fn default() -> Self {
        Self {
            slow_threshold: Duration::from_secs(60),
        }
    }
}

impl TracingMiddleware {
    pub fn new(slow_threshold: Duration) -> Self {
        Self { slow_threshold }
    }
}

impl Middleware for TracingMiddleware {
    fn before(&self, ctx: &mut RequestContext) -> ControlFlow<()> {
        tracing::debug!(
            request_id = %ctx.request_id(),
            method = %ctx.request.method(),
            path = %ctx.request.path(),
            "Request started"
        );
        ControlFlow::Continue(())
    }

    fn after(&self, ctx: &mut RequestContext, latency: Duration) {
        let status = ctx.response.status_code();
        let latency_ms = latency.as_millis() as u64;
        if latency > self.slow_threshold {
            warn!(
                request_id = %ctx.request_id(),
                method = %ctx.request.method(),
                path = %ctx.request.path(),
                status,
                latency_ms,
                "Slow request"
            );
        } else {
            info!(
                request_id = %ctx.request_id(),
                method = %ctx.request.method(),
                path = %ctx.request.path(),
                status,
                latency_ms,
                "Request completed"
            );
        }
    }
}
