use std::ops::ControlFlow;
use std::time::Duration;

use crate::context::RequestContext;

/// Hooks run around every handler of the router or group they are attached to.
///
/// `before` hooks run in registration order. Returning
/// [`ControlFlow::Break`] stops the chain: later hooks and the handler are
/// skipped and whatever the hook wrote to `ctx.response` is sent. `after`
/// hooks run in reverse order for every middleware whose `before` ran.
pub trait Middleware: Send + Sync {
    fn before(&self, _ctx: &mut RequestContext) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
    fn after(&self, _ctx: &mut RequestContext, _latency: Duration) {}
}
