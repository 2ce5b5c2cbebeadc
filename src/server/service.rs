use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;

use super::request::copy_request;
use super::response::write_response;
use crate::context::RequestContext;
use crate::router::Router;

/// may_minihttp service that dispatches through a [`Router`].
///
/// may_minihttp clones the service for every connection, so each clone owns
/// one [`RequestContext`] that is reset and reused across the keep-alive
/// requests of that connection.
pub struct AppService {
    pub router: Arc<Router>,
    ctx: RequestContext,
}

impl AppService {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            ctx: RequestContext::new(),
        }
    }
}

impl Clone for AppService {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.router))
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        self.ctx.reset();
        copy_request(req, &mut self.ctx)?;
        self.router.serve(&mut self.ctx);
        write_response(&self.ctx, res);
        Ok(())
    }
}
