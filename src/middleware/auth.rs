use std::ops::ControlFlow;

use tracing::debug;

use super::Middleware;
use crate::context::RequestContext;

/// Rejects requests whose `Authorization` header is not exactly `token`.
///
/// Answers `403 Forbidden` with an empty body, which suits debug endpoints
/// mounted behind a shared secret.
pub struct AuthMiddleware {
    token: String,
}

impl AuthMiddleware {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Guard with `Bearer {token}`.
    pub fn bearer(token: &str) -> Self {
        Self::new(format!("Bearer {token}"))
    }
}

impl Middleware for AuthMiddleware {
    fn before(&self, ctx: &mut RequestContext) -> ControlFlow<()> {
        match ctx.request.header("authorization") {
            Some(h) if h == self.token => ControlFlow::Continue(()),
            _ => {
                debug!(
                    request_id = %ctx.request_id(),
                    path = %ctx.request.path(),
                    "Authorization rejected"
                );
                ctx.abort_with_status(403);
                ControlFlow::Break(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_rejects_missing_and_wrong_tokens() {
        let mw = AuthMiddleware::bearer("token");
        let mut ctx = RequestContext::new();
        assert!(mw.before(&mut ctx).is_break());
        assert_eq!(ctx.response.status_code(), 403);
        assert!(ctx.is_aborted());

        let mut ctx = RequestContext::new();
        ctx.request.set_header("Authorization", "Bearer nope");
        assert!(mw.before(&mut ctx).is_break());
    }

    #[test]
    fn test_auth_accepts_matching_token() {
        let mw = AuthMiddleware::bearer("token");
        let mut ctx = RequestContext::new();
        ctx.request.set_header("Authorization", "Bearer token");
        assert!(mw.before(&mut ctx).is_continue());
        assert!(!ctx.is_aborted());
    }
}
