//! Router core - registration, lookup and dispatch.

use http::Method;
use smallvec::SmallVec;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::radix::RadixRouter;
use crate::context::{ParamVec, RequestContext};
use crate::middleware::Middleware;

/// A handler registered on the router.
///
/// Receives the pooled context and writes its answer into
/// `ctx.response`. Handlers written against the `http` crate are turned
/// into a `HandlerFunc` with [`crate::adaptor::adapt`].
pub type HandlerFunc = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;

/// Body sent for unknown routes.
pub const NOT_FOUND_BODY: &str = "404 page not found";

/// A registered route: handler plus the group middleware in force when it
/// was added.
pub struct Route {
    pattern: Arc<str>,
    handler: HandlerFunc,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Route {
    pub(crate) fn new(pattern: &str, handler: HandlerFunc, middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            pattern: Arc::from(pattern),
            handler,
            middlewares,
        }
    }

    /// Full path pattern, e.g. `/debug/pprof/heap`.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerFunc {
        &self.handler
    }
}

/// Result of successfully matching a request path to a route
#[derive(Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Path parameters extracted from the URL (e.g., `{id}` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name, last occurrence wins.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Join a group base path and a relative path.
///
/// The result always starts with `/`, repeated slashes collapse, and a
/// trailing slash on `relative` is kept.
#[must_use]
pub fn join_paths(base: &str, relative: &str) -> String {
    let mut joined = String::with_capacity(base.len() + relative.len() + 2);
    joined.push('/');
    for segment in base
        .split('/')
        .chain(relative.split('/'))
        .filter(|s| !s.is_empty())
    {
        if joined.len() > 1 {
            joined.push('/');
        }
        joined.push_str(segment);
    }
    let keep_slash = if relative.is_empty() {
        base.ends_with('/')
    } else {
        relative.ends_with('/')
    };
    if keep_slash && !joined.ends_with('/') {
        joined.push('/');
    }
    joined
}

/// Path-to-handler table with router-wide middleware.
///
/// Router-wide middleware wraps every request, including ones that end in
/// a 404. Group middleware (see [`RouterGroup`]) only wraps the routes of
/// that group.
#[derive(Clone, Default)]
pub struct Router {
    tree: RadixRouter,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Router {
    /// An empty router with no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A router with request logging already attached.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut router = Self::new();
        router.use_middleware(Arc::new(crate::middleware::TracingMiddleware::default()));
        router
    }

    /// Attach router-wide middleware.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Start a route group under `prefix`.
    pub fn group(&mut self, prefix: &str) -> RouterGroup<'_> {
        RouterGroup {
            base_path: join_paths("/", prefix),
            middlewares: Vec::new(),
            router: self,
        }
    }

    /// Register `handler` for `method` and `path`.
    pub fn handle(&mut self, method: Method, path: &str, handler: HandlerFunc) -> &mut Self {
        let path = join_paths("/", path);
        self.insert(method, &path, handler, Vec::new());
        self
    }

    pub fn get(&mut self, path: &str, handler: HandlerFunc) -> &mut Self {
        self.handle(Method::GET, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: HandlerFunc) -> &mut Self {
        self.handle(Method::POST, path, handler)
    }

    fn insert(
        &mut self,
        method: Method,
        path: &str,
        handler: HandlerFunc,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) {
        let route = Arc::new(Route::new(path, handler, middlewares));
        if self.tree.insert(method.clone(), path, route).is_some() {
            warn!(method = %method, path = %path, "Route registered twice, keeping the latest");
        } else {
            debug!(method = %method, path = %path, "Route registered");
        }
    }

    /// Number of registered (method, path) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.len() == 0
    }

    /// Every registered `(method, pattern)`, sorted by pattern.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.tree.routes()
    }

    /// Log the routing table at `info`.
    pub fn dump_routes(&self) {
        let routes = self.routes();
        info!(routes_count = routes.len(), "Routing table");
        for (method, path) in routes {
            info!(method = %method, path = %path, "Route");
        }
    }

    /// Match a request to a route.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        let (route, path_params) = self.tree.route(method, path)?;
        Some(RouteMatch { route, path_params })
    }

    /// Dispatch one request: route it, run the middleware chain and the
    /// handler, and leave the answer in `ctx.response`.
    ///
    /// Unknown paths and methods get a 404. A panicking handler is logged
    /// and answered with a 500.
    pub fn serve(&self, ctx: &mut RequestContext) {
        let matched = Method::from_bytes(ctx.request.method().as_bytes())
            .ok()
            .and_then(|method| self.route(&method, ctx.request.path()));

        match matched {
            Some(RouteMatch { route, path_params }) => {
                debug!(
                    request_id = %ctx.request_id(),
                    method = %ctx.request.method(),
                    pattern = %route.pattern(),
                    "Route matched"
                );
                ctx.set_params(path_params);
                self.run_chain(ctx, &route.middlewares, route.handler.as_ref());
            }
            None => {
                debug!(
                    request_id = %ctx.request_id(),
                    method = %ctx.request.method(),
                    path = %ctx.request.path(),
                    "No route matched"
                );
                self.run_chain(ctx, &[], &not_found);
            }
        }
    }

    fn run_chain(
        &self,
        ctx: &mut RequestContext,
        route_middlewares: &[Arc<dyn Middleware>],
        handler: &(dyn Fn(&mut RequestContext) + Send + Sync),
    ) {
        let start = Instant::now();
        let chain: SmallVec<[&Arc<dyn Middleware>; 8]> = self
            .middlewares
            .iter()
            .chain(route_middlewares.iter())
            .collect();

        let mut entered = 0;
        let mut proceed = true;
        for middleware in &chain {
            entered += 1;
            if middleware.before(ctx).is_break() || ctx.is_aborted() {
                proceed = false;
                break;
            }
        }

        if proceed {
            call_with_recovery(ctx, handler);
        }

        let latency = start.elapsed();
        for middleware in chain[..entered].iter().rev() {
            middleware.after(ctx, latency);
        }
    }
}

fn not_found(ctx: &mut RequestContext) {
    ctx.string(404, NOT_FOUND_BODY);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}

fn call_with_recovery(ctx: &mut RequestContext, handler: &(dyn Fn(&mut RequestContext) + Send + Sync)) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(ctx)));
    if let Err(payload) = outcome {
        error!(
            request_id = %ctx.request_id(),
            method = %ctx.request.method(),
            path = %ctx.request.path(),
            panic = %panic_message(payload.as_ref()),
            "Handler panicked"
        );
        if !ctx.is_aborted() {
            ctx.response.reset();
            ctx.string(500, "Internal Server Error");
            ctx.abort();
        }
    }
}

/// A set of routes sharing a path prefix and middleware.
///
/// Groups borrow the router mutably while routes are being added; nested
/// groups inherit the parent's prefix and middleware.
///
/// ```rust
/// use brrtrouter_pprof::context::RequestContext;
/// use brrtrouter_pprof::middleware::AuthMiddleware;
/// use brrtrouter_pprof::router::Router;
/// use std::sync::Arc;
///
/// let mut router = Router::new();
/// let mut admin = router.group("/admin");
/// admin.use_middleware(Arc::new(AuthMiddleware::bearer("secret")));
/// admin.get("/ping", Arc::new(|ctx: &mut RequestContext| ctx.string(200, "pong")));
///
/// assert!(router.route(&http::Method::GET, "/admin/ping").is_some());
/// ```
pub struct RouterGroup<'a> {
    router: &'a mut Router,
    base_path: String,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl RouterGroup<'_> {
    /// Absolute prefix of this group.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Attach middleware to routes added to this group from now on.
    pub fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middlewares.push(middleware);
        self
    }

    /// Nested group under `relative`.
    pub fn group(&mut self, relative: &str) -> RouterGroup<'_> {
        RouterGroup {
            base_path: join_paths(&self.base_path, relative),
            middlewares: self.middlewares.clone(),
            router: &mut *self.router,
        }
    }

    pub fn handle(&mut self, method: Method, relative: &str, handler: HandlerFunc) -> &mut Self {
        let path = join_paths(&self.base_path, relative);
        self.router
            .insert(method, &path, handler, self.middlewares.clone());
        self
    }

    pub fn get(&mut self, relative: &str, handler: HandlerFunc) -> &mut Self {
        self.handle(Method::GET, relative, handler)
    }

    pub fn post(&mut self, relative: &str, handler: HandlerFunc) -> &mut Self {
        self.handle(Method::POST, relative, handler)
    }
}
