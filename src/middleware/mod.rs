mod auth;
mod core;
mod tracing;

pub use self::auth::AuthMiddleware;
pub use self::core::Middleware;
pub use self::tracing::TracingMiddleware;
