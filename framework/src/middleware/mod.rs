//! Request middleware
//!
//! Middleware wraps a handler and decides whether (and how) the request
//! reaches it. Global middleware runs on every request in registration
//! order, followed by the middleware attached to the matched route.
//!
//! ```rust,ignore
//! use campus::{async_trait, Middleware, Next, Request, Response};
//!
//! pub struct RequireJson;
//!
//! #[async_trait]
//! impl Middleware for RequireJson {
//!     async fn handle(&self, request: Request, next: Next) -> Response {
//!         next(request).await
//!     }
//! }
//! ```

mod registry;

pub use registry::{get_global_middleware, register_global_middleware, MiddlewareRegistry};

use crate::http::{Request, Response};
use crate::routing::BoxedHandler;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Continuation that runs the rest of the chain
pub type Next = Arc<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

pub type BoxedMiddleware = Arc<dyn Middleware>;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: Request, next: Next) -> Response;
}

pub fn into_boxed<M: Middleware + 'static>(middleware: M) -> BoxedMiddleware {
    Arc::new(middleware)
}

/// Ordered middleware around a single handler
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middleware: Vec<BoxedMiddleware>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: BoxedMiddleware) {
        self.middleware.push(middleware);
    }

    pub fn extend(&mut self, middleware: impl IntoIterator<Item = BoxedMiddleware>) {
        self.middleware.extend(middleware);
    }

    /// Run the request through every middleware, then the handler
    pub async fn execute(self, request: Request, handler: Arc<BoxedHandler>) -> Response {
        let mut next: Next = Arc::new(move |req| handler(req));

        for middleware in self.middleware.into_iter().rev() {
            let inner = next.clone();
            next = Arc::new(move |req| {
                let middleware = middleware.clone();
                let inner = inner.clone();
                Box::pin(async move { middleware.handle(req, inner).await })
            });
        }

        next(request).await
    }
}

/// Register global middleware from `bootstrap.rs`
///
/// ```rust,ignore
/// global_middleware!(LoggingMiddleware);
/// ```
#[macro_export]
macro_rules! global_middleware {
    ($middleware:expr) => {
        $crate::middleware::register_global_middleware($middleware)
    };
}
