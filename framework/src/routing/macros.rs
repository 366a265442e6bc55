//! Declarative route definitions
//!
//! ```rust,ignore
//! use campus::{routes, get, post, group};
//!
//! routes! {
//!     post!("/login", controllers::auth::login).name("login"),
//!
//!     group!("/", {
//!         get!("/students", controllers::students::index).name("students.index"),
//!         post!("/students", controllers::students::store).name("students.store"),
//!     }).middleware(AuthMiddleware),
//! }
//! ```

use crate::http::{Request, Response};
use crate::middleware::{into_boxed, BoxedMiddleware, Middleware};
use crate::routing::router::{register_route_name, BoxedHandler, Router};
use std::future::Future;
use std::sync::Arc;

/// Compile-time check that a route path starts with '/'
pub const fn validate_route_path(path: &'static str) -> &'static str {
    let bytes = path.as_bytes();
    if bytes.is_empty() || bytes[0] != b'/' {
        panic!("Route path must start with '/'")
    }
    path
}

/// HTTP method for route definitions
#[derive(Clone, Copy, Debug)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_method(self) -> http::Method {
        match self {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
        }
    }
}

/// Builder for route definitions that supports `.name()` and `.middleware()` chaining
pub struct RouteDefBuilder<H> {
    method: HttpMethod,
    path: &'static str,
    handler: H,
    name: Option<&'static str>,
    middlewares: Vec<BoxedMiddleware>,
}

impl<H, Fut> RouteDefBuilder<H>
where
    H: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    pub fn new(method: HttpMethod, path: &'static str, handler: H) -> Self {
        Self {
            method,
            path,
            handler,
            name: None,
            middlewares: Vec::new(),
        }
    }

    /// Name this route for URL generation
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(into_boxed(middleware));
        self
    }

    pub fn register(self, router: Router) -> Router {
        self.into_group_route().register_with_prefix(router, "", &[])
    }

    /// Type-erase the handler so routes of a group can share a Vec
    pub fn into_group_route(self) -> GroupRoute {
        let handler = self.handler;
        let boxed: BoxedHandler = Box::new(move |req| Box::pin(handler(req)));
        GroupRoute {
            method: self.method,
            path: self.path,
            handler: Arc::new(boxed),
            name: self.name,
            middlewares: self.middlewares,
        }
    }
}

#[macro_export]
macro_rules! get {
    ($path:expr, $handler:expr) => {{
        const _: &str = $crate::validate_route_path($path);
        $crate::__route_impl($crate::routing::HttpMethod::Get, $path, $handler)
    }};
}

#[macro_export]
macro_rules! post {
    ($path:expr, $handler:expr) => {{
        const _: &str = $crate::validate_route_path($path);
        $crate::__route_impl($crate::routing::HttpMethod::Post, $path, $handler)
    }};
}

#[macro_export]
macro_rules! put {
    ($path:expr, $handler:expr) => {{
        const _: &str = $crate::validate_route_path($path);
        $crate::__route_impl($crate::routing::HttpMethod::Put, $path, $handler)
    }};
}

#[macro_export]
macro_rules! delete {
    ($path:expr, $handler:expr) => {{
        const _: &str = $crate::validate_route_path($path);
        $crate::__route_impl($crate::routing::HttpMethod::Delete, $path, $handler)
    }};
}

#[doc(hidden)]
pub fn __route_impl<H, Fut>(method: HttpMethod, path: &'static str, handler: H) -> RouteDefBuilder<H>
where
    H: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    RouteDefBuilder::new(method, path, handler)
}

/// A route stored within a group (type-erased handler)
pub struct GroupRoute {
    method: HttpMethod,
    path: &'static str,
    handler: Arc<BoxedHandler>,
    name: Option<&'static str>,
    middlewares: Vec<BoxedMiddleware>,
}

impl GroupRoute {
    /// Group middleware runs outside route middleware
    fn register_with_prefix(
        self,
        mut router: Router,
        prefix: &str,
        group_middlewares: &[BoxedMiddleware],
    ) -> Router {
        let full_path = if prefix.is_empty() || prefix == "/" {
            self.path.to_string()
        } else if self.path == "/" {
            prefix.to_string()
        } else {
            format!("{}{}", prefix, self.path)
        };
        let method = self.method.as_method();

        router.insert(method.clone(), &full_path, self.handler);
        if let Some(name) = self.name {
            register_route_name(name, &full_path);
        }
        for mw in group_middlewares.iter().cloned().chain(self.middlewares) {
            router.add_middleware(&method, &full_path, mw);
        }
        router
    }
}

/// Routes sharing a prefix and middleware; a "/" prefix only shares middleware
pub struct GroupDef {
    prefix: &'static str,
    routes: Vec<GroupRoute>,
    group_middlewares: Vec<BoxedMiddleware>,
}

impl GroupDef {
    #[doc(hidden)]
    pub fn __new_unchecked(prefix: &'static str) -> Self {
        Self {
            prefix,
            routes: Vec::new(),
            group_middlewares: Vec::new(),
        }
    }

    pub fn route<H, Fut>(mut self, route: RouteDefBuilder<H>) -> Self
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.routes.push(route.into_group_route());
        self
    }

    /// Add middleware to all routes in this group
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.group_middlewares.push(into_boxed(middleware));
        self
    }

    pub fn register(self, mut router: Router) -> Router {
        for route in self.routes {
            router = route.register_with_prefix(router, self.prefix, &self.group_middlewares);
        }
        router
    }
}

/// Define a route group with a shared prefix
#[macro_export]
macro_rules! group {
    ($prefix:expr, { $( $route:expr ),* $(,)? }) => {{
        const _: &str = $crate::validate_route_path($prefix);
        let mut group = $crate::routing::GroupDef::__new_unchecked($prefix);
        $(
            group = group.route($route);
        )*
        group
    }};
}

/// Generate `pub fn register() -> Router` from route definitions
#[macro_export]
macro_rules! routes {
    ( $( $route:expr ),* $(,)? ) => {
        pub fn register() -> $crate::Router {
            let mut router = $crate::Router::new();
            $(
                router = $route.register(router);
            )*
            router
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::middleware::Next;
    use async_trait::async_trait;
    use http::Method;

    struct Guard;

    #[async_trait]
    impl Middleware for Guard {
        async fn handle(&self, request: Request, next: Next) -> Response {
            next(request).await
        }
    }

    async fn index(_req: Request) -> Response {
        HttpResponse::new().ok()
    }

    #[test]
    fn group_middleware_is_keyed_per_method() {
        let group = GroupDef::__new_unchecked("/reports")
            .route(__route_impl(HttpMethod::Get, "/payroll", index))
            .route(__route_impl(HttpMethod::Post, "/payroll", index).middleware(Guard))
            .middleware(Guard);
        let router = group.register(Router::new());

        let get = router.match_route(&Method::GET, "/reports/payroll").ok().unwrap();
        let post = router.match_route(&Method::POST, "/reports/payroll").ok().unwrap();
        assert_eq!(get.middleware.len(), 1);
        assert_eq!(post.middleware.len(), 2);
    }

    #[test]
    fn slash_prefix_keeps_paths() {
        let router = GroupDef::__new_unchecked("/")
            .route(__route_impl(HttpMethod::Get, "/me", index))
            .register(Router::new());
        assert!(router.match_route(&Method::GET, "/me").is_ok());
    }
}
