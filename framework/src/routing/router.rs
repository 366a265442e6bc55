use crate::http::{Request, Response};
use crate::middleware::{into_boxed, BoxedMiddleware, Middleware};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, OnceLock, RwLock};

/// Global registry mapping route names to path patterns
static ROUTE_REGISTRY: OnceLock<RwLock<HashMap<String, String>>> = OnceLock::new();

/// Register a route name -> path mapping
pub fn register_route_name(name: &str, path: &str) {
    let registry = ROUTE_REGISTRY.get_or_init(|| RwLock::new(HashMap::new()));
    if let Ok(mut map) = registry.write() {
        map.insert(name.to_string(), path.to_string());
    }
}

/// Generate a URL for a named route
///
/// ```rust,ignore
/// let url = route("students.show", &[("id", "12")]);
/// assert_eq!(url, Some("/students/12".to_string()));
/// ```
pub fn route(name: &str, params: &[(&str, &str)]) -> Option<String> {
    let registry = ROUTE_REGISTRY.get()?.read().ok()?;
    let mut url = registry.get(name)?.clone();
    for (key, value) in params {
        url = url.replace(&format!("{{{}}}", key), value);
    }
    Some(url)
}

/// Type alias for route handlers
pub type BoxedHandler =
    Box<dyn Fn(Request) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync>;

/// A registered endpoint: the handler plus the pattern it was registered under
#[derive(Clone)]
struct Endpoint {
    handler: Arc<BoxedHandler>,
    pattern: String,
}

/// Result of matching a request against the router
pub struct MatchedRoute {
    pub handler: Arc<BoxedHandler>,
    pub params: HashMap<String, String>,
    pub middleware: Vec<BoxedMiddleware>,
}

/// Outcome when no handler matched
#[derive(Debug, PartialEq, Eq)]
pub enum RouteMiss {
    NotFound,
    MethodNotAllowed,
}

/// HTTP Router with Laravel-like route registration
pub struct Router {
    get_routes: MatchitRouter<Endpoint>,
    post_routes: MatchitRouter<Endpoint>,
    put_routes: MatchitRouter<Endpoint>,
    delete_routes: MatchitRouter<Endpoint>,
    /// Middleware per "METHOD pattern"
    route_middleware: HashMap<String, Vec<BoxedMiddleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            get_routes: MatchitRouter::new(),
            post_routes: MatchitRouter::new(),
            put_routes: MatchitRouter::new(),
            delete_routes: MatchitRouter::new(),
            route_middleware: HashMap::new(),
        }
    }

    fn table(&self, method: &http::Method) -> Option<&MatchitRouter<Endpoint>> {
        match *method {
            http::Method::GET | http::Method::HEAD => Some(&self.get_routes),
            http::Method::POST => Some(&self.post_routes),
            http::Method::PUT => Some(&self.put_routes),
            http::Method::DELETE => Some(&self.delete_routes),
            _ => None,
        }
    }

    fn table_mut(&mut self, method: &http::Method) -> &mut MatchitRouter<Endpoint> {
        match *method {
            http::Method::POST => &mut self.post_routes,
            http::Method::PUT => &mut self.put_routes,
            http::Method::DELETE => &mut self.delete_routes,
            _ => &mut self.get_routes,
        }
    }

    /// Insert a pre-boxed handler; duplicate patterns are logged and skipped
    pub(crate) fn insert(&mut self, method: http::Method, path: &str, handler: Arc<BoxedHandler>) {
        let endpoint = Endpoint {
            handler,
            pattern: path.to_string(),
        };
        if let Err(err) = self.table_mut(&method).insert(path, endpoint) {
            tracing::warn!(%method, path, error = %err, "route not registered");
        }
    }

    pub(crate) fn add_middleware(
        &mut self,
        method: &http::Method,
        path: &str,
        middleware: BoxedMiddleware,
    ) {
        self.route_middleware
            .entry(middleware_key(method, path))
            .or_default()
            .push(middleware);
    }

    fn register<H, Fut>(mut self, method: http::Method, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: BoxedHandler = Box::new(move |req| Box::pin(handler(req)));
        self.insert(method.clone(), path, Arc::new(handler));
        RouteBuilder {
            router: self,
            last_path: path.to_string(),
            last_method: method,
        }
    }

    pub fn get<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.register(http::Method::GET, path, handler)
    }

    pub fn post<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.register(http::Method::POST, path, handler)
    }

    pub fn put<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.register(http::Method::PUT, path, handler)
    }

    pub fn delete<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.register(http::Method::DELETE, path, handler)
    }

    /// Match a request; a miss distinguishes unknown paths from wrong methods
    pub fn match_route(&self, method: &http::Method, path: &str) -> Result<MatchedRoute, RouteMiss> {
        let matched = self.table(method).and_then(|table| table.at(path).ok());

        let Some(matched) = matched else {
            let elsewhere = [
                &self.get_routes,
                &self.post_routes,
                &self.put_routes,
                &self.delete_routes,
            ]
            .iter()
            .any(|table| table.at(path).is_ok());
            return Err(if elsewhere {
                RouteMiss::MethodNotAllowed
            } else {
                RouteMiss::NotFound
            });
        };

        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let endpoint = matched.value;
        let method = if *method == http::Method::HEAD {
            http::Method::GET
        } else {
            method.clone()
        };

        Ok(MatchedRoute {
            handler: endpoint.handler.clone(),
            params,
            middleware: self
                .route_middleware
                .get(&middleware_key(&method, &endpoint.pattern))
                .cloned()
                .unwrap_or_default(),
        })
    }
}

fn middleware_key(method: &http::Method, path: &str) -> String {
    format!("{} {}", method, path)
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder returned after registering a route, enabling .name() chaining
pub struct RouteBuilder {
    pub(crate) router: Router,
    last_path: String,
    last_method: http::Method,
}

impl RouteBuilder {
    /// Name the most recently registered route
    pub fn name(self, name: &str) -> Router {
        register_route_name(name, &self.last_path);
        self.router
    }

    /// Apply middleware to the most recently registered route
    pub fn middleware<M: Middleware + 'static>(self, middleware: M) -> RouteBuilder {
        self.middleware_boxed(into_boxed(middleware))
    }

    pub fn middleware_boxed(mut self, middleware: BoxedMiddleware) -> RouteBuilder {
        self.router
            .add_middleware(&self.last_method, &self.last_path, middleware);
        self
    }

    pub fn get<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.get(path, handler)
    }

    pub fn post<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.post(path, handler)
    }

    pub fn put<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.put(path, handler)
    }

    pub fn delete<H, Fut>(self, path: &str, handler: H) -> RouteBuilder
    where
        H: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.router.delete(path, handler)
    }
}

impl From<RouteBuilder> for Router {
    fn from(builder: RouteBuilder) -> Self {
        builder.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use http::Method;

    async fn show(req: Request) -> Response {
        HttpResponse::text(req.param("id").unwrap_or_default().to_string()).ok()
    }

    async fn noop(_req: Request) -> Response {
        HttpResponse::new().ok()
    }

    #[tokio::test]
    async fn matches_params_and_names_routes() {
        let router: Router = Router::new()
            .get("/hostels/{id}", show)
            .name("hostels.show")
            .post("/hostels", noop)
            .into();

        let matched = router.match_route(&Method::GET, "/hostels/7").ok().unwrap();
        assert_eq!(matched.params.get("id").map(String::as_str), Some("7"));
        assert_eq!(
            route("hostels.show", &[("id", "7")]),
            Some("/hostels/7".to_string())
        );
    }

    #[test]
    fn distinguishes_not_found_from_wrong_method() {
        let router: Router = Router::new().post("/hostels", noop).into();

        assert_eq!(
            router.match_route(&Method::GET, "/hostels").err(),
            Some(RouteMiss::MethodNotAllowed)
        );
        assert_eq!(
            router.match_route(&Method::GET, "/vehicles").err(),
            Some(RouteMiss::NotFound)
        );
    }
}
