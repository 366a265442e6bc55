use crate::config::{Config, ServerConfig};
use crate::container::App;
use crate::http::{collect_body, HttpResponse, Request};
use crate::inertia::InertiaContext;
use crate::middleware::{Middleware, MiddlewareChain, MiddlewareRegistry};
use crate::routing::{RouteMiss, Router};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Server {
    router: Arc<Router>,
    middleware: Arc<MiddlewareRegistry>,
    host: String,
    port: u16,
    max_body_size: usize,
}

impl Server {
    /// Server without global middleware, as used by tests
    pub fn new(router: impl Into<Router>) -> Self {
        let config = ServerConfig::default();
        Self {
            router: Arc::new(router.into()),
            middleware: Arc::new(MiddlewareRegistry::new()),
            host: config.host,
            port: config.port,
            max_body_size: config.max_body_size,
        }
    }

    /// Server configured from `ServerConfig` with the global middleware
    pub fn from_config(router: impl Into<Router>) -> Self {
        App::init();

        let config = Config::get::<ServerConfig>().unwrap_or_else(ServerConfig::from_env);
        Self {
            router: Arc::new(router.into()),
            middleware: Arc::new(MiddlewareRegistry::from_global()),
            host: config.host,
            port: config.port,
            max_body_size: config.max_body_size,
        }
    }

    /// Add global middleware (runs on every request)
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        let registry = (*self.middleware).clone().append(middleware);
        self.middleware = Arc::new(registry);
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Dispatch a request through middleware and routing
    ///
    /// Every failure, including routing misses, becomes a response here.
    pub async fn handle(&self, request: Request) -> HttpResponse {
        let ctx = InertiaContext::from_request(&request);
        ctx.scope(dispatch(
            self.router.clone(),
            self.middleware.clone(),
            request,
        ))
        .await
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = format!("{}:{}", self.host, self.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "server listening");

        let server = Arc::new(self);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                _ = &mut shutdown => {
                    tracing::info!("shutting down");
                    return Ok(());
                }
            };
            let io = TokioIo::new(stream);
            let server = server.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                    let server = server.clone();
                    async move {
                        let (parts, body) = req.into_parts();
                        let response = match collect_body(body, server.max_body_size).await {
                            Ok(bytes) => server.handle(Request::from_parts(parts, bytes)).await,
                            Err(err) => HttpResponse::from(err),
                        };
                        Ok::<_, Infallible>(response.into_hyper())
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(%peer, error = %err, "connection closed with error");
                }
            });
        }
    }
}

async fn dispatch(
    router: Arc<Router>,
    middleware_registry: Arc<MiddlewareRegistry>,
    request: Request,
) -> HttpResponse {
    let method = request.method().clone();
    let path = request.path().to_string();

    match router.match_route(&method, &path) {
        Ok(matched) => {
            let request = request.with_params(matched.params);

            let mut chain = MiddlewareChain::new();
            chain.extend(middleware_registry.global_middleware().iter().cloned());
            chain.extend(matched.middleware);

            chain
                .execute(request, matched.handler)
                .await
                .unwrap_or_else(|e| e)
        }
        Err(RouteMiss::MethodNotAllowed) => {
            HttpResponse::json(serde_json::json!({ "message": "Method not allowed." }))
                .status(405)
        }
        Err(RouteMiss::NotFound) => {
            HttpResponse::json(serde_json::json!({ "message": "Not found." })).status(404)
        }
    }
}
