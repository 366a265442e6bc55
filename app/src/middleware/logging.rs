use std::time::Instant;

use campus::{async_trait, Middleware, Next, Request, Response};

/// Logs method, path, status and duration of every request
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, request: Request, next: Next) -> Response {
        let method = request.method().clone();
        let path = request.path().to_string();
        let started = Instant::now();

        let response = next(request).await;

        let status = match &response {
            Ok(r) | Err(r) => r.status_code(),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if status >= 500 {
            tracing::warn!(%method, %path, status, elapsed_ms, "request failed");
        } else {
            tracing::info!(%method, %path, status, elapsed_ms, "request");
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus::{HttpResponse, Server};
    use http::Method;

    async fn teapot(_req: Request) -> Response {
        HttpResponse::text("short and stout").status(418).ok()
    }

    #[tokio::test]
    async fn passes_responses_through() {
        let server = Server::new(campus::Router::new().get("/pot", teapot).middleware(LoggingMiddleware));
        let response = server.handle(Request::fake(Method::GET, "/pot")).await;

        assert_eq!(response.status_code(), 418);
        assert_eq!(response.body_str(), "short and stout");
    }
}
