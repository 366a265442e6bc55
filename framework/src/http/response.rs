use crate::error::{FrameworkError, GENERIC_ERROR_MESSAGE};
use crate::inertia::InertiaContext;
use bytes::Bytes;
use http_body_util::Full;

/// Cookie carrying a one-shot flash message to the next page
pub const FLASH_COOKIE: &str = "campus_flash";

/// HTTP response builder
#[derive(Debug)]
pub struct HttpResponse {
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
}

/// Handler result; `Err` short-circuits with an already-built response
pub type Response = Result<HttpResponse, HttpResponse>;

impl HttpResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            body: String::new(),
            headers: Vec::new(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new()
            .body(body)
            .header("Content-Type", "text/plain; charset=utf-8")
    }

    pub fn json(body: serde_json::Value) -> Self {
        Self::new()
            .body(body.to_string())
            .header("Content-Type", "application/json")
    }

    pub fn html(body: impl Into<String>) -> Self {
        Self::new()
            .body(body)
            .header("Content-Type", "text/html; charset=utf-8")
    }

    /// CSV attachment download
    pub fn csv(filename: &str, body: impl Into<String>) -> Self {
        let filename: String = filename
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect();
        Self::new()
            .body(body)
            .header("Content-Type", "text/csv; charset=utf-8")
            .header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            )
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn ok(self) -> Response {
        Ok(self)
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body_str(&self) -> &str {
        &self.body
    }

    /// Body parsed as JSON (`Value::Null` when it is not JSON)
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }

    /// First header with the given name (case-insensitive)
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Convert to a hyper response; invalid headers degrade to a bare 500
    pub fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let mut builder = hyper::Response::builder().status(self.status);
        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|err| {
                tracing::error!(error = %err, "invalid response parts");
                let mut fallback = hyper::Response::new(Full::new(Bytes::from_static(
                    GENERIC_ERROR_MESSAGE.as_bytes(),
                )));
                *fallback.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Extension trait for chaining on a `Response`
pub trait ResponseExt {
    fn status(self, code: u16) -> Self;
    fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self;
}

impl ResponseExt for Response {
    fn status(self, code: u16) -> Self {
        self.map(|r| r.status(code))
    }

    fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|r| r.header(name, value))
    }
}

/// Redirect response builder with optional flash message
pub struct Redirect {
    location: String,
    query_params: Vec<(String, String)>,
    status: u16,
    flash: Option<(&'static str, String)>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            location: path.into(),
            query_params: Vec::new(),
            status: 302,
            flash: None,
        }
    }

    /// Redirect to the referring page, or `/` when there is none
    pub fn back() -> Self {
        Self::to(InertiaContext::back_url())
    }

    /// Redirect to a named route; unknown names fall back to `/`
    ///
    /// ```rust,ignore
    /// Redirect::route("students.show", &[("id", &id.to_string())])
    /// ```
    pub fn route(name: &str, params: &[(&str, &str)]) -> Self {
        let location = crate::routing::route(name, params).unwrap_or_else(|| {
            tracing::warn!(route = name, "redirect to unknown route");
            "/".to_string()
        });
        Self::to(location)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query_params.push((key.to_string(), value.into()));
        self
    }

    /// Flash a success message for the next page
    pub fn with_success(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(("success", message.into()));
        self
    }

    /// Flash an error message for the next page
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.flash = Some(("error", message.into()));
        self
    }

    fn build_url(&self) -> String {
        if self.query_params.is_empty() {
            return self.location.clone();
        }
        let query = serde_urlencoded::to_string(&self.query_params).unwrap_or_default();
        format!("{}?{}", self.location, query)
    }

    pub fn into_response(self) -> HttpResponse {
        let mut response = HttpResponse::new()
            .status(self.status)
            .header("Location", self.build_url());
        if let Some((kind, message)) = &self.flash {
            let value = serde_urlencoded::to_string(&[(*kind, message.as_str())]).unwrap_or_default();
            response = response.header(
                "Set-Cookie",
                format!("{}={}; Path=/; HttpOnly; SameSite=Lax", FLASH_COOKIE, value),
            );
        }
        response
    }
}

impl From<Redirect> for Response {
    fn from(redirect: Redirect) -> Response {
        Ok(redirect.into_response())
    }
}

impl From<Redirect> for HttpResponse {
    fn from(redirect: Redirect) -> HttpResponse {
        redirect.into_response()
    }
}

/// Render a `FrameworkError` for the current client
///
/// Server errors are logged and hidden behind a generic message: JSON
/// clients get a 500 body, page clients are sent back with a flash error.
/// Validation errors always answer 422 with the field map.
impl From<FrameworkError> for HttpResponse {
    fn from(err: FrameworkError) -> HttpResponse {
        if err.is_server_error() {
            tracing::error!(error = %err, path = %InertiaContext::current_path(), "request failed");
            if InertiaContext::wants_page() {
                return Redirect::back().with_error(GENERIC_ERROR_MESSAGE).into_response();
            }
            return HttpResponse::json(serde_json::json!({ "message": GENERIC_ERROR_MESSAGE }))
                .status(500);
        }

        let body = match &err {
            FrameworkError::Validation(errors) => errors.to_json(),
            _ => serde_json::json!({ "message": err.to_string() }),
        };
        HttpResponse::json(body).status(err.status_code())
    }
}

impl From<crate::error::AppError> for HttpResponse {
    fn from(err: crate::error::AppError) -> HttpResponse {
        FrameworkError::from(err).into()
    }
}

impl From<sea_orm::DbErr> for HttpResponse {
    fn from(err: sea_orm::DbErr) -> HttpResponse {
        FrameworkError::from(err).into()
    }
}

impl From<serde_json::Error> for HttpResponse {
    fn from(err: serde_json::Error) -> HttpResponse {
        FrameworkError::from(err).into()
    }
}
