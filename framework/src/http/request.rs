use super::body::{parse_form, parse_json};
use super::form_request::FormRequest;
use super::ParamError;
use crate::error::FrameworkError;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::str::FromStr;

/// HTTP request with its body already buffered
///
/// The server collects the body before dispatch, so handlers and
/// middleware can read headers, route parameters and body without consuming
/// the request.
pub struct Request {
    parts: Parts,
    body: Bytes,
    params: HashMap<String, String>,
}

impl Request {
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            parts,
            body,
            params: HashMap::new(),
        }
    }

    /// Build a request without a connection, for tests and internal dispatch
    ///
    /// ```rust,ignore
    /// let req = Request::fake(Method::POST, "/students")
    ///     .with_header("Authorization", "Bearer abc")
    ///     .with_json(json!({ "first_name": "Ada" }));
    /// ```
    pub fn fake(method: Method, uri: &str) -> Self {
        let (parts, _) = http::Request::builder()
            .method(method)
            .uri(Uri::from_str(uri).unwrap_or_else(|_| Uri::from_static("/")))
            .body(())
            .unwrap_or_default()
            .into_parts();
        Self::from_parts(parts, Bytes::new())
    }

    /// Add a header (invalid names or values are ignored)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_str(name),
            HeaderValue::from_str(value),
        ) {
            self.parts.headers.append(name, value);
        }
        self
    }

    /// Set a JSON body and the matching content type
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self.with_header("content-type", "application/json")
    }

    /// Set a form-urlencoded body and the matching content type
    pub fn with_form(mut self, body: &str) -> Self {
        self.body = Bytes::from(body.to_string());
        self.with_header("content-type", "application/x-www-form-urlencoded")
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Raw query string without the leading `?`
    pub fn query_string(&self) -> &str {
        self.parts.uri.query().unwrap_or("")
    }

    /// Path plus query string, as the client requested it
    pub fn full_path(&self) -> String {
        match self.parts.uri.query() {
            Some(q) if !q.is_empty() => format!("{}?{}", self.path(), q),
            _ => self.path().to_string(),
        }
    }

    /// Deserialize the query string
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        serde_urlencoded::from_str(self.query_string())
            .map_err(|e| FrameworkError::validation("query", e.to_string()))
    }

    /// Get a route parameter by name (e.g. `/students/{id}`)
    pub fn param(&self, name: &str) -> Result<&str, ParamError> {
        self.params
            .get(name)
            .map(|s| s.as_str())
            .ok_or_else(|| ParamError {
                param_name: name.to_string(),
            })
    }

    /// Get a route parameter parsed into `T`; unparsable values are a 400
    pub fn param_as<T: FromStr>(&self, name: &str) -> Result<T, FrameworkError> {
        let raw = self.param(name)?;
        raw.parse::<T>()
            .map_err(|_| FrameworkError::param_parse(raw, std::any::type_name::<T>()))
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Value of a cookie sent by the client
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.parts
            .headers
            .get_all("cookie")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Bearer token from the Authorization header
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Whether this is an Inertia XHR request
    pub fn is_inertia(&self) -> bool {
        self.header("X-Inertia").map(|v| v == "true").unwrap_or(false)
    }

    pub fn inertia_version(&self) -> Option<&str> {
        self.header("X-Inertia-Version")
    }

    /// Whether the client asked for JSON rather than a page
    ///
    /// Inertia visits also send `Accept: application/json`, but they expect
    /// page objects, so they never count as JSON clients.
    pub fn wants_json(&self) -> bool {
        if self.is_inertia() {
            return false;
        }
        self.header("accept")
            .map(|accept| accept.contains("application/json") || accept.contains("+json"))
            .unwrap_or(false)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Parse the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        parse_json(&self.body)
    }

    /// Parse the body as form-urlencoded
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        parse_form(&self.body)
    }

    /// Parse the body according to its Content-Type (JSON by default)
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, FrameworkError> {
        match self.content_type() {
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => self.form(),
            _ => self.json(),
        }
    }

    /// Parse, authorize and validate a form request
    pub fn validated<T: FormRequest>(&self) -> Result<T, FrameworkError> {
        T::extract(self)
    }

    /// Attach typed request-scoped data (e.g. the authenticated user)
    pub fn insert_extension<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.parts.extensions.insert(value);
    }

    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.parts.extensions.get::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Listing {
        page: u32,
    }

    #[test]
    fn reads_query_params_and_cookies() {
        let req = Request::fake(Method::GET, "/students?page=3&search=ada")
            .with_header("Cookie", "campus_token=abc123; theme=dark");

        assert_eq!(req.query_string(), "page=3&search=ada");
        assert_eq!(req.query::<Listing>().unwrap().page, 3);
        assert_eq!(req.cookie("campus_token"), Some("abc123"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("missing"), None);
        assert_eq!(req.full_path(), "/students?page=3&search=ada");
    }

    #[test]
    fn parses_typed_params() {
        let mut params = HashMap::new();
        params.insert("id".to_string(), "42".to_string());
        params.insert("slug".to_string(), "x1".to_string());
        let req = Request::fake(Method::GET, "/students/42").with_params(params);

        assert_eq!(req.param_as::<i64>("id").unwrap(), 42);
        assert_eq!(req.param_as::<i64>("slug").unwrap_err().status_code(), 400);
        assert!(req.param("nope").is_err());
    }

    #[test]
    fn distinguishes_json_clients_from_inertia_visits() {
        let api = Request::fake(Method::GET, "/").with_header("Accept", "application/json");
        let inertia = Request::fake(Method::GET, "/")
            .with_header("Accept", "application/json")
            .with_header("X-Inertia", "true");
        let browser = Request::fake(Method::GET, "/").with_header("Accept", "text/html");

        assert!(api.wants_json());
        assert!(!inertia.wants_json());
        assert!(inertia.is_inertia());
        assert!(!browser.wants_json());
    }

    #[test]
    fn extracts_bearer_tokens() {
        let req = Request::fake(Method::GET, "/").with_header("Authorization", "Bearer  tok ");
        assert_eq!(req.bearer_token(), Some("tok"));
        let basic = Request::fake(Method::GET, "/").with_header("Authorization", "Basic x");
        assert_eq!(basic.bearer_token(), None);
    }
}
