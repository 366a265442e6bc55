use crate::http::{Request, FLASH_COOKIE};
use std::future::Future;

/// Per-request state needed while rendering responses
///
/// The server runs each request inside `InertiaContext::scope`, so handlers
/// and error conversion can ask what kind of client they are answering
/// without threading the request through.
#[derive(Clone, Default, Debug)]
pub struct InertiaContext {
    /// Requested path including query string
    pub path: String,
    pub is_inertia: bool,
    pub is_get: bool,
    pub version: Option<String>,
    /// API client asking for plain JSON
    pub wants_json: bool,
    /// Referring path, used by `Redirect::back`
    pub back_url: Option<String>,
    /// Flash message left by the previous redirect
    pub flash: Option<serde_json::Value>,
}

tokio::task_local! {
    static CONTEXT: InertiaContext;
}

impl InertiaContext {
    pub fn from_request(req: &Request) -> Self {
        Self {
            path: req.full_path(),
            is_inertia: req.is_inertia(),
            is_get: req.method() == http::Method::GET,
            version: req.inertia_version().map(str::to_string),
            wants_json: req.wants_json(),
            back_url: req.header("referer").and_then(referer_path),
            flash: req.cookie(FLASH_COOKIE).and_then(parse_flash),
        }
    }

    /// Run a future with this context installed
    pub async fn scope<F: Future>(self, fut: F) -> F::Output {
        CONTEXT.scope(self, fut).await
    }

    pub fn current() -> Option<Self> {
        CONTEXT.try_with(|ctx| ctx.clone()).ok()
    }

    pub fn current_path() -> String {
        CONTEXT.try_with(|c| c.path.clone()).unwrap_or_default()
    }

    /// True outside of a request (jobs, CLI) as well
    pub fn wants_json() -> bool {
        CONTEXT.try_with(|c| c.wants_json).unwrap_or(true)
    }

    /// Browser or Inertia client expecting pages and redirects
    pub fn wants_page() -> bool {
        !Self::wants_json()
    }

    pub fn back_url() -> String {
        CONTEXT
            .try_with(|c| c.back_url.clone())
            .ok()
            .flatten()
            .unwrap_or_else(|| "/".to_string())
    }
}

/// Path component of a Referer header; absolute URLs lose their origin
fn referer_path(referer: &str) -> Option<String> {
    if referer.starts_with('/') {
        return Some(referer.to_string());
    }
    let (_, rest) = referer.split_once("://")?;
    Some(rest.find('/').map(|i| rest[i..].to_string()).unwrap_or_else(|| "/".to_string()))
}

fn parse_flash(raw: &str) -> Option<serde_json::Value> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).ok()?;
    if pairs.is_empty() {
        return None;
    }
    let map = pairs
        .into_iter()
        .map(|(k, v)| (k, serde_json::Value::String(v)))
        .collect::<serde_json::Map<_, _>>();
    Some(serde_json::Value::Object(map))
}
