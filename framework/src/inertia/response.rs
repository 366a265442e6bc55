use super::config::InertiaConfig;
use super::context::InertiaContext;
use crate::config::{AppConfig, Config};
use crate::http::{HttpResponse, Response, FLASH_COOKIE};

/// Inertia page object, rendered as JSON or as the HTML shell
pub struct InertiaResponse {
    component: String,
    props: serde_json::Value,
    url: String,
    config: InertiaConfig,
}

impl InertiaResponse {
    pub fn new(component: impl Into<String>, props: serde_json::Value, url: String) -> Self {
        Self {
            component: component.into(),
            props,
            url,
            config: InertiaConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InertiaConfig) -> Self {
        self.config = config;
        self
    }

    fn page(&self) -> serde_json::Value {
        serde_json::json!({
            "component": self.component,
            "props": self.props,
            "url": self.url,
            "version": self.config.version,
        })
    }

    /// Page object for XHR visits (`X-Inertia: true`)
    pub fn to_json_response(&self) -> HttpResponse {
        HttpResponse::json(self.page())
            .header("X-Inertia", "true")
            .header("Vary", "X-Inertia")
    }

    /// HTML shell for first visits, with the page object in `data-page`
    pub fn to_html_response(&self) -> HttpResponse {
        let page_json = escape_attribute(&self.page().to_string());
        let title = Config::get::<AppConfig>()
            .map(|c| c.name)
            .unwrap_or_else(|| "Campus".to_string());

        let scripts = if self.config.development {
            let dev = &self.config.vite_dev_server;
            format!(
                r#"<script type="module" src="{dev}/@vite/client"></script>
    <script type="module" src="{dev}/{entry}"></script>"#,
                dev = dev,
                entry = self.config.entry_point
            )
        } else {
            r#"<script type="module" src="/assets/main.js"></script>
    <link rel="stylesheet" href="/assets/main.css">"#
                .to_string()
        };

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    {scripts}
</head>
<body>
    <div id="app" data-page="{page}"></div>
</body>
</html>"#,
            title = escape_attribute(&title),
            scripts = scripts,
            page = page_json
        );

        HttpResponse::html(html).header("Vary", "X-Inertia")
    }

    /// 409 telling the client to reload because assets changed
    pub fn version_conflict(url: &str) -> HttpResponse {
        HttpResponse::new()
            .status(409)
            .header("X-Inertia-Location", url)
    }
}

fn escape_attribute(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Inertia facade used by controllers
pub struct Inertia;

impl Inertia {
    /// Render a page component with props for the current client
    ///
    /// API clients (`Accept: application/json`) receive the props as plain
    /// JSON. Inertia visits receive the page object, first visits the HTML
    /// shell. A pending flash message is exposed as the `flash` prop and
    /// its cookie cleared.
    pub fn render(component: &str, props: serde_json::Value) -> Response {
        let ctx = InertiaContext::current().unwrap_or_default();
        if ctx.wants_json {
            return Ok(HttpResponse::json(props));
        }

        let config = Config::get::<InertiaConfig>().unwrap_or_else(InertiaConfig::from_env);
        if ctx.is_inertia && ctx.is_get {
            if let Some(version) = &ctx.version {
                if version != &config.version {
                    return Ok(InertiaResponse::version_conflict(&ctx.path));
                }
            }
        }

        let mut props = props;
        if let (Some(flash), serde_json::Value::Object(map)) = (&ctx.flash, &mut props) {
            map.insert("flash".to_string(), flash.clone());
        }

        let page = InertiaResponse::new(component, props, ctx.path.clone()).with_config(config);
        let mut response = if ctx.is_inertia {
            page.to_json_response()
        } else {
            page.to_html_response()
        };
        if ctx.flash.is_some() {
            response = response.header(
                "Set-Cookie",
                format!("{}=; Path=/; Max-Age=0", FLASH_COOKIE),
            );
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inertia_ctx() -> InertiaContext {
        InertiaContext {
            path: "/hostels".to_string(),
            is_inertia: true,
            is_get: true,
            version: Some(InertiaConfig::from_env().version),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn renders_page_object_with_flash() {
        let ctx = InertiaContext {
            flash: Some(json!({ "success": "Hostel created." })),
            ..inertia_ctx()
        };
        let response = ctx
            .scope(async { Inertia::render("Hostels/Index", json!({ "hostels": [] })) })
            .await
            .unwrap();

        assert_eq!(response.header_value("x-inertia"), Some("true"));
        let page = response.json_body();
        assert_eq!(page["component"], "Hostels/Index");
        assert_eq!(page["url"], "/hostels");
        assert_eq!(page["props"]["flash"]["success"], "Hostel created.");
        assert!(response
            .header_value("set-cookie")
            .unwrap()
            .contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn version_mismatch_forces_reload() {
        let ctx = InertiaContext {
            version: Some("stale".to_string()),
            ..inertia_ctx()
        };
        let response = ctx
            .scope(async { Inertia::render("Hostels/Index", json!({})) })
            .await
            .unwrap();

        assert_eq!(response.status_code(), 409);
        assert_eq!(response.header_value("x-inertia-location"), Some("/hostels"));
    }

    #[tokio::test]
    async fn first_visit_gets_escaped_html_shell() {
        let ctx = InertiaContext {
            path: "/notices".to_string(),
            ..Default::default()
        };
        let response = ctx
            .scope(async { Inertia::render("Notices/Index", json!({ "title": "<b>" })) })
            .await
            .unwrap();

        assert!(response.body_str().contains("data-page=\"{&quot;component&quot;"));
        assert!(!response.body_str().contains("<b>"));
    }

    #[tokio::test]
    async fn api_clients_get_plain_props() {
        let ctx = InertiaContext {
            wants_json: true,
            ..Default::default()
        };
        let response = ctx
            .scope(async { Inertia::render("Notices/Index", json!({ "notices": [1] })) })
            .await
            .unwrap();
        assert_eq!(response.json_body(), json!({ "notices": [1] }));
    }
}
