use crate::config::env::{env, Environment};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application name, used as the page title
    pub name: String,
    pub environment: Environment,
    pub debug: bool,
    /// Public base URL, used in mail links
    pub url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            name: env("APP_NAME", "Campus".to_string()),
            environment: Environment::detect(),
            debug: env("APP_DEBUG", false),
            url: env("APP_URL", "http://localhost:8080".to_string()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
