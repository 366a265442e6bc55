use crate::config::{env, Environment};

/// Inertia page rendering settings
#[derive(Debug, Clone)]
pub struct InertiaConfig {
    /// Vite dev server URL (e.g. "http://localhost:5173")
    pub vite_dev_server: String,
    /// Frontend entry point served by Vite in development
    pub entry_point: String,
    /// Asset version; a mismatch forces a full page reload
    pub version: String,
    /// Serve scripts from the Vite dev server instead of /assets
    pub development: bool,
}

impl InertiaConfig {
    pub fn from_env() -> Self {
        Self {
            vite_dev_server: env("VITE_DEV_SERVER", "http://localhost:5173".to_string()),
            entry_point: env("INERTIA_ENTRY_POINT", "src/main.tsx".to_string()),
            version: env("ASSET_VERSION", "1".to_string()),
            development: Environment::detect().is_development(),
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn production(mut self) -> Self {
        self.development = false;
        self
    }
}

impl Default for InertiaConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
