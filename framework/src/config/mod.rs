//! Configuration
//!
//! `.env` loading with environment precedence plus a typed repository. Each
//! subsystem owns a config struct with a `from_env()` constructor; the
//! application registers them at startup and reads them back by type.
//!
//! ```rust,no_run
//! use campus::{Config, ServerConfig};
//!
//! Config::init(std::path::Path::new("."));
//! let server = Config::get::<ServerConfig>().unwrap_or_else(ServerConfig::from_env);
//! println!("listening on port {}", server.port);
//! ```

pub mod env;
pub mod providers;
pub mod repository;

pub use env::{env, env_optional, load_dotenv, Environment};
pub use providers::{AppConfig, ServerConfig};

use std::path::Path;

/// Config facade
pub struct Config;

impl Config {
    /// Load `.env` files and register the framework's default configs
    pub fn init(project_root: &Path) -> Environment {
        let env = env::load_dotenv(project_root);

        repository::register(AppConfig::from_env());
        repository::register(ServerConfig::from_env());
        repository::register(crate::database::DatabaseConfig::from_env());
        repository::register(crate::query::TableConfig::from_env());
        repository::register(crate::queue::QueueConfig::from_env());
        repository::register(crate::notification::MailConfig::from_env());
        repository::register(crate::inertia::InertiaConfig::from_env());

        env
    }

    /// Get a typed config struct from the repository
    pub fn get<T: std::any::Any + Send + Sync + Clone + 'static>() -> Option<T> {
        repository::get::<T>()
    }

    /// Register a config struct, replacing any previous value of the same type
    pub fn register<T: std::any::Any + Send + Sync + 'static>(config: T) {
        repository::register(config);
    }

    pub fn has<T: std::any::Any + 'static>() -> bool {
        repository::has::<T>()
    }

    /// Environment from AppConfig if registered, otherwise from APP_ENV
    pub fn environment() -> Environment {
        Config::get::<AppConfig>()
            .map(|c| c.environment)
            .unwrap_or_else(Environment::detect)
    }

    pub fn is_production() -> bool {
        Self::environment().is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct GradingConfig {
        pass_mark: u8,
    }

    #[test]
    fn registers_and_reads_back_by_type() {
        assert!(!Config::has::<GradingConfig>());
        Config::register(GradingConfig { pass_mark: 40 });
        assert_eq!(
            Config::get::<GradingConfig>(),
            Some(GradingConfig { pass_mark: 40 })
        );
        Config::register(GradingConfig { pass_mark: 50 });
        assert_eq!(Config::get::<GradingConfig>().map(|c| c.pass_mark), Some(50));
    }
}
