mod auth;

pub use auth::AuthConfig;

use campus::Config;

/// Register application configs; framework configs are registered by `Config::init`
pub fn register_all() {
    Config::register(AuthConfig::from_env());
}
