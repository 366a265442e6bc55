use campus::env;

/// Authentication settings
///
/// - `AUTH_TOKEN_TTL_HOURS` - lifetime of issued API tokens (default: 24)
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token_ttl_hours: i64,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            token_ttl_hours: env("AUTH_TOKEN_TTL_HOURS", 24i64).max(1),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
