use std::path::Path;

/// Deployment environment, read from `APP_ENV`
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Development,
    Staging,
    Production,
    Testing,
    Custom(String),
}

impl Environment {
    /// Detect environment from APP_ENV or default to Local
    pub fn detect() -> Self {
        Self::parse(std::env::var("APP_ENV").ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") => Self::Production,
            Some("staging") => Self::Staging,
            Some("development") => Self::Development,
            Some("testing") => Self::Testing,
            Some("local") | None => Self::Local,
            Some(other) => Self::Custom(other.to_string()),
        }
    }

    /// Suffix used for `.env.{suffix}` files
    pub fn env_file_suffix(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Custom(name) => name.as_str(),
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Local or development
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Local | Self::Development)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.env_file_suffix())
    }
}

/// Load environment variables from .env files
///
/// Precedence, highest first:
/// 1. real environment variables
/// 2. `.env.{environment}.local`
/// 3. `.env.{environment}`
/// 4. `.env.local`
/// 5. `.env`
///
/// dotenvy never overwrites a variable that is already set, so the files are
/// loaded from most to least specific.
pub fn load_dotenv(project_root: &Path) -> Environment {
    let env = Environment::detect();
    let suffix = env.env_file_suffix();

    let _ = dotenvy::from_path(project_root.join(format!(".env.{}.local", suffix)));
    let _ = dotenvy::from_path(project_root.join(format!(".env.{}", suffix)));
    let _ = dotenvy::from_path(project_root.join(".env.local"));
    let _ = dotenvy::from_path(project_root.join(".env"));

    // APP_ENV may have been set by one of the files
    Environment::detect()
}

/// Get an environment variable, falling back to `default` when unset or unparsable
///
/// ```
/// use campus::config::env;
///
/// let port: u16 = env("SERVER_PORT", 8080);
/// ```
pub fn env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_optional(key).unwrap_or(default)
}

/// Get an optional environment variable; empty values count as unset
pub fn env_optional<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_environments() {
        assert_eq!(Environment::parse(Some("production")), Environment::Production);
        assert_eq!(Environment::parse(None), Environment::Local);
        assert_eq!(
            Environment::parse(Some("qa")),
            Environment::Custom("qa".to_string())
        );
        assert_eq!(Environment::Testing.to_string(), "testing");
    }

    #[test]
    fn env_falls_back_on_garbage() {
        std::env::set_var("CAMPUS_TEST_PORT", "not-a-number");
        assert_eq!(env("CAMPUS_TEST_PORT", 9000u16), 9000);
        std::env::set_var("CAMPUS_TEST_PORT", " 9100 ");
        assert_eq!(env("CAMPUS_TEST_PORT", 9000u16), 9100);
        std::env::remove_var("CAMPUS_TEST_PORT");
    }
}
