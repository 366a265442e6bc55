use crate::config::env;

/// Page size policy shared by every listing
///
/// # Environment Variables
///
/// - `TABLE_DEFAULT_PER_PAGE` - used when `per_page` is absent (default: 15)
/// - `TABLE_MIN_PER_PAGE` - smaller requests are raised to this (default: 10)
/// - `TABLE_MAX_PER_PAGE` - larger requests are lowered to this (default: 200)
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub default_per_page: u64,
    pub min_per_page: u64,
    pub max_per_page: u64,
}

impl TableConfig {
    pub fn from_env() -> Self {
        let min_per_page = env("TABLE_MIN_PER_PAGE", 10u64).max(1);
        let max_per_page = env("TABLE_MAX_PER_PAGE", 200u64).max(min_per_page);
        Self {
            default_per_page: env("TABLE_DEFAULT_PER_PAGE", 15u64),
            min_per_page,
            max_per_page,
        }
    }

    /// Clamp a requested page size into `[min_per_page, max_per_page]`
    pub fn clamp(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_per_page)
            .clamp(self.min_per_page, self.max_per_page)
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_requested_page_size() {
        let config = TableConfig {
            default_per_page: 15,
            min_per_page: 10,
            max_per_page: 200,
        };
        assert_eq!(config.clamp(None), 15);
        assert_eq!(config.clamp(Some(3)), 10);
        assert_eq!(config.clamp(Some(50)), 50);
        assert_eq!(config.clamp(Some(5000)), 200);
    }
}
