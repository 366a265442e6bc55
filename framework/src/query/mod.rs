//! Table queries: search, filters, sorting, trashed toggle and pagination
//!
//! Every listing endpoint parses a `TableQuery` from the query string and
//! hands it to a `TableSpec` describing what that listing allows.

mod config;
mod params;
mod table;

pub use config::TableConfig;
pub use params::{SortDirection, TableQuery};
pub use table::{escape_like, related_count, FilterKind, PageMeta, Paginated, TableSpec};

use crate::config::Config;
use crate::http::Request;

impl TableQuery {
    /// Parse the request's query string with the registered `TableConfig`
    pub fn from_request(request: &Request) -> Self {
        let config = Config::get::<TableConfig>().unwrap_or_else(TableConfig::from_env);
        Self::from_query_string(request.query_string(), &config)
    }
}
