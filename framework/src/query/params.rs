use serde::Serialize;
use std::collections::BTreeMap;

use super::config::TableConfig;
use crate::database::Trashed;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` (any case) is descending, anything else ascending
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Listing parameters taken from the query string
///
/// Accepts both snake_case and camelCase spellings (`per_page`/`perPage`,
/// `sort_order`/`sortOrder`, `with_trashed`/`withTrashed`) and both
/// `filters[key]` and `filter[key]`. Malformed values fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub search: Option<String>,
    pub sort: Option<String>,
    pub direction: SortDirection,
    pub page: u64,
    pub per_page: u64,
    pub filters: BTreeMap<String, String>,
    pub trashed: Trashed,
}

impl TableQuery {
    pub fn from_query_string(query: &str, config: &TableConfig) -> Self {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();

        let mut search = None;
        let mut sort = None;
        let mut direction = SortDirection::Asc;
        let mut page = 1;
        let mut per_page = None;
        let mut filters = BTreeMap::new();
        let mut with_trashed = false;
        let mut only_trashed = false;

        for (key, value) in pairs {
            match key.as_str() {
                "search" => search = non_blank(&value),
                "sort" => sort = non_blank(&value),
                "sort_order" | "sortOrder" | "direction" => direction = SortDirection::parse(&value),
                "page" => page = value.trim().parse::<u64>().ok().filter(|p| *p > 0).unwrap_or(1),
                "per_page" | "perPage" => per_page = value.trim().parse::<u64>().ok(),
                "with_trashed" | "withTrashed" => with_trashed = truthy(&value),
                "only_trashed" | "onlyTrashed" => only_trashed = truthy(&value),
                _ => {
                    if let Some(name) = filter_key(&key) {
                        if let Some(value) = non_blank(&value) {
                            filters.insert(name.to_string(), value);
                        }
                    }
                }
            }
        }

        let trashed = if only_trashed {
            Trashed::Only
        } else if with_trashed {
            Trashed::With
        } else {
            Trashed::Without
        };

        Self {
            search,
            sort,
            direction,
            page,
            per_page: config.clamp(per_page),
            filters,
            trashed,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// Parameters echoed back to the client so the UI can keep its state
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "search": self.search,
            "sort": self.sort,
            "sort_order": self.direction,
            "page": self.page,
            "per_page": self.per_page,
            "filters": self.filters,
            "with_trashed": self.trashed == Trashed::With,
            "only_trashed": self.trashed == Trashed::Only,
        })
    }
}

impl Default for TableQuery {
    fn default() -> Self {
        Self::from_query_string("", &TableConfig::default())
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// `filters[status]` or `filter[status]` -> `status`
fn filter_key(key: &str) -> Option<&str> {
    let inner = key
        .strip_prefix("filters[")
        .or_else(|| key.strip_prefix("filter["))?;
    inner.strip_suffix(']').filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> TableConfig {
        TableConfig {
            default_per_page: 15,
            min_per_page: 10,
            max_per_page: 200,
        }
    }

    #[test]
    fn parses_both_spellings() {
        let query = TableQuery::from_query_string(
            "search=%20ada%20&sort=name&sortOrder=DESC&perPage=25&page=3&filters%5Bstatus%5D=active&filter[gender]=f&withTrashed=1",
            &config(),
        );

        assert_eq!(query.search.as_deref(), Some("ada"));
        assert_eq!(query.sort.as_deref(), Some("name"));
        assert_eq!(query.direction, SortDirection::Desc);
        assert_eq!(query.per_page, 25);
        assert_eq!(query.page, 3);
        assert_eq!(query.offset(), 50);
        assert_eq!(query.filters.get("status").map(String::as_str), Some("active"));
        assert_eq!(query.filters.get("gender").map(String::as_str), Some("f"));
        assert_eq!(query.trashed, Trashed::With);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let query = TableQuery::from_query_string(
            "page=-2&per_page=lots&sort_order=sideways&search=%20%20&filters[]=x",
            &config(),
        );

        assert_eq!(query.page, 1);
        assert_eq!(query.per_page, 15);
        assert_eq!(query.direction, SortDirection::Asc);
        assert_eq!(query.search, None);
        assert!(query.filters.is_empty());
    }

    #[test]
    fn page_size_is_clamped_and_only_trashed_wins() {
        let query =
            TableQuery::from_query_string("per_page=100000&with_trashed=1&only_trashed=true", &config());
        assert_eq!(query.per_page, 200);
        assert_eq!(query.trashed, Trashed::Only);
        assert_eq!(query.to_json()["only_trashed"], true);
    }
}
