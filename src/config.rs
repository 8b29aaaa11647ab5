//! Request parsing configuration
//!
//! The names of the query parameters and the pagination defaults are configurable. A
//! [`ToolkitConfig`] deserializes from any serde source, so it can live in the application's
//! settings file:
//!
//! ```toml
//! [api.fields]
//! with = "include"
//! order_by = "sort"
//!
//! [api.fields.filters]
//! source = "nested"
//! key = "filter"
//!
//! [api.pagination]
//! default_count = 25
//! max_count = 100
//! ```

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_COUNT: u64 = 15;

/// Where filter values are read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FilterSource {
    /// `?status=published`
    #[default]
    TopLevel,
    /// `?filters[status]=published`
    Nested { key: String },
}

impl FilterSource {
    /// Query parameter that carries the value of filter `name`
    #[must_use]
    pub fn parameter(&self, name: &str) -> String {
        match self {
            Self::TopLevel => name.to_string(),
            Self::Nested { key } => format!("{key}[{name}]"),
        }
    }
}

/// Names of the query parameters read by the request adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestFields {
    pub with: String,
    pub order_by: String,
    pub page: String,
    pub count: String,
    pub filters: FilterSource,
}

impl Default for RequestFields {
    fn default() -> Self {
        Self {
            with: "with".to_string(),
            order_by: "order_by".to_string(),
            page: "page".to_string(),
            count: "count".to_string(),
            filters: FilterSource::TopLevel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub default_page: u64,
    pub default_count: u64,
    /// Requests above this page size are clamped to it
    pub max_count: Option<u64>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: DEFAULT_PAGE,
            default_count: DEFAULT_COUNT,
            max_count: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub fields: RequestFields,
    pub pagination: PaginationConfig,
}

impl ToolkitConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_inclusion_field(mut self, name: impl Into<String>) -> Self {
        self.fields.with = name.into();
        self
    }

    #[must_use]
    pub fn with_sort_field(mut self, name: impl Into<String>) -> Self {
        self.fields.order_by = name.into();
        self
    }

    #[must_use]
    pub fn with_page_fields(mut self, page: impl Into<String>, count: impl Into<String>) -> Self {
        self.fields.page = page.into();
        self.fields.count = count.into();
        self
    }

    /// Read filters from `key[name]` instead of top-level parameters
    #[must_use]
    pub fn with_nested_filters(mut self, key: impl Into<String>) -> Self {
        self.fields.filters = FilterSource::Nested { key: key.into() };
        self
    }

    #[must_use]
    pub fn with_default_count(mut self, count: u64) -> Self {
        self.pagination.default_count = count.max(1);
        self
    }

    #[must_use]
    pub fn with_max_count(mut self, count: u64) -> Self {
        self.pagination.max_count = Some(count.max(1));
        self
    }
}
