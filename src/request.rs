//! # Request Adapter
//!
//! [`ResourceRequest`] normalizes the query string of one request into the values the pipeline
//! consumes: filter values, inclusion names, the sort directive and the page cursor. Parameter
//! names come from [`ToolkitConfig`]; nothing is invented for parameters that are absent, and
//! malformed pagination values fall back to the configured defaults instead of failing.
//!
//! As an axum extractor it reads an `Arc<ToolkitConfig>` from the request extensions when one
//! has been installed (e.g. with `Extension(Arc::new(config))`) and the default config otherwise.

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::config::{FilterSource, PaginationConfig, ToolkitConfig};
use crate::errors::ApiError;
use crate::filtering::{FilterValues, SortDirective};
use crate::pagination::Pagination;

#[derive(Debug, Clone)]
pub struct ResourceRequest {
    params: HashMap<String, String>,
    filter_source: FilterSource,
    inclusions: Vec<String>,
    sort: Option<SortDirective>,
    pagination: Pagination,
}

impl ResourceRequest {
    #[must_use]
    pub fn new(params: HashMap<String, String>, config: &ToolkitConfig) -> Self {
        let fields = &config.fields;
        let inclusions = parse_inclusions(non_empty(&params, &fields.with));
        let sort = non_empty(&params, &fields.order_by).and_then(SortDirective::parse);
        let pagination = parse_pagination(
            non_empty(&params, &fields.page),
            non_empty(&params, &fields.count),
            &config.pagination,
        );

        Self {
            filter_source: fields.filters.clone(),
            params,
            inclusions,
            sort,
            pagination,
        }
    }

    /// Build from `(name, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>, config: &ToolkitConfig) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let params = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self::new(params, config)
    }

    /// Values for the recognized filter `names` that are present and non-empty
    pub fn filter_values<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> FilterValues {
        names
            .into_iter()
            .filter_map(|name| {
                let parameter = self.filter_source.parameter(name);
                non_empty(&self.params, &parameter).map(|raw| (name, Value::String(raw.to_string())))
            })
            .collect()
    }

    /// Requested inclusion names, deduplicated, in request order
    #[must_use]
    pub fn inclusions(&self) -> &[String] {
        &self.inclusions
    }

    #[must_use]
    pub fn sort(&self) -> Option<&SortDirective> {
        self.sort.as_ref()
    }

    #[must_use]
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Raw access to any other query parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ResourceRequest {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {e}")))?;
        let config = parts
            .extensions
            .get::<Arc<ToolkitConfig>>()
            .cloned()
            .unwrap_or_default();
        Ok(Self::new(params, &config))
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// Comma-split, trimmed, deduplicated, order preserved
fn parse_inclusions(raw: Option<&str>) -> Vec<String> {
    let mut inclusions: Vec<String> = Vec::new();
    for name in raw.unwrap_or_default().split(',').map(str::trim) {
        if !name.is_empty() && !inclusions.iter().any(|existing| existing == name) {
            inclusions.push(name.to_string());
        }
    }
    inclusions
}

fn parse_pagination(page: Option<&str>, count: Option<&str>, config: &PaginationConfig) -> Pagination {
    let positive = |raw: Option<&str>, default: u64| {
        raw.and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value >= 1)
            .unwrap_or(default)
    };
    let page = positive(page, config.default_page);
    let mut count = positive(count, config.default_count);
    if let Some(max) = config.max_count {
        count = count.min(max);
    }
    Pagination::new(page, count)
}

/// Standard listing parameters, for OpenAPI documentation of endpoints using the default
/// field names.
#[derive(Debug, Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListQueryParams {
    /// Comma-separated inclusion names; dot notation loads nested relations.
    #[param(example = "author,comments.author")]
    pub with: Option<String>,
    /// Sort column; a leading `-` sorts descending.
    #[param(example = "-created_at")]
    pub order_by: Option<String>,
    /// Page number (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Number of items per page.
    #[param(example = 15)]
    pub count: Option<u64>,
}
