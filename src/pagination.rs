use axum::{
    Json,
    http::header::HeaderMap,
    response::{IntoResponse, Response},
};
use serde::{Serialize, Serializer};

use crate::config::{DEFAULT_COUNT, DEFAULT_PAGE};
use crate::transformer::Transformer;

/// 1-based page cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub count: u64,
}

impl Pagination {
    /// Both values are clamped to at least 1
    #[must_use]
    pub fn new(page: u64, count: u64) -> Self {
        Self {
            page: page.max(1),
            count: count.max(1),
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.count)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_COUNT)
    }
}

/// One page of results plus the totals needed to navigate the rest
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
    pub total: u64,
    resource: String,
}

impl<T> Paginated<T> {
    #[must_use]
    pub fn new(items: Vec<T>, pagination: Pagination, total: u64, resource: impl Into<String>) -> Self {
        Self {
            items,
            pagination,
            total,
            resource: resource.into(),
        }
    }

    #[must_use]
    pub fn last_page(&self) -> u64 {
        self.total.div_ceil(self.pagination.count).max(1)
    }

    /// 1-based position of the first item on this page
    #[must_use]
    pub fn from(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| self.pagination.offset() + 1)
    }

    /// 1-based position of the last item on this page
    #[must_use]
    pub fn to(&self) -> Option<u64> {
        (!self.items.is_empty()).then(|| self.pagination.offset() + self.items.len() as u64)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
            total: self.total,
            resource: self.resource,
        }
    }

    /// Render every item through `transformer`
    #[must_use]
    pub fn transform(self, transformer: &dyn Transformer<T>) -> Paginated<serde_json::Value> {
        Paginated {
            items: self.items.iter().map(|item| transformer.transform(item)).collect(),
            pagination: self.pagination,
            total: self.total,
            resource: self.resource,
        }
    }

    /// Headers describing the returned slice, e.g. `Content-Range: posts 0-14/42`
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        match (self.from(), self.to()) {
            (Some(from), Some(to)) => calculate_content_range(from - 1, to - 1, self.total, &self.resource),
            _ => empty_content_range(self.total, &self.resource),
        }
    }
}

#[derive(Serialize)]
struct PageMeta {
    current_page: u64,
    per_page: u64,
    total: u64,
    last_page: u64,
    from: Option<u64>,
    to: Option<u64>,
}

#[derive(Serialize)]
struct PageBody<'a, T> {
    data: &'a [T],
    meta: PageMeta,
}

impl<T: Serialize> Serialize for Paginated<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        PageBody {
            data: &self.items,
            meta: PageMeta {
                current_page: self.pagination.page,
                per_page: self.pagination.count,
                total: self.total,
                last_page: self.last_page(),
                from: self.from(),
                to: self.to(),
            },
        }
        .serialize(serializer)
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        (self.headers(), Json(self)).into_response()
    }
}

/// Sanitize resource name by removing control characters for HTTP headers
fn sanitize_resource_name(name: &str) -> String {
    name.chars().filter(|c| c.is_ascii() && !c.is_ascii_control()).collect()
}

fn content_range_header(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = value.parse() {
        headers.insert("Content-Range", value);
    }
    headers
}

/// Build the `Content-Range` header for items `start..=end` (0-based) out of `total_count`.
///
/// The resource name is sanitized so that it can never inject additional headers.
#[must_use]
pub fn calculate_content_range(start: u64, end: u64, total_count: u64, resource_name: &str) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    content_range_header(&format!("{safe_name} {start}-{end}/{total_count}"))
}

fn empty_content_range(total_count: u64, resource_name: &str) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    content_range_header(&format!("{safe_name} */{total_count}"))
}
