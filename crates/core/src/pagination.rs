//! List query parsing and paged results.
//!
//! List endpoints accept `?page=&perPage=&sort=field@asc|desc&search=`.
//! Sorting is restricted to a per-resource allowlist mapping API field names
//! to SQL columns, so the resolved column can be spliced into `ORDER BY`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::validation::{FieldSpec, RequestSchema, RequestViolation, Schema};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;
/// Largest page whose offset fits in an `i64` at any page size.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;
pub const MAX_SEARCH_LENGTH: usize = 100;

/// Raw list query, validated by [`ListQuery::schema`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: i64,
    pub per_page: i64,
    pub sort: Option<String>,
    pub search: Option<String>,
}

impl RequestSchema for ListQuery {
    fn schema() -> Schema {
        Schema::query()
            .field(
                FieldSpec::integer("page")
                    .default_value(DEFAULT_PAGE)
                    .min(1.0)
                    .max(MAX_PAGE as f64),
            )
            .field(
                FieldSpec::integer("perPage")
                    .default_value(DEFAULT_PER_PAGE)
                    .min(1.0)
                    .max(MAX_PER_PAGE as f64),
            )
            .field(FieldSpec::string("sort").trim())
            .field(FieldSpec::string("search").trim().max_length(MAX_SEARCH_LENGTH))
    }
}

impl ListQuery {
    /// Resolve the sort against `sortable` and produce a page request.
    pub fn into_page_request(self, sortable: &Sortable) -> Result<PageRequest, CoreError> {
        let sort = sortable.resolve(self.sort.as_deref())?;
        Ok(PageRequest {
            page: self.page.clamp(1, MAX_PAGE),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
            sort,
            search: self.search.filter(|s| !s.is_empty()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// A resolved sort: the SQL column from the allowlist plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: &'static str,
    pub direction: SortDirection,
}

impl SortSpec {
    /// `ORDER BY` body, e.g. `first_name ASC`.
    pub fn to_sql(self) -> String {
        format!("{} {}", self.column, self.direction.as_sql())
    }
}

/// Per-resource sort allowlist: `(api field, sql column)` pairs plus the
/// default `field@direction` used when the query has no `sort`.
#[derive(Debug, Clone, Copy)]
pub struct Sortable {
    pub fields: &'static [(&'static str, &'static str)],
    pub default: &'static str,
}

impl Sortable {
    pub fn resolve(&self, sort: Option<&str>) -> Result<SortSpec, CoreError> {
        let raw = sort.filter(|s| !s.is_empty()).unwrap_or(self.default);
        self.parse(raw).ok_or_else(|| {
            let allowed: Vec<Value> = self.fields.iter().map(|(f, _)| Value::from(*f)).collect();
            CoreError::Validation(vec![RequestViolation::new("sort", "isSort")
                .with_value(Value::from(raw))
                .with_param("values", allowed)])
        })
    }

    fn parse(&self, raw: &str) -> Option<SortSpec> {
        let (field, direction) = match raw.split_once('@') {
            Some((field, direction)) => (field.trim(), SortDirection::parse(direction.trim())?),
            None => (raw.trim(), SortDirection::Asc),
        };
        let column = self
            .fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)?;
        Some(SortSpec { column, direction })
    }
}

/// Validated page window handed to repositories.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
    pub sort: SortSpec,
    pub search: Option<String>,
}

impl PageRequest {
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// `search` wrapped for `ILIKE`, with `%`/`_` escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search.as_deref().map(|s| {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            format!("%{escaped}%")
        })
    }
}

/// One page of results, serialized with the envelope's pagination fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_data: i64,
    pub total_page: i64,
    pub current_page: i64,
    pub per_page: i64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total_data: i64, request: &PageRequest) -> Self {
        Self {
            total_page: total_page(total_data, request.per_page),
            current_page: request.page,
            per_page: request.per_page,
            total_data,
            data,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total_data: self.total_data,
            total_page: self.total_page,
            current_page: self.current_page,
            per_page: self.per_page,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

/// Number of pages needed for `total` items; zero when there are none.
pub fn total_page(total: i64, per_page: i64) -> i64 {
    if total <= 0 || per_page <= 0 {
        return 0;
    }
    (total + per_page - 1) / per_page
}
