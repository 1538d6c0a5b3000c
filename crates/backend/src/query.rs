//! Table read builder.
//!
//! A [`Query`] renders to the query string understood by the REST endpoint:
//!
//! ```text
//! select=*,brand:brands(*)&is_active=eq.true&or=(name.ilike.*oud*)&order=created_at.desc&offset=20&limit=20
//! ```
//!
//! Rendering is deterministic for a given sequence of builder calls, so the
//! query string doubles as the cache key.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Characters that carry meaning inside filter values and `or=(...)` groups.
const RESERVED_CHARS: &[char] = &[',', '(', ')', '*', '"', '\\', ':'];

/// Comparison applied by a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOp {
    Eq(String),
    Neq(String),
    Gt(String),
    Gte(String),
    Lt(String),
    Lte(String),
    Like(String),
    ILike(String),
    In(Vec<String>),
    IsNull,
    NotNull,
}

/// A single `column=op.value` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    /// Render the value side, e.g. `eq.5` or `in.(1,2)`.
    #[must_use]
    pub fn render_value(&self) -> String {
        match &self.op {
            FilterOp::Eq(v) => format!("eq.{v}"),
            FilterOp::Neq(v) => format!("neq.{v}"),
            FilterOp::Gt(v) => format!("gt.{v}"),
            FilterOp::Gte(v) => format!("gte.{v}"),
            FilterOp::Lt(v) => format!("lt.{v}"),
            FilterOp::Lte(v) => format!("lte.{v}"),
            FilterOp::Like(v) => format!("like.{v}"),
            FilterOp::ILike(v) => format!("ilike.{v}"),
            FilterOp::In(values) => {
                let list: Vec<String> = values.iter().map(|v| quote_list_value(v)).collect();
                format!("in.({})", list.join(","))
            }
            FilterOp::IsNull => "is.null".to_string(),
            FilterOp::NotNull => "not.is.null".to_string(),
        }
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: u32 = 20;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Normalise a page request: page 0 becomes 1 and `per_page` is
    /// clamped to `1..=100`.
    #[must_use]
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, Self::MAX_PER_PAGE),
        }
    }

    /// Build from optional request parameters.
    #[must_use]
    pub fn from_params(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self::new(
            page.unwrap_or(1),
            per_page.unwrap_or(Self::DEFAULT_PER_PAGE),
        )
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Number of pages needed for `total` rows.
    #[must_use]
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PER_PAGE)
    }
}

/// Case-insensitive substring search over several columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub term: String,
    pub columns: Vec<String>,
}

impl Search {
    /// Render as an `or=(...)` group, or `None` when there is nothing to
    /// search for.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        let term = sanitize_search_term(&self.term);
        if term.is_empty() || self.columns.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self
            .columns
            .iter()
            .map(|col| format!("{col}.ilike.*{term}*"))
            .collect();
        Some(format!("({})", clauses.join(",")))
    }
}

/// Strip characters reserved by the filter grammar and trim whitespace.
#[must_use]
pub fn sanitize_search_term(term: &str) -> String {
    term.chars()
        .filter(|c| !RESERVED_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

// Values inside `in.(...)` containing reserved characters must be quoted.
fn quote_list_value(value: &str) -> String {
    if value.contains(RESERVED_CHARS) || value.contains(' ') {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{escaped}\"")
    } else {
        value.to_string()
    }
}

/// A read against one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    select: String,
    filters: Vec<Filter>,
    search: Option<Search>,
    order: Vec<(String, bool)>,
    pagination: Option<Pagination>,
    limit: Option<u32>,
    count: bool,
}

impl Query {
    /// Start a query on `table` selecting every column.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            filters: Vec::new(),
            search: None,
            order: Vec::new(),
            pagination: None,
            limit: None,
            count: true,
        }
    }

    /// Column selection, including embeds such as `*, brand:brands(*)`.
    ///
    /// Whitespace is removed so equivalent selections share a cache entry.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.chars().filter(|c| !c.is_whitespace()).collect();
        self
    }

    /// Add an arbitrary filter.
    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, op: FilterOp) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
        });
        self
    }

    #[must_use]
    pub fn eq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, FilterOp::Eq(value.to_string()))
    }

    #[must_use]
    pub fn neq(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, FilterOp::Neq(value.to_string()))
    }

    #[must_use]
    pub fn gt(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, FilterOp::Gt(value.to_string()))
    }

    #[must_use]
    pub fn gte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, FilterOp::Gte(value.to_string()))
    }

    #[must_use]
    pub fn lt(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, FilterOp::Lt(value.to_string()))
    }

    #[must_use]
    pub fn lte(self, column: &str, value: impl fmt::Display) -> Self {
        self.filter(column, FilterOp::Lte(value.to_string()))
    }

    #[must_use]
    pub fn like(self, column: &str, pattern: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Like(pattern.into()))
    }

    #[must_use]
    pub fn ilike(self, column: &str, pattern: impl Into<String>) -> Self {
        self.filter(column, FilterOp::ILike(pattern.into()))
    }

    /// `column` is one of `values`.
    #[must_use]
    pub fn in_list<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.filter(column, FilterOp::In(values))
    }

    #[must_use]
    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, FilterOp::IsNull)
    }

    #[must_use]
    pub fn not_null(self, column: &str) -> Self {
        self.filter(column, FilterOp::NotNull)
    }

    /// Search `columns` for `term`. A blank term adds nothing.
    #[must_use]
    pub fn search(mut self, term: &str, columns: &[&str]) -> Self {
        self.search = Some(Search {
            term: term.to_string(),
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        });
        self
    }

    /// Append a sort column.
    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    #[must_use]
    pub const fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Cap the row count without paging.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether to ask the server for an exact total count (default true).
    #[must_use]
    pub const fn with_count(mut self, count: bool) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub const fn wants_count(&self) -> bool {
        self.count
    }

    #[must_use]
    pub const fn pagination(&self) -> Option<Pagination> {
        self.pagination
    }

    /// Whether the query restricts rows (filters or search).
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty() || self.search.as_ref().and_then(Search::render).is_some()
    }

    /// Filter and search pairs only, as used by updates and deletes.
    #[must_use]
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .filters
            .iter()
            .map(|f| (f.column.clone(), f.render_value()))
            .collect();
        if let Some(group) = self.search.as_ref().and_then(Search::render) {
            pairs.push(("or".to_string(), group));
        }
        pairs
    }

    /// Selection plus filters, as sent with updates and deletes so the
    /// returned representation can embed relations.
    #[must_use]
    pub fn mutation_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.filter_pairs());
        pairs
    }

    /// Every query parameter in rendering order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = self.mutation_pairs();

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(col, asc)| format!("{col}.{}", if *asc { "asc" } else { "desc" }))
                .collect();
            pairs.push(("order".to_string(), order.join(",")));
        }

        match (self.pagination, self.limit) {
            (Some(page), _) => {
                pairs.push(("offset".to_string(), page.offset().to_string()));
                pairs.push(("limit".to_string(), page.per_page.to_string()));
            }
            (None, Some(limit)) => pairs.push(("limit".to_string(), limit.to_string())),
            (None, None) => {}
        }
        pairs
    }

    /// URL-encoded query string.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        encode_pairs(&self.to_pairs())
    }
}

/// URL-encode `key=value` pairs.
#[must_use]
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn pair<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_renders_filters_in_order() {
        let query = Query::table("products")
            .select("*, brand:brands(*)")
            .eq("is_active", true)
            .gte("price_from", 10)
            .in_list("brand_id", [3, 7])
            .is_null("category_id");

        assert_eq!(
            query.to_pairs(),
            vec![
                ("select".to_string(), "*,brand:brands(*)".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("price_from".to_string(), "gte.10".to_string()),
                ("brand_id".to_string(), "in.(3,7)".to_string()),
                ("category_id".to_string(), "is.null".to_string()),
            ]
        );
    }

    #[test]
    fn test_pagination_offsets() {
        let pairs = Query::table("orders")
            .paginate(Pagination::new(3, 20))
            .to_pairs();
        assert_eq!(pair(&pairs, "offset"), Some("40"));
        assert_eq!(pair(&pairs, "limit"), Some("20"));
    }

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(Pagination::new(0, 0), Pagination { page: 1, per_page: 1 });
        assert_eq!(Pagination::new(2, 500).per_page, 100);
        assert_eq!(Pagination::new(0, 10).offset(), 0);
        assert_eq!(Pagination::new(1, 20).total_pages(41), 3);
        assert_eq!(Pagination::new(1, 20).total_pages(0), 0);
    }

    #[test]
    fn test_order_renders_multiple_columns() {
        let pairs = Query::table("categories")
            .order("sort_order", true)
            .order("name", false)
            .to_pairs();
        assert_eq!(pair(&pairs, "order"), Some("sort_order.asc,name.desc"));
    }

    #[test]
    fn test_search_strips_reserved_characters() {
        let pairs = Query::table("products")
            .search(" oud,(nuit)*:\" ", &["name", "description"])
            .to_pairs();
        assert_eq!(
            pair(&pairs, "or"),
            Some("(name.ilike.*oudnuit*,description.ilike.*oudnuit*)")
        );
    }

    #[test]
    fn test_blank_search_adds_nothing() {
        let query = Query::table("products").search(" ,() ", &["name"]);
        assert!(!query.has_filters());
        assert_eq!(pair(&query.to_pairs(), "or"), None);
    }

    #[test]
    fn test_in_list_quotes_reserved_values() {
        let query = Query::table("discounts").in_list("code", ["SPRING", "A,B"]);
        assert_eq!(
            query.filter_pairs(),
            vec![("code".to_string(), "in.(SPRING,\"A,B\")".to_string())]
        );
    }

    #[test]
    fn test_limit_without_pagination() {
        let pairs = Query::table("reviews").limit(1).to_pairs();
        assert_eq!(pair(&pairs, "limit"), Some("1"));
        assert_eq!(pair(&pairs, "offset"), None);
    }

    #[test]
    fn test_query_string_is_encoded_and_stable() {
        let build = || {
            Query::table("products")
                .eq("slug", "oud nuit")
                .order("name", true)
        };
        assert_eq!(build().to_query_string(), build().to_query_string());
        assert_eq!(
            build().to_query_string(),
            "select=*&slug=eq.oud+nuit&order=name.asc"
        );
    }

    #[test]
    fn test_not_null_and_neq() {
        let pairs = Query::table("orders")
            .neq("status", "cancelled")
            .not_null("discount_code")
            .filter_pairs();
        assert_eq!(pairs[0].1, "neq.cancelled");
        assert_eq!(pairs[1].1, "not.is.null");
    }
}
