//! Translation of list requests into parameterized SQL.
//!
//! Caller-supplied values only ever reach SQLite as bound parameters. Column names and sort
//! directions are interpolated, but only from the closed enums below.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::domain::{Severity, Status};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Columns of the `incidents` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Title,
    Service,
    Severity,
    Status,
    Owner,
    Summary,
    CreatedAt,
    UpdatedAt,
}

impl Column {
    pub fn as_sql(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Title => "title",
            Column::Service => "service",
            Column::Severity => "severity",
            Column::Status => "status",
            Column::Owner => "owner",
            Column::Summary => "summary",
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
        }
    }
}

/// Projection shared by every incident read, in `repo::incident_from_row` order.
pub const SELECT_COLUMNS: &str =
    "id, title, service, severity, status, owner, summary, created_at, updated_at";

/// Sortable fields accepted in `sortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Title,
    Severity,
    Status,
    Service,
    CreatedAt,
    UpdatedAt,
    Owner,
}

impl SortKey {
    pub const ALL: [SortKey; 7] = [
        SortKey::Title,
        SortKey::Severity,
        SortKey::Status,
        SortKey::Service,
        SortKey::CreatedAt,
        SortKey::UpdatedAt,
        SortKey::Owner,
    ];

    pub fn column(self) -> Column {
        match self {
            SortKey::Title => Column::Title,
            SortKey::Severity => Column::Severity,
            SortKey::Status => Column::Status,
            SortKey::Service => Column::Service,
            SortKey::CreatedAt => Column::CreatedAt,
            SortKey::UpdatedAt => Column::UpdatedAt,
            SortKey::Owner => Column::Owner,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.column().as_sql()
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// List request exactly as received from the client. Every field is untrusted text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub search: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub service: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<String>,
}

/// Normalized list request. Construction never fails: unusable input falls back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub severities: Vec<Severity>,
    pub statuses: Vec<Status>,
    pub service: Option<String>,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            severities: Vec::new(),
            statuses: Vec::new(),
            service: None,
            sort_by: SortKey::CreatedAt,
            sort_order: SortOrder::Desc,
        }
    }
}

/// Leading integer of `raw` (optional sign, then digits), ignoring any trailing text.
/// Digit runs too long for `i64` saturate.
fn parse_leading_int(raw: Option<&str>) -> Option<i64> {
    let s = raw?.trim();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut value: Option<i64> = None;
    for b in rest.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        let acc = value.unwrap_or(0);
        value = Some(
            acc.checked_mul(10)
                .and_then(|v| v.checked_add(digit))
                .unwrap_or(i64::MAX),
        );
    }
    value.map(|v| if negative { -v } else { v })
}

/// Paging input where zero counts as absent.
fn parse_paging(raw: Option<&str>) -> Option<i64> {
    parse_leading_int(raw).filter(|n| *n != 0)
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Comma-separated list filtered down to known members, first occurrence wins.
fn parse_list<T: PartialEq>(raw: Option<&str>, parse: impl Fn(&str) -> Option<T>) -> Vec<T> {
    let mut out = Vec::new();
    for item in raw.unwrap_or_default().split(',') {
        if let Some(v) = parse(item.trim()) {
            if !out.contains(&v) {
                out.push(v);
            }
        }
    }
    out
}

/// Escape LIKE metacharacters so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// `WHERE ...` text (empty when unfiltered) plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Both statements a list request runs, sharing one WHERE clause and parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct ListStatements {
    pub count_sql: String,
    pub select_sql: String,
    pub where_params: Vec<Value>,
    pub limit: i64,
    pub offset: i64,
}

impl ListStatements {
    /// Parameters for `select_sql`: the WHERE parameters followed by LIMIT and OFFSET.
    pub fn select_params(&self) -> Vec<Value> {
        let mut params = self.where_params.clone();
        params.push(Value::Integer(self.limit));
        params.push(Value::Integer(self.offset));
        params
    }
}

impl ListQuery {
    pub fn from_params(params: &ListParams) -> Self {
        let page = parse_paging(params.page.as_deref())
            .unwrap_or(DEFAULT_PAGE)
            .max(1);
        let limit = parse_paging(params.limit.as_deref())
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT);

        Self {
            page,
            limit,
            search: non_blank(params.search.as_deref()),
            severities: parse_list(params.severity.as_deref(), Severity::parse),
            statuses: parse_list(params.status.as_deref(), Status::parse),
            service: non_blank(params.service.as_deref()),
            sort_by: params
                .sort_by
                .as_deref()
                .and_then(SortKey::parse)
                .unwrap_or(SortKey::CreatedAt),
            sort_order: params
                .sort_order
                .as_deref()
                .and_then(SortOrder::parse)
                .unwrap_or(SortOrder::Desc),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn where_clause(&self) -> WhereClause {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(term) = &self.search {
            let pattern = escape_like(term);
            let searched = [Column::Title, Column::Service, Column::Owner];
            let ors: Vec<String> = searched
                .iter()
                .map(|c| format!("{} LIKE ? ESCAPE '\\'", c.as_sql()))
                .collect();
            conditions.push(format!("({})", ors.join(" OR ")));
            params.extend(searched.iter().map(|_| Value::Text(pattern.clone())));
        }

        if !self.severities.is_empty() {
            conditions.push(format!(
                "{} IN ({})",
                Column::Severity.as_sql(),
                placeholders(self.severities.len())
            ));
            params.extend(
                self.severities
                    .iter()
                    .map(|s| Value::Text(s.as_str().to_string())),
            );
        }

        if !self.statuses.is_empty() {
            conditions.push(format!(
                "{} IN ({})",
                Column::Status.as_sql(),
                placeholders(self.statuses.len())
            ));
            params.extend(
                self.statuses
                    .iter()
                    .map(|s| Value::Text(s.as_str().to_string())),
            );
        }

        if let Some(service) = &self.service {
            conditions.push(format!("{} = ?", Column::Service.as_sql()));
            params.push(Value::Text(service.clone()));
        }

        let sql = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        WhereClause { sql, params }
    }

    pub fn order_clause(&self) -> String {
        let dir = self.sort_order.as_sql();
        let key = match self.sort_by {
            SortKey::Severity => severity_rank_sql(),
            other => other.column().as_sql().to_string(),
        };
        // rowid keeps pages stable when the sort key ties.
        format!("ORDER BY {key} {dir}, rowid {dir}")
    }

    pub fn statements(&self) -> ListStatements {
        let WhereClause { sql: where_sql, params } = self.where_clause();
        let order = self.order_clause();

        let count_sql = join_sql(&["SELECT COUNT(*) FROM incidents", &where_sql]);
        let select_sql = join_sql(&[
            &format!("SELECT {SELECT_COLUMNS} FROM incidents"),
            &where_sql,
            &order,
            "LIMIT ? OFFSET ?",
        ]);

        ListStatements {
            count_sql,
            select_sql,
            where_params: params,
            limit: self.limit,
            offset: self.offset(),
        }
    }
}

fn join_sql(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `CASE` expression mapping each severity to its rank.
fn severity_rank_sql() -> String {
    let arms: Vec<String> = Severity::ALL
        .iter()
        .map(|s| format!("WHEN '{}' THEN {}", s.as_str(), s.rank()))
        .collect();
    format!("CASE {} {} END", Column::Severity.as_sql(), arms.join(" "))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        let total_pages = if total <= 0 {
            0
        } else {
            (total + limit - 1) / limit
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params() -> ListParams {
        ListParams::default()
    }

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn defaults_when_nothing_supplied() {
        let q = ListQuery::from_params(&params());
        assert_eq!(q, ListQuery::default());
        assert_eq!(q.offset(), 0);
        assert_eq!(q.where_clause().sql, "");
        assert_eq!(q.order_clause(), "ORDER BY created_at DESC, rowid DESC");
    }

    #[test]
    fn page_and_limit_are_clamped() {
        for (page, limit, want_page, want_limit) in [
            ("0", "0", 1, 10),
            ("-0", "+0", 1, 10),
            ("-3", "-5", 1, 1),
            ("99999999999999999999", "99999999999999999999", i64::MAX, 100),
            ("-99999999999999999999", "-99999999999999999999", 1, 1),
            ("2", "500", 2, 100),
            ("abc", "", 1, 10),
            ("3xyz", "25.9", 3, 25),
        ] {
            let q = ListQuery::from_params(&ListParams {
                page: Some(page.to_string()),
                limit: Some(limit.to_string()),
                ..params()
            });
            assert_eq!((q.page, q.limit), (want_page, want_limit), "page={page} limit={limit}");
        }
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let q = ListQuery {
            page: 3,
            limit: 20,
            ..Default::default()
        };
        assert_eq!(q.offset(), 40);

        let huge = ListQuery {
            page: i64::MAX,
            limit: MAX_LIMIT,
            ..Default::default()
        };
        assert_eq!(huge.offset(), i64::MAX);
    }

    #[test]
    fn search_is_bound_and_escaped() {
        let q = ListQuery::from_params(&ListParams {
            search: Some(" 50%_off ".to_string()),
            ..params()
        });
        let w = q.where_clause();
        assert_eq!(
            w.sql,
            "WHERE (title LIKE ? ESCAPE '\\' OR service LIKE ? ESCAPE '\\' OR owner LIKE ? ESCAPE '\\')"
        );
        assert_eq!(w.params, vec![text("%50\\%\\_off%"); 3]);
    }

    #[test]
    fn search_and_service_are_trimmed_and_blank_means_absent() {
        let q = ListQuery::from_params(&ListParams {
            search: Some("  db ".to_string()),
            service: Some(" Database ".to_string()),
            ..params()
        });
        assert_eq!(q.search.as_deref(), Some("db"));
        assert_eq!(q.service.as_deref(), Some("Database"));
        assert_eq!(q.where_clause().params[0], text("%db%"));

        let q = ListQuery::from_params(&ListParams {
            search: Some("   ".to_string()),
            service: Some("".to_string()),
            ..params()
        });
        assert_eq!((q.search, q.service), (None, None));
    }

    #[test]
    fn enum_lists_drop_unknown_entries() {
        let q = ListQuery::from_params(&ListParams {
            severity: Some("SEV1,BOGUS, SEV2,SEV1".to_string()),
            status: Some("nope".to_string()),
            ..params()
        });
        assert_eq!(q.severities, vec![Severity::Sev1, Severity::Sev2]);
        assert!(q.statuses.is_empty());

        let w = q.where_clause();
        assert_eq!(w.sql, "WHERE severity IN (?, ?)");
        assert_eq!(w.params, vec![text("SEV1"), text("SEV2")]);
    }

    #[test]
    fn conditions_combine_with_and_in_fixed_order() {
        let q = ListQuery::from_params(&ListParams {
            search: Some("db".to_string()),
            severity: Some("SEV3".to_string()),
            status: Some("OPEN,RESOLVED".to_string()),
            service: Some("Database".to_string()),
            ..params()
        });
        let w = q.where_clause();
        assert!(w.sql.starts_with("WHERE (title LIKE ?"));
        assert!(w
            .sql
            .ends_with(" AND severity IN (?) AND status IN (?, ?) AND service = ?"));
        assert_eq!(w.params.len(), 3 + 1 + 2 + 1);
        assert_eq!(w.params.last(), Some(&text("Database")));
    }

    #[test]
    fn untrusted_service_never_reaches_sql_text() {
        let evil = "x'; DROP TABLE incidents; --";
        let q = ListQuery::from_params(&ListParams {
            service: Some(evil.to_string()),
            sort_by: Some("title; DROP TABLE incidents".to_string()),
            ..params()
        });
        let s = q.statements();
        assert!(!s.select_sql.contains("DROP"));
        assert!(!s.count_sql.contains("DROP"));
        assert_eq!(s.where_params, vec![text(evil)]);
        assert_eq!(q.sort_by, SortKey::CreatedAt);
    }

    #[test]
    fn sort_keys_and_orders_are_allow_listed() {
        let q = ListQuery::from_params(&ListParams {
            sort_by: Some("owner".to_string()),
            sort_order: Some("ASC".to_string()),
            ..params()
        });
        assert_eq!(q.order_clause(), "ORDER BY owner ASC, rowid ASC");

        let q = ListQuery::from_params(&ListParams {
            sort_by: Some("Owner".to_string()),
            sort_order: Some("sideways".to_string()),
            ..params()
        });
        assert_eq!(q.order_clause(), "ORDER BY created_at DESC, rowid DESC");
    }

    #[test]
    fn severity_sort_uses_rank_mapping() {
        let q = ListQuery {
            sort_by: SortKey::Severity,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        assert_eq!(
            q.order_clause(),
            "ORDER BY CASE severity WHEN 'SEV1' THEN 1 WHEN 'SEV2' THEN 2 WHEN 'SEV3' THEN 3 WHEN 'SEV4' THEN 4 END ASC, rowid ASC"
        );
    }

    #[test]
    fn statements_share_where_and_append_paging() {
        let q = ListQuery::from_params(&ListParams {
            page: Some("2".to_string()),
            limit: Some("5".to_string()),
            status: Some("OPEN".to_string()),
            ..params()
        });
        let s = q.statements();
        assert_eq!(s.count_sql, "SELECT COUNT(*) FROM incidents WHERE status IN (?)");
        assert_eq!(
            s.select_sql,
            format!(
                "SELECT {SELECT_COLUMNS} FROM incidents WHERE status IN (?) ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
            )
        );
        assert_eq!(
            s.select_params(),
            vec![text("OPEN"), Value::Integer(5), Value::Integer(5)]
        );
    }

    #[test]
    fn total_pages_rounds_up_and_handles_zero() {
        assert_eq!(Pagination::new(1, 10, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 10, 1).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 10).total_pages, 1);
        assert_eq!(Pagination::new(1, 10, 11).total_pages, 2);
        assert_eq!(
            serde_json::to_value(Pagination::new(2, 10, 11)).unwrap(),
            serde_json::json!({"page": 2, "limit": 10, "total": 11, "totalPages": 2})
        );
    }
}
