//! SQL-first dynamic builder.
//!
//! This module complements `query()`:
//! - `query()` is great when you already have a full SQL string with `$1, $2...`.
//! - `Sql` is great when you want to *compose* SQL dynamically without manually
//!   tracking placeholder indices.
//!
//! # Example
//!
//! ```ignore
//! use pghttp::sql;
//!
//! let mut q = sql("SELECT id, username FROM users WHERE 1=1");
//! if let Some(status) = status {
//!     q.push(" AND status = ").push_bind(status);
//! }
//! q.push(" ORDER BY created_at DESC");
//!
//! let users: Vec<User> = q.fetch_all_as(&db).await?;
//! ```

use crate::client::{BuiltQuery, GenericClient};
use crate::error::{OrmError, OrmResult};
use crate::qb::{Expr, ParamList};
use crate::row::{FromRow, Row};
use crate::types::{Param, ToParam};
use serde::de::DeserializeOwned;

#[derive(Debug, Clone)]
enum SqlPart {
    Raw(String),
    Param,
    /// Placeholders are numbered when rendering, starting after those before it.
    Expr { expr: Expr, params: usize },
}

impl SqlPart {
    fn placeholder_count(&self) -> usize {
        match self {
            SqlPart::Raw(_) => 0,
            SqlPart::Param => 1,
            SqlPart::Expr { params, .. } => *params,
        }
    }
}

/// A SQL-first, parameter-safe dynamic SQL builder.
///
/// `Sql` stores SQL pieces and parameters separately and generates `$1, $2, ...`
/// placeholders automatically in the final SQL string.
#[derive(Debug, Clone)]
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Param>,
}

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

/// Strip leading whitespace, SQL comments (`--` and `/* */`), and parentheses
/// from a SQL string to find the first meaningful keyword.
fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            break;
        }
    }
    s
}

fn is_valid_ident_segment(seg: &str) -> bool {
    let mut chars = seg.chars();
    match chars.next() {
        Some(first) if first == '_' || first.is_ascii_alphabetic() => {
            chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
        }
        _ => false,
    }
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self {
            parts: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind<T: ToParam>(&mut self, value: T) -> &mut Self {
        self.push_bind_param(Param::new(&value))
    }

    fn push_bind_param(&mut self, param: Param) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(param);
        self
    }

    /// Chainable bind for SQL that already contains `$1, $2, ...` placeholders.
    ///
    /// Only stores the parameter value; no placeholder is added.
    pub fn bind<T: ToParam>(mut self, value: T) -> Self {
        self.params.push(Param::new(&value));
        self
    }

    /// Append a comma-separated list of placeholders and bind all values.
    ///
    /// If `values` is empty, this appends `NULL` (so `IN (NULL)` is valid SQL).
    pub fn push_bind_list<T: ToParam>(&mut self, values: impl IntoIterator<Item = T>) -> &mut Self {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return self.push("NULL");
        };

        self.push_bind(first);
        for v in iter {
            self.push(", ");
            self.push_bind(v);
        }
        self
    }

    /// Append another `Sql` fragment, consuming it.
    pub fn push_sql(&mut self, mut other: Sql) -> &mut Self {
        self.parts.append(&mut other.parts);
        self.params.append(&mut other.params);
        self
    }

    /// Append a query-builder expression and bind its values.
    ///
    /// A top-level `OR` group is wrapped in parentheses so it cannot merge
    /// with surrounding `AND`s.
    pub fn push_expr(&mut self, expr: &Expr) -> &mut Self {
        if expr.is_empty() {
            return self;
        }
        let mut local = ParamList::new();
        expr.build(&mut local);
        let count = local.len();
        self.params.extend(local.into_vec());
        self.parts.push(SqlPart::Expr {
            expr: expr.clone(),
            params: count,
        });
        self
    }

    /// Append a SQL identifier (schema/table/column) safely.
    ///
    /// Identifiers cannot be parameterized, so each `.`-separated segment must
    /// match `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn push_ident(&mut self, ident: &str) -> OrmResult<&mut Self> {
        if ident.is_empty() {
            return Err(OrmError::validation("Sql::push_ident: empty identifier"));
        }
        if !ident.split('.').all(is_valid_ident_segment) {
            return Err(OrmError::Validation(format!(
                "Sql::push_ident: invalid identifier '{}'",
                ident
            )));
        }
        Ok(self.push(ident))
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut idx: usize = 0;

        for part in &self.parts {
            match part {
                SqlPart::Raw(s) => out.push_str(s),
                SqlPart::Param => {
                    idx += 1;
                    let _ = write!(&mut out, "${}", idx);
                }
                SqlPart::Expr { expr, params } => {
                    let fragment = expr.build(&mut ParamList::with_offset(idx));
                    if matches!(expr, Expr::Or(_)) {
                        let _ = write!(&mut out, "({})", fragment);
                    } else {
                        out.push_str(&fragment);
                    }
                    idx += params;
                }
            }
        }
        out
    }

    /// Bound parameters in placeholder order.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn validate(&self) -> OrmResult<()> {
        let placeholder_count: usize = self.parts.iter().map(SqlPart::placeholder_count).sum();

        // `bind()` adds params without placeholders, so only the other direction is an error.
        if placeholder_count > self.params.len() {
            return Err(OrmError::Validation(format!(
                "Sql: more placeholders({}) than params({})",
                placeholder_count,
                self.params.len()
            )));
        }
        Ok(())
    }

    /// Validate and snapshot for batching in a transaction.
    pub fn build(&self) -> OrmResult<BuiltQuery> {
        self.validate()?;
        Ok(BuiltQuery::new(self.to_sql(), self.params.clone()))
    }

    /// Execute the built SQL and return all rows.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> OrmResult<Vec<Row>> {
        self.validate()?;
        conn.query(&self.to_sql(), &self.params).await
    }

    /// Execute the built SQL and return all rows mapped to `T`.
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<Vec<T>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute the built SQL and return the first row.
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> OrmResult<Row> {
        self.validate()?;
        conn.query_one(&self.to_sql(), &self.params).await
    }

    /// Execute the built SQL and return the first row mapped to `T`.
    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<T> {
        let row = self.fetch_one(conn).await?;
        T::from_row(&row)
    }

    /// Execute the built SQL and return at most one row.
    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> OrmResult<Option<Row>> {
        self.validate()?;
        conn.query_opt(&self.to_sql(), &self.params).await
    }

    /// Execute the built SQL and return at most one row mapped to `T`.
    pub async fn fetch_opt_as<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Option<T>> {
        let row = self.fetch_opt(conn).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute the built SQL and return affected row count.
    pub async fn execute(&self, conn: &impl GenericClient) -> OrmResult<u64> {
        self.validate()?;
        conn.execute(&self.to_sql(), &self.params).await
    }

    /// Execute the built SQL and return the first column of the first row.
    ///
    /// # Example
    /// ```ignore
    /// let count: i64 = sql("SELECT COUNT(*) FROM users WHERE status = ")
    ///     .push_bind("active")
    ///     .fetch_scalar_one(&db)
    ///     .await?;
    /// ```
    pub async fn fetch_scalar_one<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<T> {
        let row = self.fetch_one(conn).await?;
        row.try_get(0usize)
    }

    /// Execute the built SQL and return the first column of the first row, if any.
    pub async fn fetch_scalar_opt<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Option<T>> {
        match self.fetch_opt(conn).await? {
            Some(row) => row.try_get(0usize).map(Some),
            None => Ok(None),
        }
    }

    /// Execute the built SQL and return the first column of every row.
    pub async fn fetch_scalar_all<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Vec<T>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(|r| r.try_get(0usize)).collect()
    }

    /// Check if any rows exist for this SELECT query.
    ///
    /// Wraps the query in `SELECT EXISTS(...)`. Only works with SELECT
    /// statements (including `WITH ... SELECT`).
    pub async fn exists(&self, conn: &impl GenericClient) -> OrmResult<bool> {
        self.validate()?;
        let inner_sql = self.to_sql();

        let keyword = strip_sql_prefix(&inner_sql);
        let is_select = ["SELECT", "WITH"].iter().any(|kw| {
            keyword
                .get(..kw.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(kw))
        });
        if !is_select {
            return Err(OrmError::validation(
                "exists() only works with SELECT statements (including WITH ... SELECT)",
            ));
        }

        let wrapped_sql = format!("SELECT EXISTS({})", inner_sql);
        let row = conn.query_one(&wrapped_sql, &self.params).await?;
        row.try_get(0usize)
    }

    /// Append `LIMIT $n` to the query with a bound parameter.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        self.push(" LIMIT ").push_bind(n)
    }

    /// Append `OFFSET $n` to the query with a bound parameter.
    pub fn offset(&mut self, n: i64) -> &mut Self {
        self.push(" OFFSET ").push_bind(n)
    }

    /// Append `LIMIT $n OFFSET $m` to the query with bound parameters.
    pub fn limit_offset(&mut self, limit: i64, offset: i64) -> &mut Self {
        self.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset)
    }

    /// Append pagination using page number and page size.
    ///
    /// Page numbers start at 1. Returns an error if `page < 1`, `per_page < 1`
    /// or the offset overflows.
    pub fn page(&mut self, page: i64, per_page: i64) -> OrmResult<&mut Self> {
        if page < 1 {
            return Err(OrmError::Validation(format!(
                "page must be >= 1, got {}",
                page
            )));
        }
        if per_page < 1 {
            return Err(OrmError::Validation(format!(
                "per_page must be >= 1, got {}",
                per_page
            )));
        }
        let offset = (page - 1).checked_mul(per_page).ok_or_else(|| {
            OrmError::Validation(format!(
                "page {} with {} per page overflows the offset",
                page, per_page
            ))
        })?;
        Ok(self.limit_offset(per_page, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingClient;
    use serde_json::json;

    #[test]
    fn builds_placeholders_in_order() {
        let mut q = sql("SELECT * FROM users WHERE a = ");
        q.push_bind(1).push(" AND b = ").push_bind("x");
        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE a = $1 AND b = $2");
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn can_compose_fragments() {
        let mut where_part = Sql::empty();
        where_part.push(" WHERE id = ").push_bind(42i64);

        let mut q = sql("SELECT * FROM users");
        q.push_sql(where_part);
        q.push(" AND status = ").push_bind("active");

        assert_eq!(
            q.to_sql(),
            "SELECT * FROM users WHERE id = $1 AND status = $2"
        );
    }

    #[test]
    fn bind_list_renders_commas() {
        let mut q = sql("SELECT * FROM users WHERE id IN (");
        q.push_bind_list(vec![1, 2, 3]).push(")");
        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE id IN ($1, $2, $3)");
    }

    #[test]
    fn bind_list_empty_is_valid_sql() {
        let mut q = sql("SELECT * FROM users WHERE id IN (");
        q.push_bind_list(Vec::<i64>::new()).push(")");
        assert_eq!(q.to_sql(), "SELECT * FROM users WHERE id IN (NULL)");
        assert!(q.params().is_empty());
    }

    #[test]
    fn push_ident_accepts_simple_and_dotted() {
        let mut q = Sql::empty();
        q.push("SELECT * FROM ");
        q.push_ident("public.users").unwrap();
        assert_eq!(q.to_sql(), "SELECT * FROM public.users");
    }

    #[test]
    fn push_ident_rejects_unsafe() {
        let mut q = Sql::empty();
        assert!(q.push_ident("users; DROP TABLE users").is_err());
        assert!(q.push_ident("a..b").is_err());
        assert!(q.push_ident("1abc").is_err());
        assert!(q.push_ident("").is_err());
    }

    #[test]
    fn push_expr_renumbers_placeholders() {
        let mut q = sql("SELECT * FROM users WHERE org = ");
        q.push_bind(9i64).push(" AND ");
        q.push_expr(&Expr::or(vec![
            Expr::eq("role", "admin"),
            Expr::gt("karma", 100i32),
        ]));
        assert_eq!(
            q.to_sql(),
            "SELECT * FROM users WHERE org = $1 AND (role = $2 OR karma > $3)"
        );
        assert_eq!(
            q.params(),
            &[Param::new(&9i64), Param::new("admin"), Param::new(&100i32)]
        );
    }

    #[test]
    fn push_expr_numbers_after_later_composition() {
        let mut filter = Sql::empty();
        filter.push(" AND ");
        filter.push_expr(&Expr::eq("role", "admin"));

        let mut q = sql("SELECT * FROM users WHERE org = ");
        q.push_bind(9i64);
        q.push_sql(filter);
        q.push(" AND karma > ").push_bind(100i32);
        assert_eq!(
            q.to_sql(),
            "SELECT * FROM users WHERE org = $1 AND role = $2 AND karma > $3"
        );
        assert!(q.build().is_ok());
    }

    #[test]
    fn push_expr_leaves_dollar_text_in_literals() {
        let mut q = sql("SELECT * FROM notes WHERE id = ");
        q.push_bind(1i64).push(" AND ");
        q.push_expr(&Expr::and(vec![
            Expr::raw("note = '$1'"),
            Expr::template("price > ?", vec![Param::new(&5i32)]),
        ]));
        assert_eq!(
            q.to_sql(),
            "SELECT * FROM notes WHERE id = $1 AND note = '$1' AND price > $2"
        );
        assert_eq!(q.params().len(), 2);
    }

    #[test]
    fn push_expr_skips_empty_groups() {
        let mut q = sql("SELECT 1");
        q.push_expr(&Expr::or(vec![]));
        assert_eq!(q.to_sql(), "SELECT 1");
    }

    #[test]
    fn page_rejects_bad_sizes_and_overflow() {
        let mut q = sql("SELECT * FROM users ORDER BY id");
        assert!(matches!(q.page(1, 0), Err(OrmError::Validation(_))));
        assert!(matches!(q.page(2, -5), Err(OrmError::Validation(_))));
        assert!(matches!(q.page(i64::MAX, 2), Err(OrmError::Validation(_))));
        assert_eq!(q.to_sql(), "SELECT * FROM users ORDER BY id");

        q.page(i64::MAX, 1).unwrap();
        assert_eq!(q.params()[1], Param::new(&(i64::MAX - 1)));
    }

    #[test]
    fn limit_offset_appends_both_params() {
        let mut q = sql("SELECT * FROM users");
        q.limit_offset(10, 20);
        assert_eq!(q.to_sql(), "SELECT * FROM users LIMIT $1 OFFSET $2");
    }

    #[test]
    fn page_converts_to_limit_offset() {
        let mut q = sql("SELECT * FROM users");
        q.page(3, 25).unwrap();
        assert_eq!(q.params(), &[Param::new(&25i64), Param::new(&50i64)]);
    }

    #[test]
    fn page_rejects_zero() {
        let mut q = sql("SELECT * FROM users");
        assert!(q.page(0, 10).is_err());
    }

    #[test]
    fn build_checks_placeholder_count() {
        let q = sql("SELECT $1").bind(1);
        let built = q.build().unwrap();
        assert_eq!(built.sql, "SELECT $1");
        assert_eq!(built.params.len(), 1);
    }

    #[tokio::test]
    async fn exists_wraps_select() {
        let client = RecordingClient::with_rows(vec![vec![("exists", json!(true))]]);
        let mut q = sql("/* probe */ SELECT 1 FROM users WHERE id = ");
        q.push_bind(1i64);
        assert!(q.exists(&client).await.unwrap());
        assert_eq!(
            client.last().sql,
            "SELECT EXISTS(/* probe */ SELECT 1 FROM users WHERE id = $1)"
        );
    }

    #[tokio::test]
    async fn exists_rejects_non_select() {
        let client = RecordingClient::default();
        let q = sql("DELETE FROM users");
        assert!(q.exists(&client).await.is_err());
    }

    #[tokio::test]
    async fn scalar_reads_first_column() {
        let client = RecordingClient::with_rows(vec![vec![("count", json!(12))]]);
        let n: i64 = sql("SELECT COUNT(*) FROM users")
            .fetch_scalar_one(&client)
            .await
            .unwrap();
        assert_eq!(n, 12);
    }
}
