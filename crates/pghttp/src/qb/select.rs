//! SELECT query builder.

use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::qb::expr::{ExprGroup, where_methods};
use crate::qb::param::ParamList;
use crate::qb::traits::SqlQb;
use crate::types::ToParam;

/// SELECT query builder with expression-based WHERE/HAVING.
///
/// LIMIT and OFFSET are rendered as literals; every other value is bound.
#[derive(Clone, Debug)]
pub struct SelectQb {
    from_expr: String,
    select_cols: Vec<String>,
    join_clauses: Vec<String>,
    where_group: ExprGroup,
    order_clauses: Vec<String>,
    group_by: Option<String>,
    having_group: ExprGroup,
    limit: Option<i64>,
    offset: Option<i64>,
    page_error: Option<String>,
}

impl SelectQb {
    /// Create a new SELECT query builder for a table.
    pub fn new(table: &str) -> Self {
        Self::from(table)
    }

    /// Create a SELECT query builder with a custom FROM expression
    /// (aliases, subqueries).
    #[allow(clippy::should_implement_trait)]
    pub fn from(from_expr: &str) -> Self {
        Self {
            from_expr: from_expr.to_string(),
            select_cols: vec!["*".to_string()],
            join_clauses: Vec::new(),
            where_group: ExprGroup::new(),
            order_clauses: Vec::new(),
            group_by: None,
            having_group: ExprGroup::new(),
            limit: None,
            offset: None,
            page_error: None,
        }
    }

    /// Replace the column list (string form, supports complex expressions).
    pub fn select(mut self, cols: &str) -> Self {
        self.select_cols = vec![cols.to_string()];
        self
    }

    pub fn select_cols(mut self, cols: &[&str]) -> Self {
        self.select_cols = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Append a column; the first call replaces the default `*`.
    pub fn add_select(mut self, col: &str) -> Self {
        if self.select_cols == ["*"] {
            self.select_cols.clear();
        }
        self.select_cols.push(col.to_string());
        self
    }

    fn join(mut self, kind: &str, table: &str, on: &str) -> Self {
        self.join_clauses
            .push(format!("{} JOIN {} ON {}", kind, table, on));
        self
    }

    pub fn inner_join(self, table: &str, on: &str) -> Self {
        self.join("INNER", table, on)
    }

    pub fn left_join(self, table: &str, on: &str) -> Self {
        self.join("LEFT", table, on)
    }

    pub fn right_join(self, table: &str, on: &str) -> Self {
        self.join("RIGHT", table, on)
    }

    pub fn full_join(self, table: &str, on: &str) -> Self {
        self.join("FULL OUTER", table, on)
    }

    where_methods!();

    /// Add WHERE: column LIKE pattern
    pub fn like<T: ToParam>(mut self, column: &str, pattern: T) -> Self {
        self.where_group.like(column, pattern);
        self
    }

    /// Add WHERE: column ILIKE pattern
    pub fn ilike<T: ToParam>(mut self, column: &str, pattern: T) -> Self {
        self.where_group.ilike(column, pattern);
        self
    }

    pub fn not_like<T: ToParam>(mut self, column: &str, pattern: T) -> Self {
        self.where_group.not_like(column, pattern);
        self
    }

    pub fn not_ilike<T: ToParam>(mut self, column: &str, pattern: T) -> Self {
        self.where_group.not_ilike(column, pattern);
        self
    }

    pub fn between<T: ToParam>(mut self, column: &str, from: T, to: T) -> Self {
        self.where_group.between(column, from, to);
        self
    }

    pub fn not_between<T: ToParam>(mut self, column: &str, from: T, to: T) -> Self {
        self.where_group.not_between(column, from, to);
        self
    }

    /// Search several columns with one ILIKE pattern (ORed).
    pub fn multi_ilike<T: ToParam>(mut self, columns: &[&str], pattern: T) -> Self {
        self.where_group.multi_ilike(columns, pattern);
        self
    }

    // Optional filters: `None` leaves the query unchanged.

    pub fn eq_opt<T: ToParam>(mut self, column: &str, value: Option<T>) -> Self {
        self.where_group.eq_opt(column, value);
        self
    }

    pub fn like_opt<T: ToParam>(mut self, column: &str, pattern: Option<T>) -> Self {
        self.where_group.like_opt(column, pattern);
        self
    }

    pub fn ilike_opt<T: ToParam>(mut self, column: &str, pattern: Option<T>) -> Self {
        self.where_group.ilike_opt(column, pattern);
        self
    }

    pub fn gt_opt<T: ToParam>(mut self, column: &str, value: Option<T>) -> Self {
        self.where_group.gt_opt(column, value);
        self
    }

    pub fn gte_opt<T: ToParam>(mut self, column: &str, value: Option<T>) -> Self {
        self.where_group.gte_opt(column, value);
        self
    }

    pub fn lt_opt<T: ToParam>(mut self, column: &str, value: Option<T>) -> Self {
        self.where_group.lt_opt(column, value);
        self
    }

    pub fn lte_opt<T: ToParam>(mut self, column: &str, value: Option<T>) -> Self {
        self.where_group.lte_opt(column, value);
        self
    }

    pub fn in_opt<T: ToParam>(mut self, column: &str, values: Option<Vec<T>>) -> Self {
        self.where_group.in_opt(column, values);
        self
    }

    pub fn multi_ilike_opt<T: ToParam>(mut self, columns: &[&str], pattern: Option<T>) -> Self {
        self.where_group.multi_ilike_opt(columns, pattern);
        self
    }

    /// Add an ORDER BY clause verbatim.
    pub fn order_by(mut self, clause: &str) -> Self {
        self.order_clauses.push(clause.to_string());
        self
    }

    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(&format!("{} ASC", column))
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(&format!("{} DESC", column))
    }

    pub fn group_by(mut self, clause: &str) -> Self {
        self.group_by = Some(clause.to_string());
        self
    }

    pub fn having_eq<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.having_group.eq(column, value);
        self
    }

    pub fn having_gt<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.having_group.gt(column, value);
        self
    }

    pub fn having_gte<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.having_group.gte(column, value);
        self
    }

    pub fn having_lt<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.having_group.lt(column, value);
        self
    }

    pub fn having_lte<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.having_group.lte(column, value);
        self
    }

    /// HAVING condition with `?` placeholders.
    pub fn having_template<T: ToParam>(
        mut self,
        sql: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.having_group.template(sql, values);
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: i64) -> Self {
        self.offset = Some(n);
        self
    }

    /// 1-based pagination; both arguments are clamped to at least 1.
    ///
    /// An offset that overflows `i64` is reported by `validate()`.
    pub fn paginate(mut self, page: i64, per_page: i64) -> Self {
        let size = per_page.max(1);
        self.limit = Some(size);
        match (page.max(1) - 1).checked_mul(size) {
            Some(offset) => {
                self.offset = Some(offset);
                self.page_error = None;
            }
            None => {
                self.offset = None;
                self.page_error = Some(format!(
                    "SelectQb: page {} with {} per page overflows the offset",
                    page, size
                ));
            }
        }
        self
    }

    /// Render FROM, JOIN, WHERE, GROUP BY and HAVING after `SELECT <head>`.
    fn render_core(&self, head: &str, params: &mut ParamList) -> String {
        let mut sql = format!("SELECT {} FROM {}", head, self.from_expr);

        for join in &self.join_clauses {
            sql.push(' ');
            sql.push_str(join);
        }

        let where_sql = self.where_group.build_into(params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if let Some(group) = &self.group_by {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }

        let having_sql = self.having_group.build_into(params);
        if !having_sql.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&having_sql);
        }

        sql
    }

    /// COUNT(*) over the same filters; grouped queries are counted as a subquery.
    pub fn build_count(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let sql = if self.group_by.is_some() || !self.having_group.is_empty() {
            let inner = self.render_core("1", &mut params);
            format!("SELECT COUNT(*) FROM ({}) AS t", inner)
        } else {
            self.render_core("COUNT(*)", &mut params)
        };
        (sql, params)
    }

    pub fn to_count_sql(&self) -> String {
        self.build_count().0
    }

    /// Execute the COUNT query.
    pub async fn count(&self, conn: &impl GenericClient) -> OrmResult<i64> {
        let (sql, params) = self.build_count();
        let row = conn.query_one(&sql, params.as_slice()).await?;
        row.try_get(0usize)
    }
}

impl SqlQb for SelectQb {
    fn validate(&self) -> OrmResult<()> {
        match &self.page_error {
            Some(msg) => Err(OrmError::validation(msg.clone())),
            None => Ok(()),
        }
    }

    fn build_parts(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let mut sql = self.render_core(&self.select_cols.join(", "), &mut params);

        if !self.order_clauses.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_clauses.join(", "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        (sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingClient;
    use crate::types::Param;
    use serde_json::json;

    #[test]
    fn select_star_by_default() {
        assert_eq!(SelectQb::new("users").to_sql(), "SELECT * FROM users");
    }

    #[test]
    fn where_and_join() {
        let qb = SelectQb::from("users u")
            .inner_join("orders o", "u.id = o.user_id")
            .eq("u.status", "active")
            .gt("o.total", 10i32);
        assert_eq!(
            qb.to_sql(),
            "SELECT * FROM users u INNER JOIN orders o ON u.id = o.user_id WHERE u.status = $1 AND o.total > $2"
        );
    }

    #[test]
    fn add_select_replaces_star() {
        let qb = SelectQb::new("users").add_select("id").add_select("name");
        assert_eq!(qb.to_sql(), "SELECT id, name FROM users");
    }

    #[test]
    fn order_limit_offset_are_literal() {
        let qb = SelectQb::new("users")
            .order_by_desc("created_at")
            .limit(10)
            .offset(20);
        let (sql, params) = qb.build_parts();
        assert_eq!(
            sql,
            "SELECT * FROM users ORDER BY created_at DESC LIMIT 10 OFFSET 20"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn having_continues_numbering() {
        let qb = SelectQb::new("orders")
            .select("user_id, COUNT(*)")
            .eq("status", "paid")
            .group_by("user_id")
            .having_gt("COUNT(*)", 5i64);
        assert_eq!(
            qb.to_sql(),
            "SELECT user_id, COUNT(*) FROM orders WHERE status = $1 GROUP BY user_id HAVING COUNT(*) > $2"
        );
    }

    #[test]
    fn count_sql_simple_and_grouped() {
        let simple = SelectQb::new("users").eq("status", "active").limit(5);
        assert_eq!(
            simple.to_count_sql(),
            "SELECT COUNT(*) FROM users WHERE status = $1"
        );

        let grouped = SelectQb::new("orders").group_by("user_id");
        assert_eq!(
            grouped.to_count_sql(),
            "SELECT COUNT(*) FROM (SELECT 1 FROM orders GROUP BY user_id) AS t"
        );
    }

    #[test]
    fn paginate_clamps() {
        assert_eq!(
            SelectQb::new("users").paginate(2, 10).to_sql(),
            "SELECT * FROM users LIMIT 10 OFFSET 10"
        );
        assert_eq!(
            SelectQb::new("users").paginate(0, 0).to_sql(),
            "SELECT * FROM users LIMIT 1 OFFSET 0"
        );
    }

    #[test]
    fn paginate_overflow_fails_validation() {
        let qb = SelectQb::new("users").paginate(i64::MAX, 1000);
        assert!(matches!(qb.validate(), Err(OrmError::Validation(_))));
        assert!(qb.build().is_err());

        let qb = qb.paginate(3, 25);
        assert!(qb.validate().is_ok());
        assert_eq!(qb.to_sql(), "SELECT * FROM users LIMIT 25 OFFSET 50");
    }

    #[test]
    fn optional_filters() {
        let qb = SelectQb::new("users")
            .eq_opt("status", Some("active"))
            .eq_opt::<&str>("name", None)
            .ilike_opt("email", Some("%@corp%"));
        assert_eq!(
            qb.to_sql(),
            "SELECT * FROM users WHERE status = $1 AND email ILIKE $2"
        );
    }

    #[tokio::test]
    async fn fetch_sends_bound_params() {
        let client = RecordingClient::with_rows(vec![vec![("id", json!(1))]]);
        let rows = SelectQb::new("users")
            .eq("id", 1i64)
            .query(&client)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let call = client.last();
        assert_eq!(call.sql, "SELECT * FROM users WHERE id = $1");
        assert_eq!(call.params, vec![Param::new(&1i64)]);
    }

    #[tokio::test]
    async fn count_reads_first_column() {
        let client = RecordingClient::with_rows(vec![vec![("count", json!(7))]]);
        let n = SelectQb::new("users").count(&client).await.unwrap();
        assert_eq!(n, 7);
    }
}
