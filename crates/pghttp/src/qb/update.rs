//! UPDATE query builder.

use crate::error::{OrmError, OrmResult};
use crate::qb::expr::{ExprGroup, where_methods};
use crate::qb::param::ParamList;
use crate::qb::traits::{MutationQb, SqlQb};
use crate::types::{Param, ToParam};
use serde::Serialize;

#[derive(Clone, Debug)]
enum SetField {
    Value(Param),
    Raw(String),
}

/// UPDATE query builder with expression-based WHERE.
#[derive(Clone, Debug)]
pub struct UpdateQb {
    /// Empty when used as the SET list of `ON CONFLICT DO UPDATE`.
    table: String,
    set_fields: Vec<(String, SetField)>,
    where_group: ExprGroup,
    returning_cols: Vec<String>,
}

impl UpdateQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            set_fields: Vec::new(),
            where_group: ExprGroup::new(),
            returning_cols: Vec::new(),
        }
    }

    /// SET list for `INSERT ... ON CONFLICT DO UPDATE`.
    pub(crate) fn new_for_conflict() -> Self {
        Self::new("")
    }

    /// Set a column value.
    pub fn set<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Value(Param::new(&value))));
        self
    }

    /// Set a column only when `value` is `Some`.
    pub fn set_opt<T: ToParam>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Serialize `value` to JSON and set it.
    pub fn set_json<T: Serialize>(self, column: &str, value: &T) -> OrmResult<Self> {
        let json = serde_json::to_value(value)?;
        Ok(self.set(column, json))
    }

    /// Set a raw SQL expression, e.g. `NOW()`.
    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.set_fields
            .push((column.to_string(), SetField::Raw(expr.to_string())));
        self
    }

    where_methods!();

    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }

    fn render_set(&self, params: &mut ParamList) -> String {
        self.set_fields
            .iter()
            .map(|(col, field)| match field {
                SetField::Value(param) => format!("{} = ${}", col, params.push_param(param.clone())),
                SetField::Raw(expr) => format!("{} = {}", col, expr),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// ` SET ...` numbered after `offset` existing params, for ON CONFLICT.
    pub(crate) fn build_for_conflict(&self, offset: usize) -> (String, ParamList) {
        let mut params = ParamList::with_offset(offset);
        let set_sql = self.render_set(&mut params);
        if set_sql.is_empty() {
            return (String::new(), params);
        }
        (format!(" SET {}", set_sql), params)
    }
}

impl SqlQb for UpdateQb {
    fn build_parts(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let set_sql = self.render_set(&mut params);
        let mut sql = format!("UPDATE {} SET {}", self.table, set_sql);

        let where_sql = self.where_group.build_into(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        if !self.returning_cols.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning_cols.join(", "));
        }

        (sql, params)
    }

    fn validate(&self) -> OrmResult<()> {
        if self.set_fields.is_empty() {
            return Err(OrmError::validation("UpdateQb: SET clause cannot be empty"));
        }
        Ok(())
    }
}

impl MutationQb for UpdateQb {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::RecordingClient;

    #[test]
    fn set_then_where_numbering() {
        let qb = UpdateQb::new("users")
            .set("name", "Alice")
            .set_raw("updated_at", "NOW()")
            .set("email", "alice@example.com")
            .eq("id", 1i64)
            .returning("*");
        assert_eq!(
            qb.to_sql(),
            "UPDATE users SET name = $1, updated_at = NOW(), email = $2 WHERE id = $3 RETURNING *"
        );
    }

    #[test]
    fn in_list_after_set() {
        let qb = UpdateQb::new("users")
            .set("status", "inactive")
            .in_list("role", ["user", "guest"]);
        assert_eq!(
            qb.to_sql(),
            "UPDATE users SET status = $1 WHERE role IN ($2, $3)"
        );
    }

    #[test]
    fn empty_set_fails_validation() {
        let err = UpdateQb::new("users").eq("id", 1).build().unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
    }

    #[test]
    fn conflict_set_uses_offset() {
        let qb = UpdateQb::new_for_conflict()
            .set("email", "new@example.com")
            .set_raw("name", "EXCLUDED.name");
        let (sql, params) = qb.build_for_conflict(2);
        assert_eq!(sql, " SET email = $3, name = EXCLUDED.name");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn set_json_encodes_value() {
        let qb = UpdateQb::new("docs")
            .set_json("body", &serde_json::json!({"a": 1}))
            .unwrap();
        let (_, params) = qb.build_parts();
        assert_eq!(params.as_slice()[0].as_text(), Some(r#"{"a":1}"#));
    }

    #[tokio::test]
    async fn execute_returns_affected_rows() {
        let client = RecordingClient {
            affected: 3,
            ..RecordingClient::default()
        };
        let n = UpdateQb::new("users")
            .set("active", false)
            .execute(&client)
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(client.last().sql, "UPDATE users SET active = $1");
    }
}
