//! INSERT query builder.

use crate::error::OrmResult;
use crate::qb::param::ParamList;
use crate::qb::traits::{MutationQb, SqlQb};
use crate::qb::update::UpdateQb;
use crate::types::{Param, ToParam};
use serde::Serialize;

/// Conflict resolution action.
#[derive(Clone, Debug)]
pub enum ConflictAction {
    DoNothing,
    DoUpdate(UpdateQb),
}

#[derive(Clone, Debug)]
enum ValueExpr {
    Param(Param),
    Raw(String),
}

/// INSERT query builder.
///
/// With no columns set it renders `INSERT INTO t DEFAULT VALUES`.
#[derive(Clone, Debug)]
pub struct InsertQb {
    table: String,
    columns: Vec<String>,
    values: Vec<ValueExpr>,
    returning_cols: Vec<String>,
    conflict_target: Option<String>,
    conflict_action: Option<ConflictAction>,
}

impl InsertQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            values: Vec::new(),
            returning_cols: Vec::new(),
            conflict_target: None,
            conflict_action: None,
        }
    }

    fn push_value(mut self, column: &str, value: ValueExpr) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value);
        self
    }

    /// Set a column value.
    pub fn set<T: ToParam>(self, column: &str, value: T) -> Self {
        self.push_value(column, ValueExpr::Param(Param::new(&value)))
    }

    /// Set a column only when `value` is `Some`; otherwise the column default applies.
    pub fn set_opt<T: ToParam>(self, column: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set `value`, or `default` when it is `None`.
    pub fn set_default<T: ToParam>(self, column: &str, value: Option<T>, default: T) -> Self {
        self.set(column, value.unwrap_or(default))
    }

    /// Serialize `value` to JSON and set it.
    pub fn set_json<T: Serialize>(self, column: &str, value: &T) -> OrmResult<Self> {
        let json = serde_json::to_value(value)?;
        Ok(self.set(column, json))
    }

    /// Set a raw SQL expression (no params).
    pub fn set_raw(self, column: &str, expr: &str) -> Self {
        self.push_value(column, ValueExpr::Raw(expr.to_string()))
    }

    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }

    pub fn returning_cols(mut self, cols: &[&str]) -> Self {
        self.returning_cols = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Start an `ON CONFLICT <target>` clause, e.g. `"(email)"`.
    pub fn on_conflict(self, target: &str) -> OnConflictQb {
        OnConflictQb {
            builder: self,
            target: target.to_string(),
        }
    }
}

impl SqlQb for InsertQb {
    fn build_parts(&self) -> (String, ParamList) {
        let mut params = ParamList::new();

        let mut sql = if self.columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            let values: Vec<String> = self
                .values
                .iter()
                .map(|v| match v {
                    ValueExpr::Param(p) => format!("${}", params.push_param(p.clone())),
                    ValueExpr::Raw(raw) => raw.clone(),
                })
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                self.columns.join(", "),
                values.join(", ")
            )
        };

        if let Some(target) = &self.conflict_target {
            sql.push_str(" ON CONFLICT ");
            sql.push_str(target);
            match &self.conflict_action {
                Some(ConflictAction::DoNothing) | None => sql.push_str(" DO NOTHING"),
                Some(ConflictAction::DoUpdate(update)) => {
                    sql.push_str(" DO UPDATE");
                    let (set_sql, set_params) = update.build_for_conflict(params.len());
                    sql.push_str(&set_sql);
                    params.extend(&set_params);
                }
            }
        }

        if !self.returning_cols.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning_cols.join(", "));
        }

        (sql, params)
    }

    fn validate(&self) -> OrmResult<()> {
        if let Some(ConflictAction::DoUpdate(update)) = &self.conflict_action {
            update.validate()?;
        }
        Ok(())
    }
}

impl MutationQb for InsertQb {}

/// `ON CONFLICT` builder returned by [`InsertQb::on_conflict`].
pub struct OnConflictQb {
    builder: InsertQb,
    target: String,
}

impl OnConflictQb {
    pub fn do_nothing(mut self) -> InsertQb {
        self.builder.conflict_target = Some(self.target);
        self.builder.conflict_action = Some(ConflictAction::DoNothing);
        self.builder
    }

    /// Configure the `DO UPDATE SET` list, then call [`OnConflictUpdateQb::finish`].
    pub fn do_update(mut self) -> OnConflictUpdateQb {
        self.builder.conflict_target = Some(self.target);
        OnConflictUpdateQb {
            insert: self.builder,
            update: UpdateQb::new_for_conflict(),
        }
    }
}

/// Builder for `ON CONFLICT ... DO UPDATE`.
pub struct OnConflictUpdateQb {
    insert: InsertQb,
    update: UpdateQb,
}

impl OnConflictUpdateQb {
    pub fn set<T: ToParam>(mut self, column: &str, value: T) -> Self {
        self.update = self.update.set(column, value);
        self
    }

    pub fn set_raw(mut self, column: &str, expr: &str) -> Self {
        self.update = self.update.set_raw(column, expr);
        self
    }

    /// `column = EXCLUDED.column`
    pub fn set_excluded(self, column: &str) -> Self {
        let expr = format!("EXCLUDED.{}", column);
        self.set_raw(column, &expr)
    }

    pub fn finish(mut self) -> InsertQb {
        self.insert.conflict_action = Some(ConflictAction::DoUpdate(self.update));
        self.insert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;

    #[test]
    fn values_and_returning() {
        let qb = InsertQb::new("users")
            .set("username", "alice")
            .set_raw("created_at", "NOW()")
            .set("email", "alice@example.com")
            .returning("id");
        assert_eq!(
            qb.to_sql(),
            "INSERT INTO users (username, created_at, email) VALUES ($1, NOW(), $2) RETURNING id"
        );
    }

    #[test]
    fn default_values_when_empty() {
        assert_eq!(
            InsertQb::new("audit_log").to_sql(),
            "INSERT INTO audit_log DEFAULT VALUES"
        );
    }

    #[test]
    fn set_opt_and_default() {
        let qb = InsertQb::new("users")
            .set_opt::<&str>("nickname", None)
            .set_default("role", None, "member");
        let (sql, params) = qb.build_parts();
        assert_eq!(sql, "INSERT INTO users (role) VALUES ($1)");
        assert_eq!(params.as_slice()[0].as_text(), Some("member"));
    }

    #[test]
    fn on_conflict_do_nothing() {
        let qb = InsertQb::new("users")
            .set("username", "alice")
            .on_conflict("(username)")
            .do_nothing();
        assert_eq!(
            qb.to_sql(),
            "INSERT INTO users (username) VALUES ($1) ON CONFLICT (username) DO NOTHING"
        );
    }

    #[test]
    fn on_conflict_do_update_numbers_after_values() {
        let qb = InsertQb::new("users")
            .set("username", "alice")
            .set("email", "alice@example.com")
            .on_conflict("(username)")
            .do_update()
            .set_excluded("email")
            .set("login_count", 1i32)
            .finish()
            .returning("id");
        let (sql, params) = qb.build_parts();
        assert_eq!(
            sql,
            "INSERT INTO users (username, email) VALUES ($1, $2) ON CONFLICT (username) DO UPDATE SET email = EXCLUDED.email, login_count = $3 RETURNING id"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_do_update_is_rejected() {
        let qb = InsertQb::new("users")
            .set("username", "alice")
            .on_conflict("(username)")
            .do_update()
            .finish();
        assert!(matches!(qb.build(), Err(OrmError::Validation(_))));
    }
}
