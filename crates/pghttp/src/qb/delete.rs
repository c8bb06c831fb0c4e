//! DELETE query builder.

use crate::qb::expr::{ExprGroup, where_methods};
use crate::qb::param::ParamList;
use crate::qb::traits::{MutationQb, SqlQb};

/// DELETE query builder with expression-based WHERE.
///
/// Without any condition it renders `WHERE 1=0` unless
/// [`DeleteQb::allow_delete_all`] was set.
#[derive(Clone, Debug)]
pub struct DeleteQb {
    table: String,
    where_group: ExprGroup,
    returning_cols: Vec<String>,
    allow_delete_all: bool,
}

impl DeleteQb {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_group: ExprGroup::new(),
            returning_cols: Vec::new(),
            allow_delete_all: false,
        }
    }

    /// Permit an unfiltered `DELETE FROM t`.
    pub fn allow_delete_all(mut self, allow: bool) -> Self {
        self.allow_delete_all = allow;
        self
    }

    where_methods!();

    pub fn returning(mut self, cols: &str) -> Self {
        self.returning_cols = vec![cols.to_string()];
        self
    }
}

impl SqlQb for DeleteQb {
    fn build_parts(&self) -> (String, ParamList) {
        let mut params = ParamList::new();
        let mut sql = format!("DELETE FROM {}", self.table);

        let where_sql = self.where_group.build_into(&mut params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        } else if !self.allow_delete_all {
            sql.push_str(" WHERE 1=0");
        }

        if !self.returning_cols.is_empty() {
            sql.push_str(" RETURNING ");
            sql.push_str(&self.returning_cols.join(", "));
        }

        (sql, params)
    }
}

impl MutationQb for DeleteQb {}
