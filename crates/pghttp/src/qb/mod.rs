//! Query builders that render `$n`-numbered SQL plus text parameters.
//!
//! Every builder implements [`SqlQb`], so it can run on anything that
//! implements [`crate::GenericClient`]: the raw executor or the
//! [`crate::Database`] façade.
//!
//! ```ignore
//! use pghttp::qb::{self, MutationQb, SqlQb};
//!
//! let users: Vec<User> = qb::select("users")
//!     .eq("status", "active")
//!     .order_by("created_at DESC")
//!     .limit(20)
//!     .fetch_all(&db)
//!     .await?;
//!
//! qb::update("users")
//!     .set("status", "inactive")
//!     .eq("id", user_id)
//!     .execute(&db)
//!     .await?;
//! ```

mod delete;
mod expr;
mod insert;
mod param;
mod select;
mod traits;
mod update;

pub use delete::DeleteQb;
pub use expr::{Expr, ExprGroup};
pub use insert::{ConflictAction, InsertQb, OnConflictQb, OnConflictUpdateQb};
pub use param::ParamList;
pub use select::SelectQb;
pub use traits::{MutationQb, SqlQb};
pub use update::UpdateQb;

/// SELECT from a table.
pub fn select(table: &str) -> SelectQb {
    SelectQb::new(table)
}

/// SELECT with a custom FROM expression, e.g. `"users u"`.
pub fn select_from(from_expr: &str) -> SelectQb {
    SelectQb::from(from_expr)
}

pub fn insert(table: &str) -> InsertQb {
    InsertQb::new(table)
}

/// Alias for [`insert`].
pub fn insert_into(table: &str) -> InsertQb {
    InsertQb::new(table)
}

pub fn update(table: &str) -> UpdateQb {
    UpdateQb::new(table)
}

/// DELETE from a table. Without conditions this renders `WHERE 1=0`.
pub fn delete(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}

/// Alias for [`delete`].
pub fn delete_from(table: &str) -> DeleteQb {
    DeleteQb::new(table)
}

#[cfg(test)]
mod tests;
