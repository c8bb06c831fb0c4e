//! Lightweight query builder for hand-written SQL

use crate::client::{BuiltQuery, GenericClient};
use crate::error::OrmResult;
use crate::row::{FromRow, Row};
use crate::types::{Param, ToParam};

/// A lightweight query builder for executing hand-written SQL with parameter binding.
///
/// # Example
///
/// ```ignore
/// use pghttp::query;
///
/// let user: User = query("SELECT * FROM users WHERE id = $1")
///     .bind(user_id)
///     .fetch_one_as(&db)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    sql: String,
    params: Vec<Param>,
}

/// Create a new query with the given SQL
pub fn query(sql: impl Into<String>) -> Query {
    Query {
        sql: sql.into(),
        params: Vec::new(),
    }
}

impl Query {
    /// Bind a parameter to the query
    pub fn bind<T: ToParam>(mut self, value: T) -> Self {
        self.params.push(Param::new(&value));
        self
    }

    /// The SQL text
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound parameters
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Snapshot for batching in a transaction
    pub fn build(&self) -> BuiltQuery {
        BuiltQuery::new(self.sql.clone(), self.params.clone())
    }

    /// Execute the query and return all rows
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> OrmResult<Vec<Row>> {
        conn.query(&self.sql, &self.params).await
    }

    /// Execute the query and return all rows mapped to type T
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<Vec<T>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute the query and return the first row
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> OrmResult<Row> {
        conn.query_one(&self.sql, &self.params).await
    }

    /// Execute the query and return the first row mapped to type T
    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl GenericClient) -> OrmResult<T> {
        let row = self.fetch_one(conn).await?;
        T::from_row(&row)
    }

    /// Execute the query and return at most one row
    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> OrmResult<Option<Row>> {
        conn.query_opt(&self.sql, &self.params).await
    }

    /// Execute the query and return at most one row mapped to type T
    pub async fn fetch_opt_as<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> OrmResult<Option<T>> {
        let row = self.fetch_opt(conn).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute the query and return the number of affected rows
    pub async fn execute(&self, conn: &impl GenericClient) -> OrmResult<u64> {
        conn.execute(&self.sql, &self.params).await
    }
}
