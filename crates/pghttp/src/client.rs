//! Generic client trait for unified database access.

use crate::error::{OrmError, OrmResult};
use crate::row::Row;
use crate::types::Param;
use std::future::Future;
use std::sync::Arc;

/// A SQL statement with its parameters, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Param>,
}

impl BuiltQuery {
    /// Create a new built query.
    pub fn new(sql: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// A trait that unifies everything that can run SQL.
///
/// Builders accept `&impl GenericClient`, so the same query can run against the
/// raw executor or the [`crate::Database`] façade.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Param]) -> impl Future<Output = OrmResult<u64>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns the first row (does **not** error)
    ///
    /// If you need strict row-count checking, use [`GenericClient::query_one_strict`].
    fn query_one(&self, sql: &str, params: &[Param]) -> impl Future<Output = OrmResult<Row>> + Send {
        async move {
            self.query(sql, params)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| OrmError::not_found("Expected 1 row, got 0"))
        }
    }

    /// Execute a query and require that it returns **exactly one** row.
    ///
    /// Semantics:
    /// - 0 rows: returns [`OrmError::NotFound`]
    /// - 1 row: returns that row
    /// - multiple rows: returns [`OrmError::TooManyRows`]
    fn query_one_strict(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = OrmResult<Row>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            let got = rows.len();
            let mut iter = rows.into_iter();
            match (iter.next(), got) {
                (None, _) => Err(OrmError::not_found("Expected 1 row, got 0")),
                (Some(row), 1) => Ok(row),
                (Some(_), got) => Err(OrmError::too_many_rows(1, got)),
            }
        }
    }

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = OrmResult<Option<Row>>> + Send {
        async move { Ok(self.query(sql, params).await?.into_iter().next()) }
    }
}

impl<C: GenericClient + ?Sized> GenericClient for &C {
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Param]) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }
}

impl<C: GenericClient + ?Sized> GenericClient for Arc<C> {
    fn query(
        &self,
        sql: &str,
        params: &[Param],
    ) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        (**self).query(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Param]) -> impl Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, params)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingClient;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn query_one_takes_first_row() {
        let client = RecordingClient::with_rows(vec![vec![("id", json!(1))], vec![("id", json!(2))]]);
        let row = client.query_one("SELECT id FROM t", &[]).await.unwrap();
        assert_eq!(row.try_get::<_, i64>("id").unwrap(), 1);
    }

    #[tokio::test]
    async fn query_one_on_empty_is_not_found() {
        let client = RecordingClient::default();
        let err = client.query_one("SELECT 1", &[]).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn strict_rejects_many_rows() {
        let client = RecordingClient::with_rows(vec![vec![("id", json!(1))], vec![("id", json!(2))]]);
        let err = client.query_one_strict("SELECT id FROM t", &[]).await.unwrap_err();
        assert!(matches!(err, OrmError::TooManyRows { expected: 1, got: 2 }));
    }

    #[tokio::test]
    async fn query_opt_on_empty_is_none() {
        let client = RecordingClient::default();
        assert!(client.query_opt("SELECT 1", &[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn references_and_arcs_delegate() {
        let client = Arc::new(RecordingClient::default());
        let by_ref = &client;
        by_ref.execute("DELETE FROM t", &[Param::new(&1i32)]).await.unwrap();
        assert_eq!(client.last().sql, "DELETE FROM t");
        assert_eq!(client.last().params, vec![Param::new(&1i32)]);
    }
}
