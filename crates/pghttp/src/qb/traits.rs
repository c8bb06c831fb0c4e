//! Trait definitions for query builders.

use crate::client::{BuiltQuery, GenericClient};
use crate::error::OrmResult;
use crate::qb::param::ParamList;
use crate::row::{FromRow, Row};
use std::future::Future;

/// Base trait for all query builders.
///
/// Implementors only render `(sql, params)`; execution and mapping are shared.
pub trait SqlQb: Sync {
    /// Render the statement and its parameters.
    fn build_parts(&self) -> (String, ParamList);

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> String {
        self.build_parts().0
    }

    /// Validate builder state before execution.
    fn validate(&self) -> OrmResult<()> {
        Ok(())
    }

    /// Validate and snapshot, e.g. for a transaction batch.
    fn build(&self) -> OrmResult<BuiltQuery> {
        self.validate()?;
        let (sql, params) = self.build_parts();
        Ok(BuiltQuery::new(sql, params.into_vec()))
    }

    /// Execute query and return all rows.
    fn query(&self, conn: &impl GenericClient) -> impl Future<Output = OrmResult<Vec<Row>>> + Send {
        async move {
            let built = self.build()?;
            conn.query(&built.sql, &built.params).await
        }
    }

    /// Execute query and return at most one row.
    fn query_opt(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Option<Row>>> + Send {
        async move {
            let built = self.build()?;
            conn.query_opt(&built.sql, &built.params).await
        }
    }

    /// Execute query and return the first row.
    fn query_one(&self, conn: &impl GenericClient) -> impl Future<Output = OrmResult<Row>> + Send {
        async move {
            let built = self.build()?;
            conn.query_one(&built.sql, &built.params).await
        }
    }

    /// Execute query and map all rows to `T`.
    fn fetch_all<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Vec<T>>> + Send {
        async move {
            let rows = self.query(conn).await?;
            rows.iter().map(T::from_row).collect()
        }
    }

    /// Execute query and map at most one row to `T`.
    fn fetch_opt<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<Option<T>>> + Send {
        async move {
            let row = self.query_opt(conn).await?;
            row.as_ref().map(T::from_row).transpose()
        }
    }

    /// Execute query and map the first row to `T`.
    fn fetch_one<T: FromRow>(
        &self,
        conn: &impl GenericClient,
    ) -> impl Future<Output = OrmResult<T>> + Send {
        async move {
            let row = self.query_one(conn).await?;
            T::from_row(&row)
        }
    }
}

/// Trait for mutation builders (INSERT/UPDATE/DELETE).
pub trait MutationQb: SqlQb {
    /// Execute and return affected row count.
    fn execute(&self, conn: &impl GenericClient) -> impl Future<Output = OrmResult<u64>> + Send {
        async move {
            let built = self.build()?;
            conn.execute(&built.sql, &built.params).await
        }
    }
}
