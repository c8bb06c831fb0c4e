//! # pghttp
//!
//! Postgres over HTTP, configured from the environment.
//!
//! ## Features
//!
//! - **Environment-driven init**: `DATABASE_URL` plus a mode flag (`APP_ENV` / `NODE_ENV`)
//! - **Local proxy**: in development, requests go to `http://...` on the same host and port
//! - **Lazy**: building the client performs no I/O; errors surface on first query
//! - **SQL explicit**: use `query()` / `sql()` or the query builders
//! - **Safe defaults**: DELETE requires WHERE, UPDATE requires SET
//!
//! ## Initialization
//!
//! ```ignore
//! use pghttp::{DatabaseConfig, GenericClient, SqlQb};
//!
//! let handles = pghttp::init(&DatabaseConfig::from_env())?;
//!
//! // Raw executor
//! let rows = handles.executor.query("SELECT now()", &[]).await?;
//!
//! // Query builder façade over the same executor
//! let active = handles
//!     .db
//!     .select("users")
//!     .eq("status", "active")
//!     .limit(10)
//!     .fetch_all::<User>(&handles.db)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod conn_string;
pub mod db;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod prelude;
pub mod proxy;
pub mod qb;
pub mod query;
pub mod row;
pub mod sql;
pub mod types;

pub use client::{BuiltQuery, GenericClient};
pub use config::{DatabaseConfig, Environment};
pub use conn_string::ConnectionInfo;
pub use db::{
    Database, DatabaseHandles, TransactionBatch, executor_settings, global, init, init_from_env,
    init_global,
};
pub use error::{OrmError, OrmResult};
pub use executor::{HttpExecutor, IsolationLevel, QueryResult, TransactionOptions};
pub use fetch::FetchOptions;
pub use proxy::rewrite_for_local_proxy;
pub use query::{Query, query};
pub use row::{Column, FromRow, Row};
pub use sql::{Sql, sql};
pub use types::{Param, ToParam};

pub use qb::{
    DeleteQb, Expr, ExprGroup, InsertQb, MutationQb, SelectQb, SqlQb, UpdateQb, delete,
    delete_from, insert, insert_into, select, select_from, update,
};
