//! Convenient imports for typical `pghttp` usage.
//!
//! ```ignore
//! use pghttp::prelude::*;
//! ```

pub use crate::{
    Database, DatabaseConfig, FromRow, GenericClient, MutationQb, OrmError, OrmResult, Query, Row,
    Sql, SqlQb, init, query, sql,
};
