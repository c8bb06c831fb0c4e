//! Client initialization and the query-builder façade.
//!
//! [`init`] turns a [`DatabaseConfig`] into two handles: the raw
//! [`HttpExecutor`] and a [`Database`] wrapping that same instance.
//!
//! ```ignore
//! use pghttp::{DatabaseConfig, SqlQb};
//!
//! let handles = pghttp::init(&DatabaseConfig::from_env())?;
//! let users: Vec<User> = handles.db.select("users").eq("active", true).fetch_all(&handles.db).await?;
//! ```

use crate::client::{BuiltQuery, GenericClient};
use crate::config::{DATABASE_URL_VAR, DatabaseConfig};
use crate::error::{OrmError, OrmResult};
use crate::executor::{HttpExecutor, IsolationLevel, QueryResult, TransactionOptions};
use crate::fetch::FetchOptions;
use crate::proxy::rewrite_for_local_proxy;
use crate::qb::{self, DeleteQb, InsertQb, SelectQb, UpdateQb};
use crate::query::{Query, query};
use crate::row::Row;
use crate::sql::{Sql, sql};
use crate::types::Param;
use std::sync::{Arc, OnceLock};

/// Query-builder façade over a shared [`HttpExecutor`].
#[derive(Debug, Clone)]
pub struct Database {
    executor: Arc<HttpExecutor>,
}

impl Database {
    pub fn new(executor: Arc<HttpExecutor>) -> Self {
        Self { executor }
    }

    /// The executor this façade sends through.
    pub fn executor(&self) -> &Arc<HttpExecutor> {
        &self.executor
    }

    pub fn select(&self, table: &str) -> SelectQb {
        qb::select(table)
    }

    pub fn insert(&self, table: &str) -> InsertQb {
        qb::insert(table)
    }

    pub fn update(&self, table: &str) -> UpdateQb {
        qb::update(table)
    }

    pub fn delete(&self, table: &str) -> DeleteQb {
        qb::delete(table)
    }

    /// Start a dynamic [`Sql`] statement.
    pub fn sql(&self, initial_sql: impl Into<String>) -> Sql {
        sql(initial_sql)
    }

    /// Start a hand-written [`Query`] with `$n` placeholders.
    ///
    /// Named `raw` so it does not shadow [`GenericClient::query`].
    pub fn raw(&self, sql: impl Into<String>) -> Query {
        query(sql)
    }

    /// Collect statements to run atomically in one request.
    pub fn transaction(&self) -> TransactionBatch<'_> {
        TransactionBatch {
            db: self,
            statements: Vec::new(),
            options: TransactionOptions::default(),
        }
    }
}

impl GenericClient for Database {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Row>> {
        self.executor.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        self.executor.execute(sql, params).await
    }
}

/// A batch of statements committed together, built by [`Database::transaction`].
///
/// ```ignore
/// let results = db
///     .transaction()
///     .add(qb::insert("accounts").set("id", 1).build()?)
///     .add(query("UPDATE totals SET n = n + 1").build())
///     .isolation(IsolationLevel::Serializable)
///     .run()
///     .await?;
/// ```
#[derive(Debug)]
pub struct TransactionBatch<'a> {
    db: &'a Database,
    statements: Vec<BuiltQuery>,
    options: TransactionOptions,
}

impl TransactionBatch<'_> {
    pub fn add(mut self, statement: BuiltQuery) -> Self {
        self.statements.push(statement);
        self
    }

    pub fn push(&mut self, statement: BuiltQuery) -> &mut Self {
        self.statements.push(statement);
        self
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.options.isolation_level = Some(level);
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.options.read_only = read_only;
        self
    }

    pub fn deferrable(mut self, deferrable: bool) -> Self {
        self.options.deferrable = deferrable;
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Send the batch. An empty batch returns no results without a request.
    pub async fn run(self) -> OrmResult<Vec<QueryResult>> {
        if self.statements.is_empty() {
            return Ok(Vec::new());
        }
        self.db
            .executor
            .transaction(&self.statements, self.options)
            .await
    }
}

/// The two handles produced by [`init`].
#[derive(Debug, Clone)]
pub struct DatabaseHandles {
    /// Raw SQL executor.
    pub executor: Arc<HttpExecutor>,
    /// Query-builder façade over `executor`.
    pub db: Database,
}

/// Connection string and transport options the executor is built with.
///
/// The connection string is always the raw configured value. In development
/// the request URL is overridden with its local-proxy rewrite. Certificate
/// verification is disabled in every mode.
pub fn executor_settings(config: &DatabaseConfig) -> OrmResult<(String, FetchOptions)> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| OrmError::config(format!("{} is not set", DATABASE_URL_VAR)))?;

    let mut options = FetchOptions::local_proxy();
    if config.environment.is_development() {
        options = options.endpoint(rewrite_for_local_proxy(url));
    }
    Ok((url.to_string(), options))
}

/// Build the executor and the façade from `config`. Performs no network I/O.
pub fn init(config: &DatabaseConfig) -> OrmResult<DatabaseHandles> {
    let (connection_string, options) = executor_settings(config)?;

    if options.accept_invalid_certs {
        tracing::warn!(
            target: "pghttp",
            "TLS certificate verification is disabled; only use this with a trusted local proxy"
        );
    }
    tracing::info!(
        target: "pghttp",
        environment = %config.environment,
        endpoint_override = options.endpoint.is_some(),
        "database client initialized"
    );

    let executor = Arc::new(HttpExecutor::new(connection_string, options)?);
    let db = Database::new(Arc::clone(&executor));
    Ok(DatabaseHandles { executor, db })
}

/// [`init`] with configuration read from the process environment.
pub fn init_from_env() -> OrmResult<DatabaseHandles> {
    init(&DatabaseConfig::from_env())
}

static GLOBAL: OnceLock<DatabaseHandles> = OnceLock::new();

/// Initialize the process-wide handles once.
///
/// Later calls return the stored handles and ignore `config`.
pub fn init_global(config: &DatabaseConfig) -> OrmResult<&'static DatabaseHandles> {
    if let Some(handles) = GLOBAL.get() {
        return Ok(handles);
    }
    let handles = init(config)?;
    Ok(GLOBAL.get_or_init(|| handles))
}

/// The process-wide handles, if [`init_global`] has succeeded.
pub fn global() -> Option<&'static DatabaseHandles> {
    GLOBAL.get()
}
