//! SQL executor over HTTP.
//!
//! Each query is a single `POST` carrying the SQL text and its parameters as
//! JSON. The connection string travels in the `Neon-Connection-String` header;
//! the endpoint authenticates and runs the statement on our behalf.
//!
//! # Example
//!
//! ```ignore
//! use pghttp::{FetchOptions, GenericClient, HttpExecutor, Param};
//!
//! let sql = HttpExecutor::new(std::env::var("DATABASE_URL")?, FetchOptions::default())?;
//! let rows = sql.query("SELECT id FROM users WHERE email = $1", &[Param::new("a@b.c")]).await?;
//! ```

use crate::client::{BuiltQuery, GenericClient};
use crate::error::{OrmError, OrmResult};
use crate::fetch::FetchOptions;
use crate::row::{Column, Row};
use crate::types::{Param, decode_text};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

const CONNECTION_STRING_HEADER: &str = "Neon-Connection-String";
const RAW_TEXT_OUTPUT_HEADER: &str = "Neon-Raw-Text-Output";
const ARRAY_MODE_HEADER: &str = "Neon-Array-Mode";
const BATCH_ISOLATION_LEVEL_HEADER: &str = "Neon-Batch-Isolation-Level";
const BATCH_READ_ONLY_HEADER: &str = "Neon-Batch-Read-Only";
const BATCH_DEFERRABLE_HEADER: &str = "Neon-Batch-Deferrable";

/// Maximum SQL length (in bytes) written to debug logs.
const LOG_SQL_MAX_LEN: usize = 200;

/// Transaction isolation level for batched statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    fn as_header(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "ReadUncommitted",
            Self::ReadCommitted => "ReadCommitted",
            Self::RepeatableRead => "RepeatableRead",
            Self::Serializable => "Serializable",
        }
    }
}

/// Options for [`HttpExecutor::transaction`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Isolation level. `None` uses the server default.
    pub isolation_level: Option<IsolationLevel>,
    pub read_only: bool,
    /// Only meaningful together with `Serializable` and `read_only`.
    pub deferrable: bool,
}

/// The full outcome of one statement.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Command tag, e.g. `SELECT` or `INSERT`.
    pub command: String,
    /// Rows affected (or returned, for `SELECT`).
    pub row_count: u64,
    pub columns: Arc<[Column]>,
    pub rows: Vec<Row>,
}

/// Executes SQL against an HTTP endpoint.
///
/// Construction performs no network I/O: the connection string is parsed and
/// the endpoint resolved on each request, so configuration problems surface
/// on first use.
#[derive(Clone)]
pub struct HttpExecutor {
    connection_string: String,
    options: FetchOptions,
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExecutor")
            .field("connection_string", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

#[derive(Serialize)]
struct WireQuery<'a> {
    query: &'a str,
    params: Vec<Value>,
}

impl<'a> WireQuery<'a> {
    fn new(sql: &'a str, params: &[Param]) -> Self {
        Self {
            query: sql,
            params: params.iter().map(Param::to_json).collect(),
        }
    }
}

#[derive(Serialize)]
struct WireBatch<'a> {
    queries: Vec<WireQuery<'a>>,
}

#[derive(Deserialize)]
struct WireField {
    name: String,
    #[serde(rename = "dataTypeID", default)]
    data_type_id: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    row_count: Option<u64>,
    #[serde(default)]
    fields: Vec<WireField>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct WireBatchResult {
    results: Vec<WireResult>,
}

#[derive(Deserialize)]
struct WireError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    constraint: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl WireResult {
    fn into_result(self) -> OrmResult<QueryResult> {
        let columns: Arc<[Column]> = self
            .fields
            .into_iter()
            .map(|f| Column {
                name: f.name,
                type_oid: f.data_type_id,
            })
            .collect();

        let mut rows = Vec::with_capacity(self.rows.len());
        for cells in self.rows {
            if cells.len() != columns.len() {
                return Err(OrmError::decode(
                    "*",
                    format!("row has {} values, expected {}", cells.len(), columns.len()),
                ));
            }
            let values = cells
                .into_iter()
                .zip(columns.iter())
                .map(|(cell, col)| match cell {
                    Value::String(text) => decode_text(col.type_oid, Some(&text)),
                    other => other,
                })
                .collect();
            rows.push(Row::new(columns.clone(), values));
        }

        Ok(QueryResult {
            command: self.command.unwrap_or_default(),
            row_count: self.row_count.unwrap_or(rows.len() as u64),
            columns,
            rows,
        })
    }
}

impl HttpExecutor {
    /// Create an executor bound to a connection string.
    ///
    /// Fails only if the HTTP client itself cannot be built.
    pub fn new(connection_string: impl Into<String>, options: FetchOptions) -> OrmResult<Self> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            connection_string: connection_string.into(),
            options,
            http,
        })
    }

    /// The connection string exactly as given at construction.
    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Transport options in effect.
    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Run one statement and return its full result.
    pub async fn run(&self, sql: &str, params: &[Param]) -> OrmResult<QueryResult> {
        tracing::debug!(
            target: "pghttp.sql",
            param_count = params.len(),
            sql = %truncate_sql(sql, LOG_SQL_MAX_LEN),
        );
        let body = self.post(HeaderMap::new(), &WireQuery::new(sql, params)).await?;
        let result: WireResult = serde_json::from_str(&body)?;
        result.into_result()
    }

    /// Run several statements in one transaction.
    ///
    /// Either every statement commits or none do. Results are returned in
    /// statement order.
    pub async fn transaction(
        &self,
        statements: &[BuiltQuery],
        options: TransactionOptions,
    ) -> OrmResult<Vec<QueryResult>> {
        tracing::debug!(
            target: "pghttp.sql",
            statements = statements.len(),
            isolation_level = ?options.isolation_level,
            read_only = options.read_only,
            "transaction",
        );

        let mut headers = HeaderMap::new();
        if let Some(level) = options.isolation_level {
            headers.insert(
                BATCH_ISOLATION_LEVEL_HEADER,
                HeaderValue::from_static(level.as_header()),
            );
        }
        headers.insert(BATCH_READ_ONLY_HEADER, bool_header(options.read_only));
        headers.insert(BATCH_DEFERRABLE_HEADER, bool_header(options.deferrable));

        let batch = WireBatch {
            queries: statements
                .iter()
                .map(|q| WireQuery::new(&q.sql, &q.params))
                .collect(),
        };
        let body = self.post(headers, &batch).await?;
        let response: WireBatchResult = serde_json::from_str(&body)?;
        if response.results.len() != statements.len() {
            return Err(OrmError::Connection(format!(
                "transaction returned {} results for {} statements",
                response.results.len(),
                statements.len()
            )));
        }
        response
            .results
            .into_iter()
            .map(WireResult::into_result)
            .collect()
    }

    async fn post<B: Serialize>(&self, extra_headers: HeaderMap, body: &B) -> OrmResult<String> {
        let endpoint = self.options.resolve_endpoint(&self.connection_string)?;
        let connection_string = HeaderValue::from_str(&self.connection_string).map_err(|_| {
            OrmError::Connection("connection string is not a valid header value".to_string())
        })?;

        let response = self
            .http
            .post(&endpoint)
            .header(CONNECTION_STRING_HEADER, connection_string)
            .header(RAW_TEXT_OUTPUT_HEADER, "true")
            .header(ARRAY_MODE_HEADER, "true")
            .headers(extra_headers)
            .json(body)
            .send()
            .await
            .inspect_err(|e| tracing::warn!(target: "pghttp.sql", error = %e, "request failed"))?;

        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }

        let err = match serde_json::from_str::<WireError>(&text) {
            Ok(e) => OrmError::from_db_error(e.code, e.message, e.constraint, e.detail),
            Err(_) => OrmError::Connection(format!("HTTP {}: {}", status, text.trim())),
        };
        tracing::warn!(target: "pghttp.sql", %status, error = %err, "query failed");
        Err(err)
    }
}

impl GenericClient for HttpExecutor {
    async fn query(&self, sql: &str, params: &[Param]) -> OrmResult<Vec<Row>> {
        Ok(self.run(sql, params).await?.rows)
    }

    async fn execute(&self, sql: &str, params: &[Param]) -> OrmResult<u64> {
        Ok(self.run(sql, params).await?.row_count)
    }
}

fn bool_header(value: bool) -> HeaderValue {
    HeaderValue::from_static(if value { "true" } else { "false" })
}

/// Truncate to at most `max` bytes on a char boundary, appending `...` when cut.
fn truncate_sql(sql: &str, max: usize) -> std::borrow::Cow<'_, str> {
    if sql.len() <= max {
        return sql.into();
    }
    let mut end = max;
    while !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end]).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::oid;
    use serde_json::json;

    #[test]
    fn wire_query_serializes_params_as_text() {
        let params = [Param::new(&1i32), Param::null(), Param::new("x")];
        let body = serde_json::to_value(WireQuery::new("SELECT $1, $2, $3", &params)).unwrap();
        assert_eq!(
            body,
            json!({"query": "SELECT $1, $2, $3", "params": ["1", null, "x"]})
        );
    }

    #[test]
    fn wire_result_decodes_by_type() {
        let raw = json!({
            "command": "SELECT",
            "rowCount": 1,
            "fields": [
                {"name": "id", "dataTypeID": oid::INT4},
                {"name": "active", "dataTypeID": oid::BOOL},
                {"name": "meta", "dataTypeID": oid::JSONB},
                {"name": "note", "dataTypeID": 25}
            ],
            "rows": [["7", "t", "{\"a\":1}", null]]
        });
        let result: WireResult = serde_json::from_value(raw).unwrap();
        let result = result.into_result().unwrap();
        assert_eq!(result.command, "SELECT");
        assert_eq!(result.row_count, 1);
        let row = &result.rows[0];
        assert_eq!(row.try_get::<_, i32>("id").unwrap(), 7);
        assert!(row.try_get::<_, bool>("active").unwrap());
        assert_eq!(row.try_get::<_, Value>("meta").unwrap(), json!({"a": 1}));
        assert_eq!(row.try_get::<_, Option<String>>("note").unwrap(), None);
    }

    #[test]
    fn wire_result_without_rows_is_command_only() {
        let raw = json!({"command": "UPDATE", "rowCount": 3, "fields": [], "rows": []});
        let result: WireResult = serde_json::from_value(raw).unwrap();
        let result = result.into_result().unwrap();
        assert_eq!(result.row_count, 3);
        assert!(result.rows.is_empty());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let raw = json!({"fields": [{"name": "a", "dataTypeID": 25}], "rows": [["x", "y"]]});
        let result: WireResult = serde_json::from_value(raw).unwrap();
        assert!(result.into_result().is_err());
    }

    #[test]
    fn construction_is_lazy() {
        let exec = HttpExecutor::new("definitely not a url", FetchOptions::default()).unwrap();
        assert_eq!(exec.connection_string(), "definitely not a url");
    }

    #[test]
    fn debug_redacts_connection_string() {
        let exec = HttpExecutor::new("postgres://u:hunter2@h/db", FetchOptions::default()).unwrap();
        assert!(!format!("{:?}", exec).contains("hunter2"));
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_sql("SELECT 1", 200), "SELECT 1");
        assert_eq!(truncate_sql("héllo", 2), "h...");
    }

    #[tokio::test]
    async fn malformed_connection_string_fails_on_first_query() {
        let exec = HttpExecutor::new("nonsense", FetchOptions::default()).unwrap();
        let err = exec.query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, OrmError::Connection(_)));
    }
}
