//! Row mapping traits and utilities

use crate::error::{OrmError, OrmResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Column metadata reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub type_oid: u32,
}

/// A result row with decoded values.
///
/// Column metadata is shared between all rows of one result.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[Column]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[Column]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    /// Column metadata.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw decoded value for a column, if present.
    pub fn value<I: RowIndex>(&self, idx: I) -> Option<&Value> {
        idx.index(self).and_then(|i| self.values.get(i))
    }

    /// Get a typed value by column name or position.
    pub fn try_get<I: RowIndex, T: DeserializeOwned>(&self, idx: I) -> OrmResult<T> {
        let Some(pos) = idx.index(self) else {
            return Err(OrmError::decode(idx.describe(), "column not found"));
        };
        let value = self
            .values
            .get(pos)
            .cloned()
            .ok_or_else(|| OrmError::decode(idx.describe(), "column not found"))?;
        serde_json::from_value(value).map_err(|e| OrmError::decode(idx.describe(), e.to_string()))
    }

    /// Build a JSON object keyed by column name.
    ///
    /// If two columns share a name, the later one wins.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.values.len());
        for (col, value) in self.columns.iter().zip(self.values.iter()) {
            map.insert(col.name.clone(), value.clone());
        }
        Value::Object(map)
    }

    /// Deserialize the whole row (as an object keyed by column name) into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> OrmResult<T> {
        serde_json::from_value(self.to_json()).map_err(|e| OrmError::decode("*", e.to_string()))
    }
}

/// Something that selects a column of a [`Row`]: a name or a position.
pub trait RowIndex {
    fn index(&self, row: &Row) -> Option<usize>;
    fn describe(&self) -> String;
}

impl RowIndex for usize {
    fn index(&self, row: &Row) -> Option<usize> {
        (*self < row.values.len()).then_some(*self)
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl RowIndex for &str {
    fn index(&self, row: &Row) -> Option<usize> {
        row.columns.iter().position(|c| c.name == *self)
    }

    fn describe(&self) -> String {
        (*self).to_string()
    }
}

impl RowIndex for String {
    fn index(&self, row: &Row) -> Option<usize> {
        self.as_str().index(row)
    }

    fn describe(&self) -> String {
        self.clone()
    }
}

/// Trait for converting a database row into a Rust struct.
///
/// # Example
///
/// ```ignore
/// struct User {
///     id: i64,
///     username: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(User {
///             id: row.try_get("id")?,
///             username: row.try_get("username")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self.
    fn from_row(row: &Row) -> OrmResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.clone())
    }
}

impl FromRow for Value {
    fn from_row(row: &Row) -> OrmResult<Self> {
        Ok(row.to_json())
    }
}
