//! Conversion between Rust values and the text format spoken by the HTTP endpoint.
//!
//! Parameters travel as JSON strings (or `null`) and are interpreted by the
//! server exactly like text-format bind parameters. Results come back as text
//! and are decoded here according to the column's type OID.

use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// Well-known Postgres type OIDs used for result decoding.
pub mod oid {
    pub const BOOL: u32 = 16;
    pub const INT8: u32 = 20;
    pub const INT2: u32 = 21;
    pub const INT4: u32 = 23;
    pub const OID: u32 = 26;
    pub const JSON: u32 = 114;
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;
    pub const NUMERIC: u32 = 1700;
    pub const JSONB: u32 = 3802;
}

/// A value that can be bound as a query parameter.
///
/// Implementations produce the Postgres text representation, or `None` for SQL `NULL`.
pub trait ToParam {
    fn to_param(&self) -> Option<String>;

    /// Representation inside an array literal. Defaults to the quoted text form.
    fn to_array_element(&self) -> String {
        match self.to_param() {
            Some(text) => quote_array_element(&text),
            None => "NULL".to_string(),
        }
    }
}

/// A bound parameter, already rendered to its wire form.
///
/// Cloning is cheap, so builders can be cloned freely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param(Option<Arc<str>>);

impl Param {
    /// Create a parameter from any [`ToParam`] value.
    pub fn new<T: ToParam + ?Sized>(value: &T) -> Self {
        Param(value.to_param().map(Arc::from))
    }

    /// SQL `NULL`.
    pub fn null() -> Self {
        Param(None)
    }

    /// The text representation (`None` for `NULL`).
    pub fn as_text(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Wire form: a JSON string or `null`.
    pub fn to_json(&self) -> Value {
        match &self.0 {
            Some(text) => Value::String(text.to_string()),
            None => Value::Null,
        }
    }
}

macro_rules! display_param {
    ($($t:ty),* $(,)?) => {
        $(
            impl ToParam for $t {
                fn to_param(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn to_array_element(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

display_param!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool);

impl ToParam for str {
    fn to_param(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl ToParam for String {
    fn to_param(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl<T: ToParam + ?Sized> ToParam for &T {
    fn to_param(&self) -> Option<String> {
        (**self).to_param()
    }

    fn to_array_element(&self) -> String {
        (**self).to_array_element()
    }
}

impl ToParam for Cow<'_, str> {
    fn to_param(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Option<String> {
        self.as_ref().and_then(ToParam::to_param)
    }

    fn to_array_element(&self) -> String {
        match self {
            Some(v) => v.to_array_element(),
            None => "NULL".to_string(),
        }
    }
}

impl<T: ToParam> ToParam for Vec<T> {
    fn to_param(&self) -> Option<String> {
        self.as_slice().to_param()
    }
}

impl<T: ToParam> ToParam for [T] {
    fn to_param(&self) -> Option<String> {
        let elements: Vec<String> = self.iter().map(ToParam::to_array_element).collect();
        Some(format!("{{{}}}", elements.join(",")))
    }

    fn to_array_element(&self) -> String {
        self.to_param().unwrap_or_else(|| "NULL".to_string())
    }
}

impl ToParam for Value {
    fn to_param(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Array(_) | Value::Object(_) => Some(self.to_string()),
        }
    }
}

impl ToParam for uuid::Uuid {
    fn to_param(&self) -> Option<String> {
        Some(self.hyphenated().to_string())
    }

    fn to_array_element(&self) -> String {
        self.hyphenated().to_string()
    }
}

impl ToParam for chrono::NaiveDate {
    fn to_param(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d").to_string())
    }
}

impl ToParam for chrono::NaiveDateTime {
    fn to_param(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }
}

impl<Tz> ToParam for chrono::DateTime<Tz>
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    fn to_param(&self) -> Option<String> {
        Some(self.to_rfc3339())
    }
}

impl<T: ToParam + ?Sized> ToParam for Arc<T> {
    fn to_param(&self) -> Option<String> {
        (**self).to_param()
    }
}

/// Quote an element for a Postgres array literal.
///
/// Elements are always double-quoted; `"` and `\` are backslash-escaped.
fn quote_array_element(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Decode a text-format column value into JSON according to its type OID.
///
/// Unrecognised types (and values that fail to parse as their declared type)
/// are kept as strings.
pub fn decode_text(type_oid: u32, text: Option<&str>) -> Value {
    let Some(text) = text else {
        return Value::Null;
    };

    match type_oid {
        oid::BOOL => match text {
            "t" | "true" => Value::Bool(true),
            "f" | "false" => Value::Bool(false),
            _ => Value::String(text.to_string()),
        },
        oid::INT2 | oid::INT4 | oid::INT8 | oid::OID => text
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(text.to_string())),
        oid::FLOAT4 | oid::FLOAT8 => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(text.to_string())),
        oid::JSON | oid::JSONB => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        }
        _ => Value::String(text.to_string()),
    }
}
