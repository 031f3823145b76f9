//! Engine-native values and result rows

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// A single SQLite value, as stored or as bound to a statement
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl CellValue {
    /// Parse a pre-formatted SQL literal into a value.
    ///
    /// Accepts the literal forms callers used to splice into SQL text:
    /// `NULL`, integers, reals, and single- or double-quoted strings (with
    /// `''` as an escaped quote). Anything else is taken as bare text.
    ///
    /// ```
    /// use sqlt::database::CellValue;
    ///
    /// assert_eq!(CellValue::from_literal("'x'"), CellValue::Text("x".to_string()));
    /// assert_eq!(CellValue::from_literal("1"), CellValue::Integer(1));
    /// assert_eq!(CellValue::from_literal("null"), CellValue::Null);
    /// ```
    pub fn from_literal(literal: &str) -> Self {
        let s = literal.trim();

        if s.eq_ignore_ascii_case("null") {
            return CellValue::Null;
        }

        for quote in ['\'', '"'] {
            if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
                let inner = &s[1..s.len() - 1];
                let doubled = format!("{quote}{quote}");
                return CellValue::Text(inner.replace(&doubled, &quote.to_string()));
            }
        }

        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }

        let numeric = !s.is_empty()
            && s.chars().any(|c| c.is_ascii_digit())
            && s
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
        if numeric {
            if let Ok(f) = s.parse::<f64>() {
                return CellValue::Real(f);
            }
        }

        CellValue::Text(s.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Blob(b) => {
                write!(f, "x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                write!(f, "'")
            }
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Real(r) => serializer.serialize_f64(*r),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Blob(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(r) => CellValue::Real(r),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            CellValue::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            CellValue::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i32> for CellValue {
    fn from(i: i32) -> Self {
        CellValue::Integer(i64::from(i))
    }
}

impl From<i64> for CellValue {
    fn from(i: i64) -> Self {
        CellValue::Integer(i)
    }
}

impl From<f64> for CellValue {
    fn from(r: f64) -> Self {
        CellValue::Real(r)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// One result row: field names in statement order, paired with their values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<CellValue>,
}

impl Row {
    pub(crate) fn new(columns: Vec<String>, values: Vec<CellValue>) -> Self {
        Self { columns, values }
    }

    /// Look up a field by name
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[CellValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(field, value)` pairs in statement order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
