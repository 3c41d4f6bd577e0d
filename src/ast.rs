//! Host-side values and logical column types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::HanaError;

/// Dynamic value exchanged with the host framework and the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    String(String),
    Symbol(String),
    Binary(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    DateTime(DateTime<FixedOffset>),
    /// Anything the dialect has no literal form for. Serialized as JSON.
    Other(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Decimal(d) => i64::try_from(d.trunc()).ok(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// JSON form used for typed instantiation of result records.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Decimal(d) => Json::String(d.normalize().to_string()),
            Value::String(s) | Value::Symbol(s) => Json::String(s.clone()),
            Value::Binary(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
            Value::Time(t) => Json::String(t.format("%H:%M:%S").to_string()),
            Value::Timestamp(ts) => Json::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Value::Other(v) => v.clone(),
        }
    }
}

/// Plain text rendering; null renders empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) | Value::Symbol(s) => f.write_str(s),
            Value::Binary(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S %:z")),
            Value::Other(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTime(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v.fixed_offset())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Logical column types understood by the dialect translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    PrimaryKey,
    String,
    Text,
    Integer,
    Bigint,
    Float,
    Decimal,
    Datetime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
}

impl LogicalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::PrimaryKey => "primary_key",
            LogicalType::String => "string",
            LogicalType::Text => "text",
            LogicalType::Integer => "integer",
            LogicalType::Bigint => "bigint",
            LogicalType::Float => "float",
            LogicalType::Decimal => "decimal",
            LogicalType::Datetime => "datetime",
            LogicalType::Timestamp => "timestamp",
            LogicalType::Time => "time",
            LogicalType::Date => "date",
            LogicalType::Binary => "binary",
            LogicalType::Boolean => "boolean",
        }
    }

    /// Infer the logical type from a catalog `DATA_TYPE_NAME`.
    ///
    /// Only whole type names are recognized; a length suffix such as
    /// `NVARCHAR(120)` is ignored. Spatial and other unknown types give `None`.
    pub fn from_sql_type(sql_type: &str) -> Option<Self> {
        let name = sql_type.split('(').next().unwrap_or_default().trim().to_uppercase();
        let ty = match name.as_str() {
            // TINYINT carries booleans in this dialect.
            "TINYINT" | "BOOLEAN" => LogicalType::Boolean,
            "BIGINT" => LogicalType::Bigint,
            "SMALLINT" | "INTEGER" | "INT" => LogicalType::Integer,
            "FLOAT" | "DOUBLE" | "REAL" => LogicalType::Float,
            "DECIMAL" | "SMALLDECIMAL" | "NUMERIC" | "DEC" => LogicalType::Decimal,
            "CLOB" | "NCLOB" | "TEXT" | "SHORTTEXT" | "BINTEXT" => LogicalType::Text,
            "CHAR" | "NCHAR" | "VARCHAR" | "NVARCHAR" | "ALPHANUM" => LogicalType::String,
            "TIMESTAMP" | "SECONDDATE" => LogicalType::Datetime,
            "DATE" => LogicalType::Date,
            "TIME" => LogicalType::Time,
            "BLOB" | "BINARY" | "VARBINARY" => LogicalType::Binary,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalType {
    type Err = HanaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = match s.trim().to_lowercase().as_str() {
            "primary_key" => LogicalType::PrimaryKey,
            "string" => LogicalType::String,
            "text" => LogicalType::Text,
            "integer" => LogicalType::Integer,
            "bigint" => LogicalType::Bigint,
            "float" => LogicalType::Float,
            "decimal" => LogicalType::Decimal,
            "datetime" => LogicalType::Datetime,
            "timestamp" => LogicalType::Timestamp,
            "time" => LogicalType::Time,
            "date" => LogicalType::Date,
            "binary" => LogicalType::Binary,
            "boolean" => LogicalType::Boolean,
            other => return Err(HanaError::argument(format!("Unknown column type '{}'", other))),
        };
        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        let _b: Value = true.into();
        let _i: Value = 42i32.into();
        let _f: Value = 3.5f64.into();
        let _s: Value = "hello".into();
        let n: Value = Option::<i64>::None.into();
        assert!(n.is_null());
    }

    #[test]
    fn test_inferred_types() {
        assert_eq!(LogicalType::from_sql_type("TINYINT"), Some(LogicalType::Boolean));
        assert_eq!(LogicalType::from_sql_type("BIGINT"), Some(LogicalType::Bigint));
        assert_eq!(LogicalType::from_sql_type("INTEGER"), Some(LogicalType::Integer));
        assert_eq!(LogicalType::from_sql_type("NVARCHAR"), Some(LogicalType::String));
        assert_eq!(LogicalType::from_sql_type("NCLOB"), Some(LogicalType::Text));
        assert_eq!(LogicalType::from_sql_type("TIMESTAMP"), Some(LogicalType::Datetime));
        assert_eq!(LogicalType::from_sql_type("DATE"), Some(LogicalType::Date));
        assert_eq!(LogicalType::from_sql_type("TIME"), Some(LogicalType::Time));
        assert_eq!(LogicalType::from_sql_type("BLOB"), Some(LogicalType::Binary));
        assert_eq!(LogicalType::from_sql_type("nvarchar(120)"), Some(LogicalType::String));
        assert_eq!(LogicalType::from_sql_type("ST_GEOMETRY"), None);
        assert_eq!(LogicalType::from_sql_type("ST_POINT"), None);
        assert_eq!(LogicalType::from_sql_type("ST_MULTIPOINT"), None);
    }

    #[test]
    fn test_display_null_is_empty() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Binary(vec![0xab, 0x01]).to_string(), "ab01");
    }
}
